// src/exam/submission.rs

//! Hand-off of a finished session: persist the snapshot, then return it to
//! the caller whether or not persistence worked.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exam::scoring::{AnswerMap, ScoreReport, SubjectScore};
use crate::exam::session::ExamSession;
use crate::exam::status::QuestionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    UserInitiated,
    TimeExpired,
}

impl SubmitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitReason::UserInitiated => "user_initiated",
            SubmitReason::TimeExpired => "time_expired",
        }
    }

    /// Message shown to the candidate once the paper is in.
    pub fn message(&self) -> &'static str {
        match self {
            SubmitReason::UserInitiated => "Paper submitted successfully.",
            SubmitReason::TimeExpired => "Time's up! Your paper was auto-submitted.",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown submit reason '{0}'")]
pub struct UnknownSubmitReason(pub String);

/// Reads back the `submit_reason` column of stored attempts.
impl TryFrom<String> for SubmitReason {
    type Error = UnknownSubmitReason;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user_initiated" => Ok(SubmitReason::UserInitiated),
            "time_expired" => Ok(SubmitReason::TimeExpired),
            _ => Err(UnknownSubmitReason(value)),
        }
    }
}

/// Write-once record of a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub paper_id: i64,
    pub user_id: i64,
    pub answers: AnswerMap,
    pub status: HashMap<i64, QuestionStatus>,
    /// Correct option of every question as it stood at submission.
    pub answer_key: HashMap<i64, String>,
    #[serde(flatten)]
    pub report: ScoreReport,
    pub subject_scores: Vec<SubjectScore>,
    pub time_spent_seconds: u32,
    pub reason: SubmitReason,
    pub completed_at: DateTime<Utc>,
}

/// What the results screen receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Id of the stored attempt; `None` when persistence failed.
    pub attempt_id: Option<i64>,
    pub message: String,
    /// Soft warning for the candidate when the result could not be saved.
    pub warning: Option<String>,
    pub result: ResultSnapshot,
}

impl SubmissionOutcome {
    pub fn report(&self) -> &ScoreReport {
        &self.result.report
    }

    pub fn is_persisted(&self) -> bool {
        self.attempt_id.is_some()
    }
}

/// Errors surfaced by result sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for finished attempts.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Stores the snapshot and returns its attempt id.
    async fn persist(&self, snapshot: &ResultSnapshot) -> Result<i64, SinkError>;
}

/// Freezes `session` and delivers its result.
///
/// The guard inside [`ExamSession::finish`] runs before the first await, so
/// of two racing calls only one ever scores and persists; the other gets
/// `None`.
pub async fn submit(
    session: &mut ExamSession,
    reason: SubmitReason,
    sink: &dyn ResultSink,
) -> Option<SubmissionOutcome> {
    let snapshot = session.finish(reason, Utc::now())?;
    Some(deliver(snapshot, sink).await)
}

/// Persists a snapshot. A failed write is logged and turned into a warning;
/// the score is still handed back.
pub async fn deliver(snapshot: ResultSnapshot, sink: &dyn ResultSink) -> SubmissionOutcome {
    tracing::info!(
        paper_id = snapshot.paper_id,
        user_id = snapshot.user_id,
        reason = snapshot.reason.as_str(),
        score = snapshot.report.total_score,
        "Submitting paper"
    );

    let (attempt_id, warning) = match sink.persist(&snapshot).await {
        Ok(id) => (Some(id), None),
        Err(e) => {
            tracing::warn!("Failed to persist attempt for paper {}: {}", snapshot.paper_id, e);
            (
                None,
                Some("Your result could not be saved to the server.".to_string()),
            )
        }
    };

    SubmissionOutcome {
        attempt_id,
        message: snapshot.reason.message().to_string(),
        warning,
        result: snapshot,
    }
}
