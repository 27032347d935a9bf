// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::exam::scoring::{Outcome, SubjectScore};
use crate::exam::status::QuestionStatus;
use crate::exam::submission::SubmitReason;
use crate::models::question::Question;

/// Represents the 'attempts' table in the database.
/// Written once when a session is submitted; never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub paper_id: i64,
    pub answers: Json<HashMap<i64, String>>,
    pub status: Json<HashMap<i64, QuestionStatus>>,
    /// Key the attempt was scored against; later edits to the paper do not touch it.
    pub answer_key: Json<HashMap<i64, String>>,
    pub subject_scores: Json<Vec<SubjectScore>>,
    pub total_score: i64,
    pub max_possible_score: i64,
    pub correct_questions: i64,
    pub incorrect_questions: i64,
    pub unattempted_questions: i64,
    pub time_spent_seconds: i64,
    #[sqlx(try_from = "String")]
    pub submit_reason: SubmitReason,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Column list matching [`Attempt`]'s `FromRow` layout.
pub const ATTEMPT_COLUMNS: &str = "id, user_id, paper_id, answers, status, answer_key, subject_scores, \
     total_score, max_possible_score, correct_questions, incorrect_questions, \
     unattempted_questions, time_spent_seconds, submit_reason, completed_at";

/// Row for "my attempts" listings.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub paper_id: i64,
    pub paper_title: String,
    pub total_score: i64,
    pub max_possible_score: i64,
    pub correct_questions: i64,
    pub incorrect_questions: i64,
    pub unattempted_questions: i64,
    pub time_spent_seconds: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// One question in review mode: the candidate's answer next to the key.
#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub question: Question,
    pub answer: Option<String>,
    pub status: QuestionStatus,
    pub outcome: Outcome,
    pub marks: i64,
}

/// Full attempt with per-question review.
#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    pub attempt: Attempt,
    pub paper_title: String,
    pub review: Vec<ReviewItem>,
}

/// Aggregated struct for a paper's leaderboard.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_score: i64,
    pub time_spent_seconds: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for attempt listings.
#[derive(Debug, Deserialize)]
pub struct AttemptListParams {
    pub paper_id: Option<i64>,
    pub limit: Option<i64>,
}
