// src/exam/sink.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use crate::exam::submission::{ResultSink, ResultSnapshot, SinkError};

/// Stores finished attempts in the `attempts` table.
#[derive(Clone)]
pub struct PgResultSink {
    pool: PgPool,
}

impl PgResultSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultSink for PgResultSink {
    async fn persist(&self, snapshot: &ResultSnapshot) -> Result<i64, SinkError> {
        let report = &snapshot.report;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO attempts (
                user_id, paper_id, answers, status, answer_key, subject_scores,
                total_score, max_possible_score,
                correct_questions, incorrect_questions, unattempted_questions,
                time_spent_seconds, submit_reason, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(snapshot.user_id)
        .bind(snapshot.paper_id)
        .bind(Json(&snapshot.answers))
        .bind(Json(&snapshot.status))
        .bind(Json(&snapshot.answer_key))
        .bind(Json(&snapshot.subject_scores))
        .bind(report.total_score)
        .bind(report.max_possible_score)
        .bind(i64::from(report.correct_questions))
        .bind(i64::from(report.incorrect_questions))
        .bind(i64::from(report.unattempted_questions))
        .bind(i64::from(snapshot.time_spent_seconds))
        .bind(snapshot.reason.as_str())
        .bind(snapshot.completed_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Stored attempt {} for user {}", id, snapshot.user_id);
        Ok(id)
    }
}
