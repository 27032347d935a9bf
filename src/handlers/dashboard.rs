// src/handlers/dashboard.rs

use std::collections::BTreeMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::Serialize;
use sqlx::{FromRow, PgPool, types::Json as SqlJson};

use crate::{
    error::AppError,
    exam::scoring::SubjectScore,
    models::attempt::AttemptSummary,
    utils::jwt::Claims,
};

const RECENT_ATTEMPTS: i64 = 5;

#[derive(Debug, FromRow)]
struct Totals {
    attempts_count: i64,
    best_score: Option<i64>,
    average_score: Option<f64>,
    correct: Option<i64>,
    incorrect: Option<i64>,
    time_spent_seconds: Option<i64>,
}

/// Analytics across all of a user's attempts.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub attempts_count: i64,
    pub best_score: Option<i64>,
    pub average_score: Option<f64>,
    /// Correct answers over attempted answers, in percent.
    pub accuracy: Option<f64>,
    pub total_time_spent_seconds: i64,
    pub subjects: Vec<SubjectScore>,
    pub recent: Vec<AttemptSummary>,
}

/// Sums per-subject scores over many attempts, sorted by subject.
pub fn merge_subject_scores(attempts: impl IntoIterator<Item = Vec<SubjectScore>>) -> Vec<SubjectScore> {
    let mut merged: BTreeMap<String, SubjectScore> = BTreeMap::new();
    for scores in attempts {
        for s in scores {
            let entry = merged.entry(s.subject.clone()).or_insert_with(|| SubjectScore {
                subject: s.subject.clone(),
                score: 0,
                max_score: 0,
                correct: 0,
                incorrect: 0,
                unattempted: 0,
            });
            entry.score += s.score;
            entry.max_score += s.max_score;
            entry.correct += s.correct;
            entry.incorrect += s.incorrect;
            entry.unattempted += s.unattempted;
        }
    }
    merged.into_values().collect()
}

fn accuracy(correct: i64, incorrect: i64) -> Option<f64> {
    let attempted = correct + incorrect;
    (attempted > 0).then(|| correct as f64 / attempted as f64 * 100.0)
}

/// Results dashboard for the current user.
pub async fn get_dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let totals = sqlx::query_as::<_, Totals>(
        r#"
        SELECT
            COUNT(*) AS attempts_count,
            MAX(total_score) AS best_score,
            AVG(total_score)::FLOAT8 AS average_score,
            SUM(correct_questions)::BIGINT AS correct,
            SUM(incorrect_questions)::BIGINT AS incorrect,
            SUM(time_spent_seconds)::BIGINT AS time_spent_seconds
        FROM attempts
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let subject_rows: Vec<SqlJson<Vec<SubjectScore>>> =
        sqlx::query_scalar("SELECT subject_scores FROM attempts WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&pool)
            .await?;

    let recent = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.id, a.paper_id, p.title AS paper_title,
            a.total_score, a.max_possible_score,
            a.correct_questions, a.incorrect_questions, a.unattempted_questions,
            a.time_spent_seconds, a.completed_at
        FROM attempts a
        JOIN papers p ON a.paper_id = p.id
        WHERE a.user_id = $1
        ORDER BY a.completed_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(RECENT_ATTEMPTS)
    .fetch_all(&pool)
    .await?;

    Ok(Json(Dashboard {
        attempts_count: totals.attempts_count,
        best_score: totals.best_score,
        average_score: totals.average_score,
        accuracy: accuracy(totals.correct.unwrap_or(0), totals.incorrect.unwrap_or(0)),
        total_time_spent_seconds: totals.time_spent_seconds.unwrap_or(0),
        subjects: merge_subject_scores(subject_rows.into_iter().map(|row| row.0)),
        recent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str, score: i64, correct: u32, incorrect: u32, unattempted: u32) -> SubjectScore {
        SubjectScore {
            subject: name.to_string(),
            score,
            max_score: 4 * i64::from(correct + incorrect + unattempted),
            correct,
            incorrect,
            unattempted,
        }
    }

    #[test]
    fn test_merge_sums_by_subject() {
        let merged = merge_subject_scores(vec![
            vec![subject("Physics", 7, 2, 1, 0), subject("Chemistry", 4, 1, 0, 1)],
            vec![subject("Physics", -1, 0, 1, 2)],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].subject, "Chemistry");
        let physics = &merged[1];
        assert_eq!(physics.score, 6);
        assert_eq!(physics.max_score, 24);
        assert_eq!((physics.correct, physics.incorrect, physics.unattempted), (2, 2, 2));
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(0, 0), None);
        assert_eq!(accuracy(3, 1), Some(75.0));
    }
}
