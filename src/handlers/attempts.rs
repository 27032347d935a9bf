// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    exam::scoring,
    models::{
        attempt::{
            ATTEMPT_COLUMNS, Attempt, AttemptDetail, AttemptListParams, AttemptSummary, ReviewItem,
        },
        question::Question,
    },
    handlers::papers::{fetch_paper, fetch_questions},
    utils::jwt::Claims,
};

/// Lists the current user's attempts, newest first.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.id, a.paper_id, p.title AS paper_title,
            a.total_score, a.max_possible_score,
            a.correct_questions, a.incorrect_questions, a.unattempted_questions,
            a.time_spent_seconds, a.completed_at
        FROM attempts a
        JOIN papers p ON a.paper_id = p.id
        WHERE a.user_id = $1
          AND ($2::BIGINT IS NULL OR a.paper_id = $2)
        ORDER BY a.completed_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(params.paper_id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Pairs each question with the stored answer and grades it against the key
/// stored with the attempt, so an admin editing the paper afterwards does not
/// change the review. Questions added after submission are left out.
pub fn build_review(attempt: &Attempt, questions: Vec<Question>) -> Vec<ReviewItem> {
    questions
        .into_iter()
        .filter_map(|mut question| {
            question.correct_option = attempt.answer_key.get(&question.id)?.clone();
            let outcome = scoring::grade(&question, &attempt.answers);
            Some(ReviewItem {
                answer: attempt.answers.get(&question.id).cloned(),
                status: attempt.status.get(&question.id).copied().unwrap_or_default(),
                marks: outcome.marks(),
                outcome,
                question,
            })
        })
        .collect()
}

/// One attempt with its question-by-question review.
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempt = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {} FROM attempts WHERE id = $1 AND user_id = $2",
        ATTEMPT_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let paper = fetch_paper(&pool, attempt.paper_id).await?;
    let questions = fetch_questions(&pool, attempt.paper_id).await?;
    let review = build_review(&attempt, questions);

    Ok(Json(AttemptDetail {
        attempt,
        paper_title: paper.title,
        review,
    }))
}
