// src/handlers/papers.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::LeaderboardEntry,
        paper::{Paper, PaperDetail, PaperListParams, PaperSummary},
        question::{PublicQuestion, QUESTION_COLUMNS, Question},
    },
};

const LEADERBOARD_SIZE: i64 = 10;

/// Loads a paper row by id.
pub async fn fetch_paper(pool: &PgPool, id: i64) -> Result<Paper, AppError> {
    sqlx::query_as::<_, Paper>(
        "SELECT id, title, year, shift, duration_seconds, is_premium, created_at FROM papers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Paper not found".to_string()))
}

/// Loads a paper's question catalog in exam order.
pub async fn fetch_questions(pool: &PgPool, paper_id: i64) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE paper_id = $1 ORDER BY position, id",
        QUESTION_COLUMNS
    ))
    .bind(paper_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load questions for paper {}: {:?}", paper_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(questions)
}

/// Lists papers, optionally filtered by year and title keyword.
pub async fn list_papers(
    State(pool): State<PgPool>,
    Query(params): Query<PaperListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search_pattern = params.q.map(|k| format!("%{}%", k));

    let papers = sqlx::query_as::<_, PaperSummary>(
        r#"
        SELECT
            p.id, p.title, p.year, p.shift, p.duration_seconds, p.is_premium,
            (SELECT COUNT(*) FROM questions q WHERE q.paper_id = p.id) AS question_count
        FROM papers p
        WHERE ($1::INT IS NULL OR p.year = $1)
          AND ($2::TEXT IS NULL OR p.title ILIKE $2)
        ORDER BY p.year DESC, p.id DESC
        "#,
    )
    .bind(params.year)
    .bind(search_pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(papers))
}

/// Retrieves a paper with its questions (answer keys hidden).
/// Premium papers are listed without their questions.
pub async fn get_paper(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = fetch_paper(&pool, id).await?;
    let questions = if paper.is_premium {
        Vec::new()
    } else {
        fetch_questions(&pool, id)
            .await?
            .iter()
            .map(PublicQuestion::from)
            .collect()
    };

    Ok(Json(PaperDetail {
        locked: paper.is_premium,
        paper,
        questions,
    }))
}

/// Top scores on a paper. Ties go to the faster attempt.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT u.username, a.total_score, a.time_spent_seconds, a.completed_at
        FROM attempts a
        JOIN users u ON a.user_id = u.id
        WHERE a.paper_id = $1
        ORDER BY a.total_score DESC, a.time_spent_seconds ASC, a.completed_at ASC
        LIMIT $2
        "#,
    )
    .bind(id)
    .bind(LEADERBOARD_SIZE)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
