// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::papers::fetch_paper,
    models::{
        paper::{CreatePaperRequest, UpdatePaperRequest},
        question::{CreateQuestionRequest, QuestionOption},
        user::{AdminUpdateUserRequest, User},
    },
    utils::{
        hash::hash_password,
        html::{sanitize_optional, sanitize_question_text},
        jwt::Claims,
    },
};

/// Validates a question payload and sanitizes its text fields.
fn prepare_question(payload: CreateQuestionRequest) -> Result<CreateQuestionRequest, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    payload.check_answer_key().map_err(AppError::BadRequest)?;

    Ok(CreateQuestionRequest {
        subject: payload.subject.trim().to_string(),
        text: sanitize_optional(payload.text.as_deref()),
        options: payload
            .options
            .into_iter()
            .map(|o| QuestionOption {
                id: o.id,
                text: sanitize_question_text(&o.text),
            })
            .collect(),
        correct_option: payload.correct_option.trim().to_string(),
        ..payload
    })
}

/// Configured exam length as stored in `papers.duration_seconds`.
fn default_duration(config: &Config) -> Result<i32, AppError> {
    i32::try_from(config.exam_duration_secs).map_err(|_| {
        AppError::InternalServerError(format!(
            "EXAM_DURATION_SECS={} does not fit a paper duration",
            config.exam_duration_secs
        ))
    })
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, is_premium, created_at FROM users ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Updates a user's role, premium flag or password.
/// Admin only.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.role.is_none() && payload.is_premium.is_none() && payload.password.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role.as_str());
    }

    if let Some(is_premium) = payload.is_premium {
        separated.push("is_premium = ");
        separated.push_bind_unseparated(is_premium);
    }

    if let Some(password) = payload.password {
        separated.push("password = ");
        separated.push_bind_unseparated(hash_password(&password)?);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update user: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a new paper.
/// Admin only.
pub async fn create_paper(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<CreatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let duration = match payload.duration_seconds {
        Some(duration) => duration,
        None => default_duration(&config)?,
    };

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO papers (title, year, shift, duration_seconds, is_premium)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(payload.title.trim())
    .bind(payload.year)
    .bind(payload.shift.trim())
    .bind(duration)
    .bind(payload.is_premium)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create paper: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("Created paper {} ({})", id, payload.title);

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a paper by ID.
/// Admin only.
pub async fn update_paper(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.title.is_none()
        && payload.year.is_none()
        && payload.shift.is_none()
        && payload.duration_seconds.is_none()
        && payload.is_premium.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE papers SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(year) = payload.year {
        separated.push("year = ");
        separated.push_bind_unseparated(year);
    }

    if let Some(shift) = payload.shift {
        separated.push("shift = ");
        separated.push_bind_unseparated(shift);
    }

    if let Some(duration) = payload.duration_seconds {
        separated.push("duration_seconds = ");
        separated.push_bind_unseparated(duration);
    }

    if let Some(is_premium) = payload.is_premium {
        separated.push("is_premium = ");
        separated.push_bind_unseparated(is_premium);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update paper: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Paper not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a paper with its questions and attempts.
/// Admin only.
pub async fn delete_paper(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM papers WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete paper: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Paper not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to a paper. Without an explicit position it goes last.
/// Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Path(paper_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = prepare_question(payload)?;
    fetch_paper(&pool, paper_id).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (paper_id, position, type, subject, text, image_url, options, correct_option)
        VALUES (
            $1,
            COALESCE($2, (SELECT COALESCE(MAX(position), 0) + 1 FROM questions WHERE paper_id = $1)),
            $3, $4, $5, $6, $7, $8
        )
        RETURNING id
        "#,
    )
    .bind(paper_id)
    .bind(payload.position)
    .bind(payload.question_type.as_str())
    .bind(&payload.subject)
    .bind(&payload.text)
    .bind(&payload.image_url)
    .bind(SqlJson(&payload.options))
    .bind(&payload.correct_option)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Replaces a question by ID. The whole question is resent so the answer
/// key can be checked against its options.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = prepare_question(payload)?;

    let result = sqlx::query(
        r#"
        UPDATE questions SET
            position = COALESCE($2, position),
            type = $3,
            subject = $4,
            text = $5,
            image_url = $6,
            options = $7,
            correct_option = $8
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(payload.position)
    .bind(payload.question_type.as_str())
    .bind(&payload.subject)
    .bind(&payload.text)
    .bind(&payload.image_url)
    .bind(SqlJson(&payload.options))
    .bind(&payload.correct_option)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
