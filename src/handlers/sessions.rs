// src/handlers/sessions.rs

//! HTTP surface of live exam sessions. Each handler forwards to the session's
//! own task through its [`SessionHandle`].

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    exam::{
        ExamSession, Navigation, SessionError, SessionHandle, SessionRegistry,
        SubmissionOutcome,
        runner::{self, LiveSession, TICK_PERIOD},
    },
    handlers::{
        auth::fetch_user,
        papers::{fetch_paper, fetch_questions},
    },
    state::AppState,
    utils::jwt::Claims,
};

/// DTO for answering a question.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub question_id: i64,
    #[validate(length(max = 50))]
    pub value: String,
}

/// Either the live exam screen or, once submitted, the result.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionResponse {
    Active(LiveSession),
    Completed(SubmissionOutcome),
}

async fn owned_session(
    registry: &SessionRegistry,
    id: Uuid,
    claims: &Claims,
) -> Result<SessionHandle, AppError> {
    registry
        .get_owned(id, claims.user_id()?)
        .await
        .ok_or(AppError::NotFound("Session not found".to_string()))
}

fn live(handle: &SessionHandle, view: crate::exam::SessionView) -> Json<LiveSession> {
    Json(LiveSession {
        session_id: handle.id(),
        view,
    })
}

/// Starts a timed session on a paper.
///
/// * Premium papers require a premium account.
/// * An empty catalog yields 404 ("no questions found").
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(paper_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let paper = fetch_paper(&state.pool, paper_id).await?;

    if paper.is_premium {
        let user = fetch_user(&state.pool, user_id).await?;
        if !user.can_open_premium() {
            return Err(AppError::Forbidden(
                "This paper requires a premium subscription".to_string(),
            ));
        }
    }

    let questions = fetch_questions(&state.pool, paper.id).await?;
    let duration = u32::try_from(paper.duration_seconds)
        .ok()
        .filter(|d| *d > 0)
        .unwrap_or(state.config.exam_duration_secs);

    let session = ExamSession::new(paper.id, user_id, questions, duration)?;
    let handle = runner::spawn(session, state.results.clone(), TICK_PERIOD);
    let view = handle.view().await?;
    state.sessions.insert(handle.clone()).await;

    Ok((StatusCode::CREATED, live(&handle, view)))
}

/// Current exam screen, or the final result once the session is over.
pub async fn get_session(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;

    match handle.view().await {
        Ok(view) => Ok(Json(SessionResponse::Active(LiveSession {
            session_id: handle.id(),
            view,
        }))),
        Err(SessionError::Closed) => handle
            .outcome()
            .map(|outcome| Json(SessionResponse::Completed(outcome)))
            .ok_or_else(|| AppError::from(SessionError::Closed)),
        Err(e) => Err(e.into()),
    }
}

/// Sets (or overwrites) the answer to one question.
pub async fn set_answer(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let handle = owned_session(&registry, id, &claims).await?;
    let view = handle.set_answer(payload.question_id, payload.value).await?;
    Ok(live(&handle, view))
}

/// Clears the answer to one question.
pub async fn clear_answer(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path((id, question_id)): Path<(Uuid, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;
    let view = handle.clear_answer(question_id).await?;
    Ok(live(&handle, view))
}

/// Toggles the mark-for-review flag on one question.
pub async fn toggle_mark(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path((id, question_id)): Path<(Uuid, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;
    let view = handle.toggle_mark(question_id).await?;
    Ok(live(&handle, view))
}

/// Next / previous / jump to a question.
pub async fn navigate(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(to): Json<Navigation>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;
    let view = handle.navigate(to).await?;
    Ok(live(&handle, view))
}

/// User-initiated submit. Idempotent: a repeated call, or a call after the
/// clock ran out, returns the outcome already produced.
pub async fn submit_session(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;
    let outcome = handle.submit().await?;
    Ok(Json(outcome))
}

/// Leaves a session. Nothing is stored for an unsubmitted session.
pub async fn abandon_session(
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = owned_session(&registry, id, &claims).await?;
    registry.remove(handle.id()).await;
    if !handle.is_finished() {
        tracing::info!("User {} abandoned session {}", handle.user_id(), handle.id());
    }
    Ok(StatusCode::NO_CONTENT)
}
