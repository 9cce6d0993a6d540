use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::AnswerRequest;
use crate::service::chat_service::ChatService;
use crate::service::chat_session::SessionConfig;

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitMessage {
    #[serde(default)]
    pub message: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/api/answer` — one-shot question about a page; always 200 with `{answer}`
pub async fn answer_handler(
    State(svc): State<ChatService>,
    Json(request): Json<AnswerRequest>,
) -> impl IntoResponse {
    Json(svc.answer(request).await)
}

/// POST `/api/sessions` — start a chat session for the widget
pub async fn create_session_handler(
    State(svc): State<ChatService>,
    Json(config): Json<SessionConfig>,
) -> impl IntoResponse {
    (StatusCode::CREATED, Json(svc.create_session(config)))
}

/// GET `/api/sessions/{id}` — current session state
pub async fn get_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.get_session(&id) {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/sessions/{id}/messages` — submit the user's question
pub async fn submit_message_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
    Json(body): Json<SubmitMessage>,
) -> Response {
    match svc.submit_message(&id, body.message).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/sessions/{id}` — discard the session
pub async fn delete_session_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.delete_session(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/sessions/{id}/history` — forget earlier turns
pub async fn clear_history_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.clear_history(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn error_response(err: &AppError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
