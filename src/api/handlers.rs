use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::session_log::{is_valid_session_id, LogEntry};
use crate::AppState;

use super::models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, ReplyMeta};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, session_id: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            session_id,
        }),
    )
}

pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = payload.message.trim();
    let session_id = payload
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Empty message", Some(session_id)));
    }
    if !is_valid_session_id(&session_id) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid session_id", Some(session_id)));
    }

    let (reply, meta) = state.model.respond(message, &mut rand::thread_rng());
    tracing::debug!(session_id = %session_id, intent = %meta.intent_tag, "classified message");

    let entry = LogEntry::new(&session_id, message, &reply, &meta);
    let log_path = state.session_log.append(&entry).await.map_err(|err| {
        tracing::error!(session_id = %session_id, error = %err, "failed to append session log");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to write session log",
            Some(session_id.clone()),
        )
    })?;

    let log_tx_hash = match &state.provenance {
        Some(provenance) => provenance
            .commit_log(&session_id, &log_path, &meta.model_version)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(session_id = %session_id, error = %err, "blockchain commit failed");
                None
            }),
        None => None,
    };

    Ok(Json(ChatResponse {
        reply,
        session_id,
        meta: ReplyMeta {
            intent: meta,
            log_tx_hash,
        },
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model_version: state.model.model_version.clone(),
    })
}

pub async fn not_found() -> Response {
    api_error(StatusCode::NOT_FOUND, "Not found", None).into_response()
}
