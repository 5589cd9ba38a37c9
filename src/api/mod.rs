mod handlers;
mod models;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

#[allow(unused_imports)]
pub use handlers::{chat, health, not_found};
pub use models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, ReplyMeta};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
