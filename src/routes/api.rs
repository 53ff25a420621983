use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{generate, sessions, voices};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router with protected routes
///
/// Note: Authentication middleware should be applied in main.rs after state is available
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Protected routes (auth required when auth.required=true)
        .route("/voices", get(voices::list_voices))
        .route("/voices/{id}", get(voices::get_voice))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{token}", get(sessions::session_status))
        .route("/generate", post(generate::generate))
        .layer(TraceLayer::new_for_http())
}
