use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::errors::app_error::AppResult;
use crate::state::AppState;

fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_token: String,
    pub expires_at: String,
}

/// Create a quota-tracked session for a user
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<CreateSessionResponse>)> {
    let session = state.sessions.create_session(request.user_id).await?;
    info!(
        session_id = session.id,
        user_id = request.user_id,
        "Session created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            expires_at: rfc3339(session.expires_at),
            session_token: session.token,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub generation_count: u32,
    pub remaining_generations: u32,
    pub can_generate: bool,
    pub expires_at: String,
}

/// Report a session's quota status
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> AppResult<Json<SessionStatusResponse>> {
    let session = state.sessions.session_by_token(&token).await?;
    let status = state.sessions.status(&session);
    Ok(Json(SessionStatusResponse {
        generation_count: status.generation_count,
        remaining_generations: status.remaining_generations,
        can_generate: status.can_generate,
        expires_at: rfc3339(session.expires_at),
    }))
}
