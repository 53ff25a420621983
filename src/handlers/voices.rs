use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::catalog::VoiceProfile;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceProfile>,
    pub count: usize,
}

/// List all available voice profiles
pub async fn list_voices(State(state): State<Arc<AppState>>) -> AppResult<Json<VoicesResponse>> {
    let voices = state.store.list_voice_profiles().await?;
    debug!(count = voices.len(), "Voice catalog listed");
    let count = voices.len();
    Ok(Json(VoicesResponse { voices, count }))
}

/// Look up a single voice profile by id
pub async fn get_voice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<VoiceProfile>> {
    let profile = state
        .store
        .voice_profile_by_id(id)
        .await?
        .ok_or(AppError::ProfileNotFound(id))?;
    Ok(Json(profile))
}
