use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::catalog::VoiceProfile;
use crate::errors::app_error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub session_token: String,
    pub voice_profile_id: i64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub audio_url: String,
    pub voice_profile: VoiceProfile,
}

/// Run one text-to-speech generation against the session's quota
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let outcome = state
        .generator
        .generate(
            &request.session_token,
            request.voice_profile_id,
            &request.text,
        )
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        audio_url: outcome.audio_url,
        voice_profile: outcome.voice_profile,
    }))
}
