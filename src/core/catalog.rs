//! Voice catalog: the read-only set of voice profiles users pick from.
//!
//! Profiles are seeded once at startup from a fixed built-in list and are
//! immutable afterwards. Each profile carries the attributes the synthesis
//! collaborator needs (language code, gender hint, named voice id) plus
//! display metadata for clients.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::errors::app_error::AppResult;
use crate::store::Datastore;

/// Voice gender as exposed to clients and mapped to the synthesis hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female")]
    Female,
    #[serde(rename = "non-binary")]
    NonBinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NonBinary => "non-binary",
        }
    }

    /// SSML gender hint for the synthesis collaborator
    pub fn ssml_gender(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::NonBinary => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named speech-synthesis configuration exposed to end users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: i64,
    /// Display name of the voice
    pub name: String,
    /// Accent display tag, e.g. "US"
    pub accent: String,
    /// BCP-47 language code passed to the synthesis collaborator, e.g. "en-US"
    pub language_code: String,
    pub gender: Gender,
    /// Style tag, e.g. "young", "professional"
    pub voice_type: String,
    pub description: String,
    /// External synthesis-voice identifier, e.g. "en-US-Neural2-A"
    pub tts_voice_id: String,
    /// URL to an avatar image for the profile
    pub avatar_url: String,
}

fn profile(
    id: i64,
    name: &str,
    accent: &str,
    language_code: &str,
    gender: Gender,
    voice_type: &str,
    description: &str,
    tts_voice_id: &str,
) -> VoiceProfile {
    VoiceProfile {
        id,
        name: name.to_string(),
        accent: accent.to_string(),
        language_code: language_code.to_string(),
        gender,
        voice_type: voice_type.to_string(),
        description: description.to_string(),
        tts_voice_id: tts_voice_id.to_string(),
        avatar_url: format!(
            "https://ui-avatars.com/api/?name={}&background=random",
            name.split_whitespace().next().unwrap_or(name)
        ),
    }
}

/// The built-in voice catalog seeded at startup
pub fn default_voice_profiles() -> Vec<VoiceProfile> {
    vec![
        profile(
            1,
            "Alex - US Young",
            "US",
            "en-US",
            Gender::Male,
            "young",
            "Friendly and energetic young American voice",
            "en-US-Neural2-A",
        ),
        profile(
            2,
            "Emma - US Professional",
            "US",
            "en-US",
            Gender::Female,
            "professional",
            "Professional and confident American voice",
            "en-US-Neural2-C",
        ),
        profile(
            3,
            "James - UK Mature",
            "UK",
            "en-GB",
            Gender::Male,
            "mature",
            "Sophisticated and distinguished British voice",
            "en-GB-Neural2-B",
        ),
        profile(
            4,
            "Sophie - UK Casual",
            "UK",
            "en-GB",
            Gender::Female,
            "casual",
            "Friendly and approachable British voice",
            "en-GB-Neural2-A",
        ),
        profile(
            5,
            "Liam - Australian Casual",
            "Australian",
            "en-AU",
            Gender::Male,
            "casual",
            "Relaxed and friendly Australian voice",
            "en-AU-Neural2-A",
        ),
        profile(
            6,
            "Priya - Indian Professional",
            "Indian",
            "en-IN",
            Gender::Female,
            "professional",
            "Professional and articulate Indian voice",
            "en-IN-Neural2-A",
        ),
        profile(
            7,
            "Casey - Non-binary Young",
            "US",
            "en-US",
            Gender::NonBinary,
            "young",
            "Contemporary and inclusive voice",
            "en-US-Neural2-D",
        ),
    ]
}

/// Seed the catalog into the datastore. Idempotent: profiles already present
/// are left untouched.
pub async fn seed_voice_profiles(store: &Arc<dyn Datastore>) -> AppResult<()> {
    let existing = store.list_voice_profiles().await?;
    if !existing.is_empty() {
        return Ok(());
    }

    let profiles = default_voice_profiles();
    let count = profiles.len();
    store.seed_voice_profiles(profiles).await?;
    info!("Seeded voice catalog with {count} profiles");
    Ok(())
}
