//! Speech-synthesis collaborator.
//!
//! The orchestrator talks to synthesis through the [`Synthesizer`] trait;
//! the production implementation speaks the Google Cloud Text-to-Speech REST
//! contract. The trait seam is also what tests mock.

mod google;

pub use google::{GOOGLE_TTS_URL, GoogleSynthesizer};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::ServerConfig;

/// One synthesis call: text plus the voice-profile attributes the
/// collaborator's contract requires.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    /// BCP-47 language code, e.g. "en-US"
    pub language_code: &'a str,
    /// SSML gender hint: MALE, FEMALE, or NEUTRAL
    pub ssml_gender: &'a str,
    /// Named voice id, e.g. "en-US-Neural2-A"
    pub voice_name: Option<&'a str>,
}

/// Raw encoded audio returned by the collaborator (MP3)
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Bytes,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("synthesis API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("synthesis response carried no audio content")]
    MissingAudio,

    #[error("failed to decode audio content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("synthesis provider not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Convert text to encoded audio bytes
    async fn synthesize(&self, request: SynthesisRequest<'_>)
    -> Result<SynthesizedAudio, SynthesisError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("name", &self.name())
            .finish()
    }
}

/// Factory for the configured synthesis provider.
///
/// # Supported Providers
/// - `"google"` or `"google-cloud"` - Google Cloud Text-to-Speech REST API
pub fn create_synthesizer(
    config: &ServerConfig,
) -> Result<Box<dyn Synthesizer>, SynthesisError> {
    match config.synthesis_provider.to_lowercase().as_str() {
        "google" | "google-cloud" => Ok(Box::new(GoogleSynthesizer::new(
            config.synthesis_api_key.clone().unwrap_or_default(),
            config.synthesis_endpoint.clone(),
            config.synthesis_timeout_seconds,
        )?)),
        other => Err(SynthesisError::NotConfigured(format!(
            "Unsupported synthesis provider: {other}. Supported providers: google"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn test_create_synthesizer_google() {
        let config = test_config();
        let synthesizer = create_synthesizer(&config).unwrap();
        assert_eq!(synthesizer.name(), "google");
    }

    #[test]
    fn test_create_synthesizer_alias() {
        let mut config = test_config();
        config.synthesis_provider = "Google-Cloud".to_string();
        assert!(create_synthesizer(&config).is_ok());
    }

    #[test]
    fn test_create_synthesizer_unsupported() {
        let mut config = test_config();
        config.synthesis_provider = "espeak".to_string();
        let err = create_synthesizer(&config).unwrap_err();
        assert!(matches!(err, SynthesisError::NotConfigured(_)));
    }
}
