//! Google Cloud Text-to-Speech REST implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://texttospeech.googleapis.com/v1/text:synthesize`
//! - Auth: API key via the `key` query parameter
//! - Request: `{input: {text}, voice: {languageCode, ssmlGender, name}, audioConfig: {audioEncoding}}`
//! - Response: `{audioContent}` with base64-encoded MP3 bytes

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{SynthesisError, SynthesisRequest, SynthesizedAudio, Synthesizer};

/// Google Cloud Text-to-Speech API base URL
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com";

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    #[serde(rename = "ssmlGender")]
    ssml_gender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AudioConfig<'a> {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GoogleSynthesizer {
    /// Create a synthesizer against the default Google endpoint or an
    /// override (used by tests against a mock server).
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, SynthesisError> {
        if api_key.is_empty() {
            warn!("Google TTS API key not configured; synthesis requests will fail");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        let endpoint = endpoint
            .unwrap_or_else(|| GOOGLE_TTS_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/v1/text:synthesize", self.endpoint)
    }
}

#[async_trait]
impl Synthesizer for GoogleSynthesizer {
    async fn synthesize(
        &self,
        request: SynthesisRequest<'_>,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let body = SynthesizeBody {
            input: SynthesisInput { text: request.text },
            voice: VoiceSelection {
                language_code: request.language_code,
                ssml_gender: request.ssml_gender,
                name: request.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        debug!(
            language = request.language_code,
            voice = ?request.voice_name,
            chars = request.text.len(),
            "Sending synthesis request"
        );

        let response = self
            .client
            .post(self.synthesize_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Synthesis API returned an error");
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SynthesizeResponse = response.json().await?;
        let encoded = parsed.audio_content.ok_or(SynthesisError::MissingAudio)?;
        let data = BASE64.decode(encoded.as_bytes())?;

        debug!(bytes = data.len(), "Synthesis succeeded");
        Ok(SynthesizedAudio {
            data: Bytes::from(data),
        })
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_url_default_endpoint() {
        let synth = GoogleSynthesizer::new("key".to_string(), None, 30).unwrap();
        assert_eq!(
            synth.synthesize_url(),
            "https://texttospeech.googleapis.com/v1/text:synthesize"
        );
    }

    #[test]
    fn test_synthesize_url_override_trims_slash() {
        let synth = GoogleSynthesizer::new(
            "key".to_string(),
            Some("http://127.0.0.1:9000/".to_string()),
            30,
        )
        .unwrap();
        assert_eq!(synth.synthesize_url(), "http://127.0.0.1:9000/v1/text:synthesize");
    }

    #[test]
    fn test_request_body_shape() {
        let body = SynthesizeBody {
            input: SynthesisInput { text: "Hello" },
            voice: VoiceSelection {
                language_code: "en-US",
                ssml_gender: "FEMALE",
                name: Some("en-US-Neural2-C"),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["input"]["text"], "Hello");
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert_eq!(json["voice"]["ssmlGender"], "FEMALE");
        assert_eq!(json["voice"]["name"], "en-US-Neural2-C");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn test_request_body_omits_unnamed_voice() {
        let body = SynthesizeBody {
            input: SynthesisInput { text: "Hi" },
            voice: VoiceSelection {
                language_code: "en-GB",
                ssml_gender: "MALE",
                name: None,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json["voice"].get("name").is_none());
    }
}
