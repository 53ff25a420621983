use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Environment variables can
/// provide any values not specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// synthesis:
///   provider: "google"
///   api_key: "your-google-tts-key"
///   endpoint: "https://texttospeech.googleapis.com"
///   timeout_seconds: 30
///
/// audio_storage:
///   s3_bucket: "my-audio-bucket"
///   s3_region: "us-east-1"
///   s3_prefix: "generations"
///   public_base_url: "https://storage.googleapis.com/my-audio-bucket"
///
/// limits:
///   generation_quota: 2
///   max_text_length: 500
///   session_ttl_seconds: 86400
///
/// auth:
///   required: true
///   api_secrets:
///     - id: "client-a"
///       secret: "your-api-secret"
///
/// security:
///   cors_allowed_origins: "https://example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub audio_storage: Option<AudioStorageYaml>,
    pub limits: Option<LimitsYaml>,
    pub auth: Option<AuthYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Speech-synthesis collaborator configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    /// Synthesis provider name (currently only "google")
    pub provider: Option<String>,
    /// API key for the synthesis service
    pub api_key: Option<String>,
    /// Override the default API endpoint (useful for testing against a mock)
    pub endpoint: Option<String>,
    /// Per-request deadline for synthesis calls
    pub timeout_seconds: Option<u64>,
}

/// Audio object-storage configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioStorageYaml {
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_prefix: Option<String>,
    /// Base URL that generated audio is publicly reachable under.
    /// Defaults to `https://storage.googleapis.com/{s3_bucket}` when unset.
    pub public_base_url: Option<String>,
}

/// Quota and validation limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LimitsYaml {
    /// Maximum successful generations per session
    pub generation_quota: Option<u32>,
    /// Maximum input text length in characters
    pub max_text_length: Option<usize>,
    /// Session validity window in seconds
    pub session_ttl_seconds: Option<u64>,
}

/// Authentication configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub required: Option<bool>,
    /// Preferred multi-secret form. If non-empty, it takes precedence over api_secret.
    #[serde(default)]
    pub api_secrets: Vec<AuthApiSecretYaml>,
    /// Legacy single-secret alias. Ignored when api_secrets is non-empty.
    pub api_secret: Option<String>,
}

/// API secret authentication entry in YAML
#[derive(Debug, Clone, Deserialize)]
pub struct AuthApiSecretYaml {
    pub id: String,
    pub secret: String,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid YAML
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config {}: {}", path.display(), e))?;

        Ok(config)
    }
}
