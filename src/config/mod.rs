//! Configuration module for the Voxcast server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use voxcast_server::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod yaml;

use yaml::YamlConfig;

/// Default maximum successful generations per session
pub const DEFAULT_GENERATION_QUOTA: u32 = 2;
/// Default maximum input text length in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 500;
/// Default session validity window (24 hours)
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
/// Default deadline for synthesis collaborator calls
pub const DEFAULT_SYNTHESIS_TIMEOUT_SECONDS: u64 = 30;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// API secret authentication entry with a client identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthApiSecret {
    pub id: String,
    pub secret: String,
}

/// Server configuration
///
/// Contains all configuration needed to run the Voxcast server, including:
/// - Server settings (host, port, TLS)
/// - Synthesis collaborator settings (provider, API key, endpoint, deadline)
/// - Audio object-storage settings (S3 bucket, public URL base)
/// - Quota limits (per-session generation quota, text length, session TTL)
/// - Authentication settings (API secrets)
/// - Security settings (CORS, per-IP rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Synthesis collaborator
    /// Synthesis provider name (currently only "google")
    pub synthesis_provider: String,
    /// API key for the synthesis service
    pub synthesis_api_key: Option<String>,
    /// Override the default synthesis API endpoint (used by tests against a mock)
    pub synthesis_endpoint: Option<String>,
    /// Deadline for a single synthesis call
    pub synthesis_timeout_seconds: u64,

    // Audio object storage
    /// Audio storage is configured when a bucket is set; generation requests
    /// fail with a storage error otherwise.
    pub audio_s3_bucket: Option<String>,
    pub audio_s3_region: Option<String>,
    pub audio_s3_endpoint: Option<String>,
    pub audio_s3_access_key: Option<String>,
    pub audio_s3_secret_key: Option<String>,
    /// Optional key prefix; audio lands at `{prefix}/{uuid}.mp3`
    pub audio_s3_prefix: Option<String>,
    /// Base URL generated audio is publicly reachable under
    pub audio_public_base_url: Option<String>,

    // Quota limits
    /// Maximum successful generations per session
    pub generation_quota: u32,
    /// Maximum input text length in characters
    pub max_text_length: usize,
    /// Session validity window in seconds
    pub session_ttl_seconds: u64,

    // Authentication configuration
    pub auth_api_secrets: Vec<AuthApiSecret>,
    pub auth_required: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration (per-IP, unrelated to the session quota)
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: u32,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
/// This ensures sensitive data is cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.synthesis_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.audio_s3_access_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.audio_s3_secret_key {
            secret.zeroize();
        }
        for entry in &mut self.auth_api_secrets {
            entry.secret.zeroize();
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid value for {name}: {raw}").into()),
        None => Ok(None),
    }
}

fn parse_auth_api_secrets_json(
    json_str: &str,
) -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    #[derive(serde::Deserialize)]
    struct AuthApiSecretJson {
        id: String,
        secret: String,
    }

    let secrets: Vec<AuthApiSecretJson> = serde_json::from_str(json_str)
        .map_err(|e| format!("Invalid AUTH_API_SECRETS_JSON format: {e}"))?;

    Ok(secrets
        .into_iter()
        .map(|entry| AuthApiSecret {
            id: entry.id,
            secret: entry.secret,
        })
        .collect())
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Note: the .env file is loaded by main.rs at startup, so its values
    /// appear here as regular environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Self::merge(None)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        Self::merge(Some(yaml_config))
    }

    fn merge(yaml: Option<YamlConfig>) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = yaml.unwrap_or_default();
        let server = yaml.server.unwrap_or_default();
        let synthesis = yaml.synthesis.unwrap_or_default();
        let storage = yaml.audio_storage.unwrap_or_default();
        let limits = yaml.limits.unwrap_or_default();
        let auth = yaml.auth.unwrap_or_default();
        let security = yaml.security.unwrap_or_default();

        let tls = match server.tls {
            Some(tls) if tls.enabled.unwrap_or(false) => {
                let cert_path = tls
                    .cert_path
                    .ok_or("TLS enabled but tls.cert_path is not set")?;
                let key_path = tls
                    .key_path
                    .ok_or("TLS enabled but tls.key_path is not set")?;
                Some(TlsConfig {
                    cert_path: PathBuf::from(cert_path),
                    key_path: PathBuf::from(key_path),
                })
            }
            _ => match (env_string("TLS_CERT_PATH"), env_string("TLS_KEY_PATH")) {
                (Some(cert), Some(key)) => Some(TlsConfig {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                }),
                _ => None,
            },
        };

        let mut auth_api_secrets: Vec<AuthApiSecret> = auth
            .api_secrets
            .into_iter()
            .map(|entry| AuthApiSecret {
                id: entry.id,
                secret: entry.secret,
            })
            .collect();
        if auth_api_secrets.is_empty() {
            if let Some(secret) = auth.api_secret {
                auth_api_secrets.push(AuthApiSecret {
                    id: "default".to_string(),
                    secret,
                });
            }
        }
        if auth_api_secrets.is_empty() {
            if let Some(json) = env_string("AUTH_API_SECRETS_JSON") {
                auth_api_secrets = parse_auth_api_secrets_json(&json)?;
            } else if let Some(secret) = env_string("AUTH_API_SECRET") {
                auth_api_secrets.push(AuthApiSecret {
                    id: "default".to_string(),
                    secret,
                });
            }
        }

        let config = ServerConfig {
            host: server
                .host
                .or_else(|| env_string("HOST"))
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match server.port {
                Some(port) => port,
                None => env_parse::<u16>("PORT")?.unwrap_or(3001),
            },
            tls,
            synthesis_provider: synthesis
                .provider
                .or_else(|| env_string("SYNTHESIS_PROVIDER"))
                .unwrap_or_else(|| "google".to_string()),
            synthesis_api_key: synthesis
                .api_key
                .or_else(|| env_string("GOOGLE_TTS_API_KEY")),
            synthesis_endpoint: synthesis
                .endpoint
                .or_else(|| env_string("SYNTHESIS_ENDPOINT")),
            synthesis_timeout_seconds: match synthesis.timeout_seconds {
                Some(v) => v,
                None => env_parse::<u64>("SYNTHESIS_TIMEOUT_SECONDS")?
                    .unwrap_or(DEFAULT_SYNTHESIS_TIMEOUT_SECONDS),
            },
            audio_s3_bucket: storage.s3_bucket.or_else(|| env_string("AUDIO_S3_BUCKET")),
            audio_s3_region: storage.s3_region.or_else(|| env_string("AUDIO_S3_REGION")),
            audio_s3_endpoint: storage
                .s3_endpoint
                .or_else(|| env_string("AUDIO_S3_ENDPOINT")),
            audio_s3_access_key: storage
                .s3_access_key
                .or_else(|| env_string("AUDIO_S3_ACCESS_KEY")),
            audio_s3_secret_key: storage
                .s3_secret_key
                .or_else(|| env_string("AUDIO_S3_SECRET_KEY")),
            audio_s3_prefix: storage.s3_prefix.or_else(|| env_string("AUDIO_S3_PREFIX")),
            audio_public_base_url: storage
                .public_base_url
                .or_else(|| env_string("AUDIO_PUBLIC_BASE_URL")),
            generation_quota: match limits.generation_quota {
                Some(v) => v,
                None => env_parse::<u32>("GENERATION_QUOTA")?.unwrap_or(DEFAULT_GENERATION_QUOTA),
            },
            max_text_length: match limits.max_text_length {
                Some(v) => v,
                None => env_parse::<usize>("MAX_TEXT_LENGTH")?.unwrap_or(DEFAULT_MAX_TEXT_LENGTH),
            },
            session_ttl_seconds: match limits.session_ttl_seconds {
                Some(v) => v,
                None => {
                    env_parse::<u64>("SESSION_TTL_SECONDS")?.unwrap_or(DEFAULT_SESSION_TTL_SECONDS)
                }
            },
            auth_api_secrets,
            auth_required: match auth.required {
                Some(v) => v,
                None => env_parse::<bool>("AUTH_REQUIRED")?.unwrap_or(false),
            },
            cors_allowed_origins: security
                .cors_allowed_origins
                .or_else(|| env_string("CORS_ALLOWED_ORIGINS")),
            rate_limit_requests_per_second: match security.rate_limit_requests_per_second {
                Some(v) => v,
                None => env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")?.unwrap_or(60),
            },
            rate_limit_burst_size: match security.rate_limit_burst_size {
                Some(v) => v,
                None => env_parse::<u32>("RATE_LIMIT_BURST_SIZE")?.unwrap_or(10),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.generation_quota == 0 {
            return Err("limits.generation_quota must be at least 1".into());
        }
        if self.max_text_length == 0 {
            return Err("limits.max_text_length must be at least 1".into());
        }
        if self.session_ttl_seconds == 0 {
            return Err("limits.session_ttl_seconds must be at least 1".into());
        }
        if self.auth_required && self.auth_api_secrets.is_empty() {
            return Err(
                "auth.required is true but no API secrets are configured (auth.api_secrets)"
                    .into(),
            );
        }
        for entry in &self.auth_api_secrets {
            if entry.id.trim().is_empty() || entry.secret.trim().is_empty() {
                return Err("auth.api_secrets entries must have non-empty id and secret".into());
            }
        }
        Ok(())
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if API secret authentication is configured
    pub fn has_api_secret_auth(&self) -> bool {
        !self.auth_api_secrets.is_empty()
    }

    /// Check if the audio object-storage collaborator is configured
    pub fn has_audio_storage(&self) -> bool {
        self.audio_s3_bucket.is_some()
    }

    /// Base URL generated audio is served under.
    ///
    /// Falls back to the public Google Cloud Storage URL for the configured
    /// bucket when no explicit base is set.
    pub fn audio_public_base(&self) -> Option<String> {
        if let Some(ref base) = self.audio_public_base_url {
            return Some(base.trim_end_matches('/').to_string());
        }
        self.audio_s3_bucket
            .as_ref()
            .map(|bucket| format!("https://storage.googleapis.com/{bucket}"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    /// Helper to create a test ServerConfig with defaults
    pub(crate) fn test_config() -> ServerConfig {
        ServerConfig {
            host: "localhost".to_string(),
            port: 3001,
            tls: None,
            synthesis_provider: "google".to_string(),
            synthesis_api_key: Some("test-key".to_string()),
            synthesis_endpoint: None,
            synthesis_timeout_seconds: DEFAULT_SYNTHESIS_TIMEOUT_SECONDS,
            audio_s3_bucket: None,
            audio_s3_region: None,
            audio_s3_endpoint: None,
            audio_s3_access_key: None,
            audio_s3_secret_key: None,
            audio_s3_prefix: None,
            audio_public_base_url: None,
            generation_quota: DEFAULT_GENERATION_QUOTA,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            auth_api_secrets: Vec::new(),
            auth_required: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }

    #[test]
    fn test_address_format() {
        let config = test_config();
        assert_eq!(config.address(), "localhost:3001");
    }

    #[test]
    fn test_has_api_secret_auth() {
        let mut config = test_config();
        assert!(!config.has_api_secret_auth());

        config.auth_api_secrets.push(AuthApiSecret {
            id: "client-a".to_string(),
            secret: "token-a".to_string(),
        });
        assert!(config.has_api_secret_auth());
    }

    #[test]
    fn test_audio_public_base_defaults_to_gcs() {
        let mut config = test_config();
        assert!(config.audio_public_base().is_none());

        config.audio_s3_bucket = Some("my-bucket".to_string());
        assert_eq!(
            config.audio_public_base().unwrap(),
            "https://storage.googleapis.com/my-bucket"
        );

        config.audio_public_base_url = Some("https://cdn.example.com/audio/".to_string());
        assert_eq!(
            config.audio_public_base().unwrap(),
            "https://cdn.example.com/audio"
        );
    }

    #[test]
    fn test_validate_rejects_zero_quota() {
        let mut config = test_config();
        config.generation_quota = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_auth_required_without_secrets() {
        let mut config = test_config();
        config.auth_required = true;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("no API secrets"));
    }

    #[test]
    fn test_parse_auth_api_secrets_json() {
        let secrets = parse_auth_api_secrets_json(
            r#"[{"id": "client-a", "secret": "s3cret"}, {"id": "client-b", "secret": "other"}]"#,
        )
        .unwrap();
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets[0].id, "client-a");
        assert_eq!(secrets[1].secret, "other");

        assert!(parse_auth_api_secrets_json("not json").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        for name in [
            "HOST",
            "PORT",
            "GENERATION_QUOTA",
            "MAX_TEXT_LENGTH",
            "SESSION_TTL_SECONDS",
            "AUTH_REQUIRED",
            "AUTH_API_SECRETS_JSON",
            "AUTH_API_SECRET",
        ] {
            unsafe { std::env::remove_var(name) };
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.generation_quota, DEFAULT_GENERATION_QUOTA);
        assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
        assert_eq!(config.session_ttl_seconds, DEFAULT_SESSION_TTL_SECONDS);
        assert!(!config.auth_required);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        unsafe {
            std::env::set_var("GENERATION_QUOTA", "5");
            std::env::set_var("MAX_TEXT_LENGTH", "2000");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.generation_quota, 5);
        assert_eq!(config.max_text_length, 2000);

        unsafe {
            std::env::remove_var("GENERATION_QUOTA");
            std::env::remove_var("MAX_TEXT_LENGTH");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        unsafe { std::env::set_var("GENERATION_QUOTA", "not-a-number") };
        let result = ServerConfig::from_env();
        assert!(result.is_err());
        unsafe { std::env::remove_var("GENERATION_QUOTA") };
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        unsafe { std::env::set_var("GENERATION_QUOTA", "9") };

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "server:\n  host: \"127.0.0.1\"\n  port: 4000\nlimits:\n  generation_quota: 3\n",
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4000);
        // YAML wins over the environment
        assert_eq!(config.generation_quota, 3);

        unsafe { std::env::remove_var("GENERATION_QUOTA") };
    }

    #[test]
    #[serial]
    fn test_from_file_legacy_single_secret() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "auth:\n  required: true\n  api_secret: \"legacy-secret\"\n",
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.auth_api_secrets.len(), 1);
        assert_eq!(config.auth_api_secrets[0].id, "default");
        assert_eq!(config.auth_api_secrets[0].secret, "legacy-secret");
    }
}
