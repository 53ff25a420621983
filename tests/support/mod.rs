//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body, http::Request};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use object_store::memory::InMemory;
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxcast_server::config::ServerConfig;
use voxcast_server::state::AppState;
use voxcast_server::storage::AudioStorage;
use voxcast_server::store::{Datastore, MemoryStore};
use voxcast_server::synth::create_synthesizer;

pub const PUBLIC_AUDIO_BASE: &str = "https://cdn.test/audio";

/// Minimal test configuration: auth off, quota of 2, no real collaborators
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 3001,
        tls: None,
        synthesis_provider: "google".to_string(),
        synthesis_api_key: Some("test-key".to_string()),
        synthesis_endpoint: None,
        synthesis_timeout_seconds: 5,
        audio_s3_bucket: None,
        audio_s3_region: None,
        audio_s3_endpoint: None,
        audio_s3_access_key: None,
        audio_s3_secret_key: None,
        audio_s3_prefix: None,
        audio_public_base_url: None,
        generation_quota: 2,
        max_text_length: 500,
        session_ttl_seconds: 86400,
        auth_api_secrets: Vec::new(),
        auth_required: false,
        cors_allowed_origins: Some("*".to_string()),
        rate_limit_requests_per_second: 100000, // Disable for tests
        rate_limit_burst_size: 100,
    }
}

/// Application state wired against the given synthesis endpoint (a wiremock
/// server) and an in-memory object store for audio.
pub async fn test_state(synthesis_endpoint: &str) -> Arc<AppState> {
    let mut config = test_config();
    config.synthesis_endpoint = Some(synthesis_endpoint.to_string());
    state_from(config, true).await
}

/// Build state from a config; `with_storage` controls whether the audio
/// object-storage collaborator is wired in.
pub async fn state_from(config: ServerConfig, with_storage: bool) -> Arc<AppState> {
    let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
    let synthesizer = Arc::from(create_synthesizer(&config).expect("synthesizer"));
    let storage = with_storage.then(|| {
        AudioStorage::new(
            Arc::new(InMemory::new()),
            Some("generations".to_string()),
            PUBLIC_AUDIO_BASE.to_string(),
        )
    });
    AppState::from_parts(config, store, synthesizer, storage).await
}

/// Start a mock Google TTS server answering every synthesize call with a
/// small base64 MP3 payload.
pub async fn mock_synthesis_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audioContent": BASE64.encode(b"mp3-bytes"),
        })))
        .mount(&server)
        .await;
    server
}

/// Issue a GET against the router and return (status, parsed JSON body)
pub async fn get(app: &Router, uri: &str) -> (axum::http::StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

/// Issue a POST with a JSON body and return (status, parsed JSON body)
pub async fn post_json(app: &Router, uri: &str, body: Value) -> (axum::http::StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}

/// Create a session through the API and return its token
pub async fn create_session(app: &Router, user_id: i64) -> String {
    let (status, body) = post_json(app, "/sessions", json!({ "user_id": user_id })).await;
    assert_eq!(status, axum::http::StatusCode::CREATED);
    body["session_token"].as_str().unwrap().to_string()
}
