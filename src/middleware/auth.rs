use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{Auth, match_api_secret_id};
use crate::errors::auth_error::AuthError;
use crate::state::AppState;

/// Extract the bearer token from the Authorization header
fn extract_token(request: &Request) -> Result<String, AuthError> {
    let auth_header = request
        .headers()
        .get("authorization")
        .ok_or(AuthError::MissingAuthHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Authentication middleware that validates bearer API secrets.
///
/// When `auth.required` is false an empty [`Auth`] context is inserted so
/// handlers that read the context still work. When enabled, the token must
/// match one of the configured API secrets; matching is constant-time.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.config.auth_required {
        tracing::debug!("Authentication disabled, inserting empty Auth context");
        request.extensions_mut().insert(Auth::empty());
        return Ok(next.run(request).await);
    }

    let request_method = request.method().to_string();
    let request_path = request.uri().path().to_string();

    let token = extract_token(&request)?;

    if !state.config.has_api_secret_auth() {
        return Err(AuthError::ConfigError(
            "Authentication required but no API secrets configured".to_string(),
        ));
    }

    match match_api_secret_id(&token, &state.config.auth_api_secrets) {
        Some(secret_id) => {
            tracing::info!(
                method = %request_method,
                path = %request_path,
                auth_id = %secret_id,
                "API secret authentication successful"
            );
            request.extensions_mut().insert(Auth::new(secret_id));
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!(
                method = %request_method,
                path = %request_path,
                "API secret authentication failed: token mismatch"
            );
            Err(AuthError::Unauthorized("Invalid API secret".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;

    fn request_with_header(value: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri("/generate")
            .header("authorization", value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_token_bearer() {
        let request = request_with_header("Bearer my-token");
        assert_eq!(extract_token(&request).unwrap(), "my-token");
    }

    #[test]
    fn test_extract_token_wrong_scheme() {
        let request = request_with_header("Basic dXNlcjpwYXNz");
        assert!(matches!(
            extract_token(&request),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn test_extract_token_missing() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/voices")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(
            extract_token(&request),
            Err(AuthError::MissingAuthHeader)
        ));
    }
}
