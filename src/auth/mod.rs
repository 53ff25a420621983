//! Authentication context and API secret matching.

use subtle::ConstantTimeEq;

use crate::config::AuthApiSecret;

/// Authentication context inserted into request extensions by the auth
/// middleware. When authentication is disabled the context is empty.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    /// Identifier of the matched API secret, if any
    pub id: Option<String>,
}

impl Auth {
    /// Empty context used when authentication is disabled
    pub fn empty() -> Self {
        Self { id: None }
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// Find the API secret identifier matching a bearer token.
///
/// Comparison is constant-time per candidate secret to avoid leaking secret
/// contents through timing.
pub fn match_api_secret_id<'a>(token: &str, secrets: &'a [AuthApiSecret]) -> Option<&'a str> {
    let token_bytes = token.as_bytes();
    secrets
        .iter()
        .find(|entry| {
            let secret_bytes = entry.secret.as_bytes();
            secret_bytes.len() == token_bytes.len()
                && bool::from(secret_bytes.ct_eq(token_bytes))
        })
        .map(|entry| entry.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Vec<AuthApiSecret> {
        vec![
            AuthApiSecret {
                id: "client-a".to_string(),
                secret: "token-a".to_string(),
            },
            AuthApiSecret {
                id: "client-b".to_string(),
                secret: "token-b".to_string(),
            },
        ]
    }

    #[test]
    fn test_match_known_secret() {
        let secrets = secrets();
        assert_eq!(match_api_secret_id("token-a", &secrets), Some("client-a"));
        assert_eq!(match_api_secret_id("token-b", &secrets), Some("client-b"));
    }

    #[test]
    fn test_reject_unknown_secret() {
        let secrets = secrets();
        assert_eq!(match_api_secret_id("token-c", &secrets), None);
        assert_eq!(match_api_secret_id("", &secrets), None);
        // Same length as a real secret but different content
        assert_eq!(match_api_secret_id("token-x", &secrets), None);
    }

    #[test]
    fn test_empty_secret_list() {
        assert_eq!(match_api_secret_id("anything", &[]), None);
    }
}
