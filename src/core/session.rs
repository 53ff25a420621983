//! Session manager: quota-tracked usage windows.
//!
//! A session is created for a user, carries an opaque unguessable token, and
//! counts successful generations against a fixed quota. Sessions are never
//! deleted; they become inert once expired or once the counter reaches the
//! quota. The only counter mutation path is the atomic claim on the store.

use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::errors::app_error::{AppError, AppResult};
use crate::store::{Datastore, NewSession, StoreError};

#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    /// Opaque unguessable token handed to the client
    pub token: String,
    pub generation_count: u32,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// A session is valid only while `now < expires_at`
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Quota projection of a session, surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub generation_count: u32,
    pub remaining_generations: u32,
    pub can_generate: bool,
}

/// Creates sessions, resolves tokens, and owns the quota claim.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Datastore>,
    quota: u32,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Datastore>, quota: u32, ttl_seconds: u64) -> Self {
        Self {
            store,
            quota,
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    fn generate_token() -> String {
        format!("sess_{}", Uuid::new_v4().simple())
    }

    /// Create a session for the user with counter 0 and the configured expiry
    /// horizon.
    pub async fn create_session(&self, user_id: i64) -> AppResult<Session> {
        let now = OffsetDateTime::now_utc();
        let session = self
            .store
            .insert_session(NewSession {
                user_id,
                token: Self::generate_token(),
                created_at: now,
                expires_at: now + self.ttl,
            })
            .await?;

        debug!(
            session_id = session.id,
            user_id,
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Resolve a session by token. Unknown tokens and expired sessions both
    /// surface as `InvalidSession`.
    pub async fn session_by_token(&self, token: &str) -> AppResult<Session> {
        let session = self
            .store
            .session_by_token(token)
            .await?
            .ok_or_else(|| AppError::InvalidSession("unknown session token".to_string()))?;

        if session.is_expired(OffsetDateTime::now_utc()) {
            return Err(AppError::InvalidSession("session expired".to_string()));
        }
        Ok(session)
    }

    /// Quota projection for a resolved session
    pub fn status(&self, session: &Session) -> SessionStatus {
        SessionStatus {
            generation_count: session.generation_count,
            remaining_generations: self.quota.saturating_sub(session.generation_count),
            can_generate: session.generation_count < self.quota,
        }
    }

    /// Atomically claim one generation against the quota. `Ok(true)` means
    /// the claim won; `Ok(false)` means the counter had already reached the
    /// quota and the caller must not proceed.
    pub async fn claim_generation(&self, session_id: i64) -> AppResult<bool> {
        match self.store.claim_generation(session_id, self.quota).await {
            Ok(won) => Ok(won),
            Err(StoreError::NotFound) => {
                Err(AppError::InvalidSession("session no longer exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
