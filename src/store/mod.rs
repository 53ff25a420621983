//! Persistence layer behind an explicitly constructed data-access object.
//!
//! The [`Datastore`] trait owns the three persisted collections (voice
//! profiles, sessions, generation history) and the store lifecycle. It is
//! constructed at startup and closed at shutdown; a closed or unreachable
//! store reports [`StoreError::Unavailable`] on every operation so the server
//! degrades to denied requests instead of crashing.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::catalog::VoiceProfile;
use crate::core::generation::{GenerationRecord, GenerationStatus};
use crate::core::session::Session;

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store is closed or unreachable
    #[error("datastore unavailable")]
    Unavailable,

    /// The referenced row does not exist
    #[error("record not found")]
    NotFound,
}

/// New session row, id assigned by the store
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub token: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// New generation history row, created `pending`, id assigned by the store
#[derive(Debug, Clone)]
pub struct NewGenerationRecord {
    pub user_id: i64,
    pub session_id: i64,
    pub voice_profile_id: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
}

/// Data-access object over the persisted state.
///
/// All session-counter mutation goes through [`Datastore::claim_generation`],
/// which is the single atomic conditional update enforcing the quota bound.
#[async_trait]
pub trait Datastore: Send + Sync {
    // Voice catalog (immutable after seed)
    async fn seed_voice_profiles(&self, profiles: Vec<VoiceProfile>) -> Result<(), StoreError>;
    async fn list_voice_profiles(&self) -> Result<Vec<VoiceProfile>, StoreError>;
    async fn voice_profile_by_id(&self, id: i64) -> Result<Option<VoiceProfile>, StoreError>;

    // Sessions
    async fn insert_session(&self, new: NewSession) -> Result<Session, StoreError>;
    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Atomically bump the session's generation counter iff it is still under
    /// `quota`. Returns `Ok(true)` when the claim won, `Ok(false)` when the
    /// counter had already reached the quota. No two concurrent claims on the
    /// same session may both win past the bound.
    async fn claim_generation(&self, session_id: i64, quota: u32) -> Result<bool, StoreError>;

    // Generation history (append-only)
    async fn insert_generation(
        &self,
        new: NewGenerationRecord,
    ) -> Result<GenerationRecord, StoreError>;

    /// Finalize a pending record as completed or failed
    async fn finalize_generation(
        &self,
        record_id: i64,
        status: GenerationStatus,
        audio_url: Option<String>,
        completed_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    async fn generations_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<GenerationRecord>, StoreError>;

    /// Close the store. Every subsequent operation reports
    /// [`StoreError::Unavailable`].
    async fn close(&self);
}
