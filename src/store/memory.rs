//! In-memory datastore backed by `dashmap`.
//!
//! The concrete store shipped with the server. The atomic conditional
//! increment runs under the dashmap shard write lock held by `get_mut`, so
//! concurrent claims on one session serialize there.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{Datastore, NewGenerationRecord, NewSession, StoreError};
use crate::core::catalog::VoiceProfile;
use crate::core::generation::{GenerationRecord, GenerationStatus};
use crate::core::session::Session;

#[derive(Default)]
pub struct MemoryStore {
    profiles: DashMap<i64, VoiceProfile>,
    sessions: DashMap<i64, Session>,
    /// token -> session id index
    session_tokens: DashMap<String, i64>,
    records: DashMap<i64, GenerationRecord>,
    next_session_id: AtomicI64,
    next_record_id: AtomicI64,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    async fn seed_voice_profiles(&self, profiles: Vec<VoiceProfile>) -> Result<(), StoreError> {
        self.check_open()?;
        for profile in profiles {
            self.profiles.insert(profile.id, profile);
        }
        Ok(())
    }

    async fn list_voice_profiles(&self) -> Result<Vec<VoiceProfile>, StoreError> {
        self.check_open()?;
        let mut profiles: Vec<VoiceProfile> =
            self.profiles.iter().map(|e| e.value().clone()).collect();
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }

    async fn voice_profile_by_id(&self, id: i64) -> Result<Option<VoiceProfile>, StoreError> {
        self.check_open()?;
        Ok(self.profiles.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_session(&self, new: NewSession) -> Result<Session, StoreError> {
        self.check_open()?;
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Session {
            id,
            user_id: new.user_id,
            token: new.token,
            generation_count: 0,
            created_at: new.created_at,
            expires_at: new.expires_at,
        };
        self.session_tokens.insert(session.token.clone(), id);
        self.sessions.insert(id, session.clone());
        debug!(session_id = id, user_id = new.user_id, "Session stored");
        Ok(session)
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.check_open()?;
        let Some(id) = self.session_tokens.get(token).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.sessions.get(&id).map(|e| e.value().clone()))
    }

    async fn claim_generation(&self, session_id: i64, quota: u32) -> Result<bool, StoreError> {
        self.check_open()?;
        // get_mut holds the shard write lock for the check and the bump,
        // making the conditional increment atomic across tasks.
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return Err(StoreError::NotFound);
        };
        if session.generation_count >= quota {
            return Ok(false);
        }
        session.generation_count += 1;
        Ok(true)
    }

    async fn insert_generation(
        &self,
        new: NewGenerationRecord,
    ) -> Result<GenerationRecord, StoreError> {
        self.check_open()?;
        let id = self.next_record_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = GenerationRecord {
            id,
            user_id: new.user_id,
            session_id: new.session_id,
            voice_profile_id: new.voice_profile_id,
            text: new.text,
            audio_url: None,
            duration_secs: None,
            status: GenerationStatus::Pending,
            created_at: new.created_at,
            completed_at: None,
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn finalize_generation(
        &self,
        record_id: i64,
        status: GenerationStatus,
        audio_url: Option<String>,
        completed_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        let Some(mut record) = self.records.get_mut(&record_id) else {
            warn!(record_id, "Finalize requested for unknown generation record");
            return Err(StoreError::NotFound);
        };
        record.status = status;
        record.audio_url = audio_url;
        record.completed_at = Some(completed_at);
        Ok(())
    }

    async fn generations_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<GenerationRecord>, StoreError> {
        self.check_open()?;
        let mut records: Vec<GenerationRecord> = self
            .records
            .iter()
            .filter(|e| e.value().session_id == session_id)
            .map(|e| e.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        debug!("Memory datastore closed");
    }
}
