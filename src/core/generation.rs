//! Generation orchestrator: validates a request against the session quota,
//! delegates synthesis and upload to the external collaborators, and keeps
//! the history log consistent with the counter.
//!
//! Failure rules: no failure path writes a `completed` record or consumes
//! quota. The quota claim is a single atomic conditional update on the store
//! and runs only after synthesis and upload have succeeded; a lost claim
//! surfaces `QuotaExceeded` and marks the attempt `failed`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::core::catalog::VoiceProfile;
use crate::core::session::SessionManager;
use crate::core::synth::{SynthesisRequest, Synthesizer};
use crate::errors::app_error::{AppError, AppResult};
use crate::storage::AudioStorage;
use crate::store::{Datastore, NewGenerationRecord};

/// Lifecycle state of a generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Completed,
    Failed,
}

/// Append-only audit record of a generation attempt
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub id: i64,
    pub user_id: i64,
    pub session_id: i64,
    pub voice_profile_id: i64,
    pub text: String,
    /// Set once synthesis and upload complete
    pub audio_url: Option<String>,
    /// Audio duration; the synthesis response carries none, so this stays
    /// unset for now
    pub duration_secs: Option<u32>,
    pub status: GenerationStatus,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

/// Successful generation result handed back to the client
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub audio_url: String,
    pub voice_profile: VoiceProfile,
    pub record_id: i64,
}

pub struct GenerationOrchestrator {
    store: Arc<dyn Datastore>,
    sessions: SessionManager,
    synthesizer: Arc<dyn Synthesizer>,
    audio_storage: Option<AudioStorage>,
    max_text_length: usize,
    synthesis_timeout: Duration,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<dyn Datastore>,
        sessions: SessionManager,
        synthesizer: Arc<dyn Synthesizer>,
        audio_storage: Option<AudioStorage>,
        max_text_length: usize,
        synthesis_timeout_seconds: u64,
    ) -> Self {
        Self {
            store,
            sessions,
            synthesizer,
            audio_storage,
            max_text_length,
            synthesis_timeout: Duration::from_secs(synthesis_timeout_seconds),
        }
    }

    fn validate_text(&self, text: &str) -> AppResult<()> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput("text must not be empty".to_string()));
        }
        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(AppError::InvalidInput(format!(
                "text length {} exceeds maximum of {} characters",
                length, self.max_text_length
            )));
        }
        Ok(())
    }

    /// Mark a pending record failed. Best-effort: a store error here is
    /// logged, not surfaced over the original failure.
    async fn mark_failed(&self, record_id: i64) {
        let result = self
            .store
            .finalize_generation(
                record_id,
                GenerationStatus::Failed,
                None,
                OffsetDateTime::now_utc(),
            )
            .await;
        if let Err(err) = result {
            warn!(record_id, error = %err, "Failed to mark generation record as failed");
        }
    }

    /// Run one generation request end to end.
    pub async fn generate(
        &self,
        token: &str,
        voice_profile_id: i64,
        text: &str,
    ) -> AppResult<GenerationOutcome> {
        // 1. Resolve the session (absent or expired tokens both fail here)
        let session = self.sessions.session_by_token(token).await?;

        // 2. Fast-fail quota precheck: at-quota requests must never reach the
        // synthesis collaborator. The authoritative bound is the atomic claim
        // below.
        if !self.sessions.status(&session).can_generate {
            return Err(AppError::QuotaExceeded);
        }

        // 3. Resolve the voice profile
        let profile = self
            .store
            .voice_profile_by_id(voice_profile_id)
            .await?
            .ok_or(AppError::ProfileNotFound(voice_profile_id))?;

        // 4. Validate the input text
        self.validate_text(text)?;

        // 5. Record the attempt as pending before engaging the collaborators
        let record = self
            .store
            .insert_generation(NewGenerationRecord {
                user_id: session.user_id,
                session_id: session.id,
                voice_profile_id,
                text: text.to_string(),
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        // 6. Synthesize under the configured deadline
        let request = SynthesisRequest {
            text,
            language_code: &profile.language_code,
            ssml_gender: profile.gender.ssml_gender(),
            voice_name: Some(&profile.tts_voice_id),
        };
        let audio = match tokio::time::timeout(
            self.synthesis_timeout,
            self.synthesizer.synthesize(request),
        )
        .await
        {
            Ok(Ok(audio)) => audio,
            Ok(Err(err)) => {
                warn!(record_id = record.id, error = %err, "Synthesis failed");
                self.mark_failed(record.id).await;
                return Err(AppError::SynthesisFailed(err.to_string()));
            }
            Err(_) => {
                warn!(record_id = record.id, "Synthesis timed out");
                self.mark_failed(record.id).await;
                return Err(AppError::SynthesisFailed(format!(
                    "synthesis timed out after {}s",
                    self.synthesis_timeout.as_secs()
                )));
            }
        };

        // 7. Upload the audio
        let Some(ref storage) = self.audio_storage else {
            self.mark_failed(record.id).await;
            return Err(AppError::StorageFailed(
                "audio storage not configured".to_string(),
            ));
        };
        let audio_url = match tokio::time::timeout(
            self.synthesis_timeout,
            storage.put_audio(audio.data),
        )
        .await
        {
            Ok(Ok(url)) => url,
            Ok(Err(err)) => {
                warn!(record_id = record.id, error = %err, "Audio upload failed");
                self.mark_failed(record.id).await;
                return Err(AppError::StorageFailed(err.to_string()));
            }
            Err(_) => {
                warn!(record_id = record.id, "Audio upload timed out");
                self.mark_failed(record.id).await;
                return Err(AppError::StorageFailed(format!(
                    "audio upload timed out after {}s",
                    self.synthesis_timeout.as_secs()
                )));
            }
        };

        // 8. Atomically claim quota; a lost race means a concurrent request
        // on the same token got there first
        if !self.sessions.claim_generation(session.id).await? {
            self.mark_failed(record.id).await;
            return Err(AppError::QuotaExceeded);
        }

        // 9. Finalize the record and return
        self.store
            .finalize_generation(
                record.id,
                GenerationStatus::Completed,
                Some(audio_url.clone()),
                OffsetDateTime::now_utc(),
            )
            .await?;

        info!(
            session_id = session.id,
            record_id = record.id,
            voice_profile_id,
            "Generation completed"
        );

        Ok(GenerationOutcome {
            audio_url,
            voice_profile: profile,
            record_id: record.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{default_voice_profiles, seed_voice_profiles};
    use crate::core::synth::{SynthesisError, SynthesizedAudio};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSynthesizer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubSynthesizer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(
            &self,
            _request: SynthesisRequest<'_>,
        ) -> Result<SynthesizedAudio, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SynthesisError::MissingAudio);
            }
            Ok(SynthesizedAudio {
                data: Bytes::from_static(b"mp3data"),
            })
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct Fixture {
        store: Arc<dyn Datastore>,
        sessions: SessionManager,
        synthesizer: Arc<StubSynthesizer>,
        orchestrator: GenerationOrchestrator,
    }

    async fn fixture(fail_synthesis: bool, with_storage: bool) -> Fixture {
        let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
        seed_voice_profiles(&store).await.unwrap();

        let sessions = SessionManager::new(store.clone(), 2, 24 * 60 * 60);
        let synthesizer = StubSynthesizer::new(fail_synthesis);
        let audio_storage = with_storage.then(|| {
            AudioStorage::new(
                Arc::new(InMemory::new()),
                Some("generations".to_string()),
                "https://cdn.example.com".to_string(),
            )
        });

        let orchestrator = GenerationOrchestrator::new(
            store.clone(),
            sessions.clone(),
            synthesizer.clone(),
            audio_storage,
            500,
            5,
        );

        Fixture {
            store,
            sessions,
            synthesizer,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_generate_happy_path() {
        let fx = fixture(false, true).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        let outcome = fx
            .orchestrator
            .generate(&session.token, 1, "Hello")
            .await
            .unwrap();

        assert!(outcome.audio_url.starts_with("https://cdn.example.com/generations/"));
        assert_eq!(outcome.voice_profile.id, 1);

        // Counter consumed, history record completed with the same URL
        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 1);

        let records = fx.store.generations_for_session(session.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, GenerationStatus::Completed);
        assert_eq!(records[0].audio_url.as_deref(), Some(outcome.audio_url.as_str()));
        assert!(records[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_generate_invalid_token() {
        let fx = fixture(false, true).await;
        let err = fx
            .orchestrator
            .generate("sess_bogus", 1, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSession(_)));
        assert_eq!(fx.synthesizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_unknown_profile_leaves_counter() {
        let fx = fixture(false, true).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        let err = fx
            .orchestrator
            .generate(&session.token, 99, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProfileNotFound(99)));

        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 0);
        assert_eq!(fx.synthesizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_and_overlong_text() {
        let fx = fixture(false, true).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        let err = fx
            .orchestrator
            .generate(&session.token, 1, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let long_text = "a".repeat(501);
        let err = fx
            .orchestrator
            .generate(&session.token, 1, &long_text)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 0);
        assert_eq!(fx.synthesizer.call_count(), 0);
        // Validation failures write no history
        let records = fx.store.generations_for_session(session.id).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_consumes_no_quota() {
        let fx = fixture(true, true).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        let err = fx
            .orchestrator
            .generate(&session.token, 1, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SynthesisFailed(_)));

        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 0);

        let records = fx.store.generations_for_session(session.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, GenerationStatus::Failed);
        assert!(records[0].audio_url.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_storage_fails_without_quota_use() {
        let fx = fixture(false, false).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        let err = fx
            .orchestrator
            .generate(&session.token, 1, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageFailed(_)));

        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 0);

        let records = fx.store.generations_for_session(session.id).await.unwrap();
        assert_eq!(records[0].status, GenerationStatus::Failed);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_skips_synthesizer() {
        let fx = fixture(false, true).await;
        let session = fx.sessions.create_session(1).await.unwrap();

        fx.orchestrator
            .generate(&session.token, 1, "One")
            .await
            .unwrap();
        fx.orchestrator
            .generate(&session.token, 2, "Two")
            .await
            .unwrap();
        assert_eq!(fx.synthesizer.call_count(), 2);

        let err = fx
            .orchestrator
            .generate(&session.token, 1, "Three")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded));
        // The at-quota request never reached the collaborator
        assert_eq!(fx.synthesizer.call_count(), 2);

        let found = fx.sessions.session_by_token(&session.token).await.unwrap();
        assert_eq!(found.generation_count, 2);
    }
}
