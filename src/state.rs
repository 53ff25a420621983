//! Application state shared across handlers.

use std::sync::Arc;
use tracing::warn;

use crate::config::ServerConfig;
use crate::core::catalog::seed_voice_profiles;
use crate::core::generation::GenerationOrchestrator;
use crate::core::session::SessionManager;
use crate::core::synth::{Synthesizer, create_synthesizer};
use crate::storage::{AudioStorage, build_audio_storage};
use crate::store::{Datastore, MemoryStore};

pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<dyn Datastore>,
    pub sessions: SessionManager,
    pub generator: GenerationOrchestrator,
}

impl AppState {
    /// Build the full application state from configuration: datastore,
    /// synthesis collaborator, audio storage, session manager, and the
    /// generation orchestrator. Seeds the voice catalog.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn Datastore> = Arc::new(MemoryStore::new());
        let synthesizer: Arc<dyn Synthesizer> = Arc::from(create_synthesizer(&config)?);
        let audio_storage = build_audio_storage(&config)?;
        Ok(Self::from_parts(config, store, synthesizer, audio_storage).await)
    }

    /// Assemble state from pre-built collaborators. Used by tests to inject
    /// a mock synthesizer or an in-memory object store.
    pub async fn from_parts(
        config: ServerConfig,
        store: Arc<dyn Datastore>,
        synthesizer: Arc<dyn Synthesizer>,
        audio_storage: Option<AudioStorage>,
    ) -> Arc<Self> {
        if let Err(err) = seed_voice_profiles(&store).await {
            // Degraded mode: an unreachable store denies requests but must
            // not stop the server from coming up.
            warn!(error = %err, "Could not seed voice catalog");
        }

        let sessions = SessionManager::new(
            store.clone(),
            config.generation_quota,
            config.session_ttl_seconds,
        );
        let generator = GenerationOrchestrator::new(
            store.clone(),
            sessions.clone(),
            synthesizer,
            audio_storage,
            config.max_text_length,
            config.synthesis_timeout_seconds,
        );

        Arc::new(Self {
            config,
            store,
            sessions,
            generator,
        })
    }
}
