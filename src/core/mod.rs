pub mod catalog;
pub mod generation;
pub mod session;
pub mod synth;

pub use catalog::{Gender, VoiceProfile, default_voice_profiles, seed_voice_profiles};
pub use generation::{GenerationOrchestrator, GenerationOutcome, GenerationRecord, GenerationStatus};
pub use session::{Session, SessionManager, SessionStatus};
pub use synth::{
    GOOGLE_TTS_URL, GoogleSynthesizer, SynthesisError, SynthesisRequest, SynthesizedAudio,
    Synthesizer, create_synthesizer,
};
