// Study system - translation, learning tips, session persistence and playback

pub mod config;
pub mod controller;
#[cfg(test)]
pub(crate) mod mock_http;
pub mod render;
pub mod session;
pub mod speech;
pub mod tips;
pub mod translation;
pub mod types;

pub use config::StudyConfig;
pub use controller::{StudyError, StudySession, SessionStatus, TranslateOutcome};
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionStore};
pub use speech::{CommandSynthesizer, SpeechSynthesizer};
pub use tips::{GeminiClient, GenerativeBackend, RetryPolicy, TipGenerator};
pub use translation::{MyMemoryClient, TranslationBackend, Translator};
pub use types::*;
