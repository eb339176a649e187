// Study session - owns the on-screen state and drives one translation round at a time

use super::config::{ConfigError, StudyConfig};
use super::session::{FileStore, SessionError, SessionStore};
use super::speech::{CommandSynthesizer, SpeechError, SpeechSynthesizer};
use super::tips::{GeminiClient, RetryPolicy, TipError, TipGenerator};
use super::translation::{MyMemoryClient, TranslationError, Translator};
use super::types::{Language, MISSING_KEY_TIP, SessionState, Tip, TipSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Shown when a translation round fails
pub const TRANSLATION_FAILED_NOTICE: &str = "Translation failed. Please try again.";

/// What the session is busy with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Translating,
    GeneratingTips,
}

/// Result of a translate request
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateOutcome {
    /// Input was blank; nothing was requested
    Skipped,
    Translated { tips: TipOutcome },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TipOutcome {
    Generated,
    /// The error message was written to every card
    Failed(TipError),
    /// No API key; the placeholder tip was written
    Disabled,
}

/// Single owner of session state and collaborators. Opened from the
/// store, closed back into it. Status changes are published on a watch
/// channel so a renderer can follow a round while `translate` holds the
/// session.
pub struct StudySession {
    state: SessionState,
    store: SessionStore,
    translator: Translator,
    tips: Option<TipGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    status: watch::Sender<SessionStatus>,
    notice: Option<String>,
}

impl StudySession {
    /// Rehydrate a session from `store`
    pub fn open(
        store: SessionStore,
        translator: Translator,
        tips: Option<TipGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let state = store.load();
        let (status, _) = watch::channel(SessionStatus::Idle);
        info!(has_input = !state.input_text.is_empty(), tips = tips.is_some(), "session opened");

        Self {
            state,
            store,
            translator,
            tips,
            speech,
            status,
            notice: None,
        }
    }

    /// Session backed by the configured file, MyMemory, Gemini and the TTS command
    pub fn from_config(config: &StudyConfig) -> Result<Self, StudyError> {
        let store = SessionStore::new(Box::new(FileStore::open(&config.session_path)));
        let translator = Translator::new(Arc::new(MyMemoryClient::new(
            &config.translation_endpoint,
            config.request_timeout(),
        )?));
        let tips = match config.api_key() {
            Some(key) => Some(tip_generator(config, key)?),
            None => None,
        };
        let speech: Arc<dyn SpeechSynthesizer> = match &config.speech_command {
            Some(command) => Arc::new(CommandSynthesizer::from_command(command)?),
            None => Arc::new(CommandSynthesizer::platform_default()),
        };

        Ok(Self::open(store, translator, tips, speech))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receiver that sees every status change, including those made while
    /// a round is in flight
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.status() != SessionStatus::Idle
    }

    /// Last user-facing notice, if the previous round left one
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn tips_enabled(&self) -> bool {
        self.tips.is_some()
    }

    pub fn set_input(&mut self, text: impl Into<String>) -> Result<(), StudyError> {
        self.state.input_text = text.into();
        self.persist()
    }

    /// Runtime key entry; a blank key disables tips
    pub fn set_api_key(&mut self, config: &StudyConfig, key: &str) -> Result<(), StudyError> {
        let key = key.trim();
        self.tips = if key.is_empty() {
            None
        } else {
            Some(tip_generator(config, key)?)
        };
        Ok(())
    }

    /// Translate the current input, then fetch tips for the result.
    /// A failed translation leaves the state untouched.
    pub async fn translate(&mut self) -> Result<TranslateOutcome, StudyError> {
        let text = self.state.input_text.clone();
        if text.trim().is_empty() {
            return Ok(TranslateOutcome::Skipped);
        }

        self.status.send_replace(SessionStatus::Translating);
        self.notice = None;

        let result = self.run_round(&text).await;

        self.status.send_replace(SessionStatus::Idle);
        result
    }

    async fn run_round(&mut self, text: &str) -> Result<TranslateOutcome, StudyError> {
        let translations = match self.translator.translate_all(text).await {
            Ok(translations) => translations,
            Err(e) => {
                warn!(error = %e, "translation failed");
                self.notice = Some(TRANSLATION_FAILED_NOTICE.to_string());
                return Err(StudyError::Translation(e));
            }
        };

        self.state.translations = translations;
        info!("translations committed");
        self.persist()?;

        let tips = match &self.tips {
            Some(generator) => {
                self.status.send_replace(SessionStatus::GeneratingTips);
                match generator.generate(text, &self.state.translations).await {
                    Ok(notes) => {
                        self.state.learning_tips = notes.tips;
                        self.state.pronunciations = notes.pronunciations;
                        info!("learning notes committed");
                        TipOutcome::Generated
                    }
                    Err(e) => {
                        warn!(error = %e, "tip generation failed");
                        self.state.learning_tips = TipSet::filled(Tip::List(vec![e.to_string()]));
                        TipOutcome::Failed(e)
                    }
                }
            }
            None => {
                self.state.learning_tips = TipSet::filled(Tip::Single(MISSING_KEY_TIP.to_string()));
                TipOutcome::Disabled
            }
        };

        self.persist()?;
        Ok(TranslateOutcome::Translated { tips })
    }

    /// Play the translation for `lang`; nothing happens while it is empty
    pub fn speak(&self, lang: Language) -> Result<(), StudyError> {
        self.speech
            .speak(self.state.translations.get(lang), lang.speech_locale())
            .map_err(StudyError::from)
    }

    /// Persist and end the session
    pub fn close(mut self) -> Result<SessionState, StudyError> {
        self.persist()?;
        Ok(self.state)
    }

    fn persist(&mut self) -> Result<(), StudyError> {
        self.store.save(&self.state).map_err(StudyError::from)
    }
}

fn tip_generator(config: &StudyConfig, key: &str) -> Result<TipGenerator, StudyError> {
    let client = GeminiClient::new(
        &config.generative_endpoint,
        &config.model,
        key,
        config.request_timeout(),
    )?;
    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        backoff: config.retry_backoff(),
    };
    Ok(TipGenerator::with_retry(Arc::new(client), retry))
}

#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Tip error: {0}")]
    Tips(#[from] TipError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
