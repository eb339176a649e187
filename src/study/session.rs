// Session store - persists the last session in a small key-value store

use super::types::{PronunciationSet, SessionState, TipSet, TranslationSet};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const INPUT_TEXT_KEY: &str = "inputText";
pub const TRANSLATIONS_KEY: &str = "translations";
pub const LEARNING_TIPS_KEY: &str = "learningTips";
pub const PRONUNCIATIONS_KEY: &str = "pronunciations";

/// String key-value storage
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    /// Write every entry in one step
    fn set_all(&mut self, entries: Vec<(&str, String)>) -> Result<(), SessionError>;
}

/// In-memory store, lost when dropped
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_all(&mut self, entries: Vec<(&str, String)>) -> Result<(), SessionError> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// JSON object of string values in a single file, replaced atomically on write
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store; a missing, unreadable or corrupt file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "session file corrupt, starting fresh");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "session file unreadable, starting fresh");
                BTreeMap::new()
            }
        };

        Self { path, values }
    }

    fn write_to_disk(&self) -> Result<(), SessionError> {
        let parent_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir).map_err(|e| SessionError::Io(e.to_string()))?;

        let temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| SessionError::Io(e.to_string()))?;
        {
            let mut writer = BufWriter::new(&temp_file);
            serde_json::to_writer_pretty(&mut writer, &self.values)
                .map_err(|e| SessionError::Serialization(e.to_string()))?;
            writer.flush().map_err(|e| SessionError::Io(e.to_string()))?;
        }

        temp_file
            .persist(&self.path)
            .map_err(|e| SessionError::Io(e.to_string()))?;
        debug!(path = %self.path.display(), "session written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_all(&mut self, entries: Vec<(&str, String)>) -> Result<(), SessionError> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value);
        }
        self.write_to_disk()
    }
}

/// Maps `SessionState` onto the four storage keys
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read each key independently, substituting defaults
    pub fn load(&self) -> SessionState {
        let defaults = SessionState::default();

        SessionState {
            input_text: self.store.get(INPUT_TEXT_KEY).unwrap_or(defaults.input_text),
            translations: self
                .load_json::<TranslationSet>(TRANSLATIONS_KEY)
                .unwrap_or(defaults.translations),
            learning_tips: self
                .load_json::<TipSet>(LEARNING_TIPS_KEY)
                .unwrap_or(defaults.learning_tips),
            pronunciations: self
                .load_json::<PronunciationSet>(PRONUNCIATIONS_KEY)
                .unwrap_or(defaults.pronunciations),
        }
    }

    /// Write all four keys
    pub fn save(&mut self, state: &SessionState) -> Result<(), SessionError> {
        let entries = vec![
            (INPUT_TEXT_KEY, state.input_text.clone()),
            (TRANSLATIONS_KEY, to_json(&state.translations)?),
            (LEARNING_TIPS_KEY, to_json(&state.learning_tips)?),
            (PRONUNCIATIONS_KEY, to_json(&state.pronunciations)?),
        ];
        self.store.set_all(entries)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored value unparsable, using default");
                None
            }
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::Serialization(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
