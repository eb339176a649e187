// Core types for the study system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tip shown on every card before the first translation round
pub const TIP_PLACEHOLDER: &str = "Translation learning tips will appear here.";

/// Tip shown when no generative-language API key is configured
pub const MISSING_KEY_TIP: &str = "Gemini API Key를 입력하면 AI 팁을 볼 수 있습니다.";

/// Target language of a translation card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ja,
    Zh,
}

impl Language {
    /// All target languages in card order
    pub const ALL: [Language; 3] = [Language::En, Language::Ja, Language::Zh];

    /// UI-facing code, also used as JSON key
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
        }
    }

    /// Code understood by the translation endpoint
    pub fn api_code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh-CN",
        }
    }

    /// Locale tag passed to speech synthesis
    pub fn speech_locale(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Ja => "ja-JP",
            Language::Zh => "zh-CN",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Zh => "Chinese",
        }
    }

    /// Card badge text, written in the language itself
    pub fn badge(&self) -> &'static str {
        match self {
            Language::En => "ENGLISH",
            Language::Ja => "日本語",
            Language::Zh => "中文",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ja" | "japanese" => Ok(Language::Ja),
            "zh" | "zh-cn" | "chinese" => Ok(Language::Zh),
            other => Err(format!("unknown language '{}' (expected en, ja or zh)", other)),
        }
    }
}

/// One value per target language, serialized as `{ "en": .., "ja": .., "zh": .. }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct PerLanguage<T> {
    pub en: T,
    pub ja: T,
    pub zh: T,
}

impl<T> PerLanguage<T> {
    /// Build a set by computing each language's value
    pub fn from_fn(mut f: impl FnMut(Language) -> T) -> Self {
        Self {
            en: f(Language::En),
            ja: f(Language::Ja),
            zh: f(Language::Zh),
        }
    }

    pub fn get(&self, lang: Language) -> &T {
        match lang {
            Language::En => &self.en,
            Language::Ja => &self.ja,
            Language::Zh => &self.zh,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &T)> {
        Language::ALL.into_iter().map(move |lang| (lang, self.get(lang)))
    }
}

impl<T: Clone> PerLanguage<T> {
    /// Same value for every language
    pub fn filled(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

/// Learning tip for one card: a single note or a short list of notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tip {
    Single(String),
    List(Vec<String>),
}

impl Tip {
    pub fn is_empty(&self) -> bool {
        match self {
            Tip::Single(text) => text.trim().is_empty(),
            Tip::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }
}

impl Default for Tip {
    fn default() -> Self {
        Tip::List(Vec::new())
    }
}

/// Translated text per language
pub type TranslationSet = PerLanguage<String>;

/// Learning tips per language
pub type TipSet = PerLanguage<Tip>;

/// Pronunciation guide per language (IPA, Hiragana, Pinyin)
pub type PronunciationSet = PerLanguage<String>;

/// Structured output of the tip generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningNotes {
    #[serde(default)]
    pub tips: TipSet,
    #[serde(default)]
    pub pronunciations: PronunciationSet,
}

/// Everything shown on screen, persisted between runs
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub input_text: String,
    pub translations: TranslationSet,
    pub learning_tips: TipSet,
    pub pronunciations: PronunciationSet,
}

impl SessionState {
    pub fn default_tips() -> TipSet {
        TipSet::filled(Tip::Single(TIP_PLACEHOLDER.to_string()))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            input_text: String::new(),
            translations: TranslationSet::default(),
            learning_tips: Self::default_tips(),
            pronunciations: PronunciationSet::default(),
        }
    }
}
