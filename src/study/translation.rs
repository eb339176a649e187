// Translator - fetches the three target-language translations of a sentence

use super::types::{Language, TranslationSet};
use async_trait::async_trait;
use futures_util::future::try_join3;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Source of single-language translations
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate Korean `text` into `target`
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError>;
}

/// Client for the MyMemory `/get` endpoint
pub struct MyMemoryClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MyMemoryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::NetworkError(e.to_string()))?;

        Ok(Self::with_client(client, endpoint))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: Option<ResponseData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    translated_text: Option<String>,
}

#[async_trait]
impl TranslationBackend for MyMemoryClient {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        let langpair = format!("ko|{}", target.api_code());
        debug!(%langpair, "requesting translation");

        let response = self
            .client
            .get(format!("{}/get", self.endpoint))
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslationError::ApiError(format!(
                "{} returned {}",
                langpair,
                response.status()
            )));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::ParseError(e.to_string()))?;

        body.response_data
            .and_then(|data| data.translated_text)
            .ok_or_else(|| TranslationError::ParseError(format!("{}: missing responseData.translatedText", langpair)))
    }
}

/// Fans a sentence out to every target language
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Translate into all targets concurrently. Either every language
    /// succeeds or the whole batch fails.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn translate_all(&self, text: &str) -> Result<TranslationSet, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let (en, ja, zh) = try_join3(
            self.backend.translate(text, Language::En),
            self.backend.translate(text, Language::Ja),
            self.backend.translate(text, Language::Zh),
        )
        .await?;

        Ok(TranslationSet { en, ja, zh })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
