// Tip generator - learning tips and pronunciation guides from a generative-language model

use super::types::{LearningNotes, TranslationSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Model that turns a prompt into free-form text
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(&self, prompt: &str) -> Result<String, TipError>;
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TipError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TipError::Network(e.to_string()))?;

        Ok(Self::with_client(client, endpoint, model, api_key))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_content(&self, prompt: &str) -> Result<String, TipError> {
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        debug!(model = %self.model, "requesting learning notes");
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.endpoint, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| TipError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), %body, "generative API error");
            return Err(TipError::from_status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TipError::MalformedResponse(e.without_url().to_string()))?;

        body.first_text()
            .ok_or_else(|| TipError::MalformedResponse("no candidate text".to_string()))
    }
}

/// Bounded retry for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Asks the model for tips and pronunciations of a translated sentence
pub struct TipGenerator {
    backend: Arc<dyn GenerativeBackend>,
    retry: RetryPolicy,
}

impl TipGenerator {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn GenerativeBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub async fn generate(
        &self,
        original: &str,
        translations: &TranslationSet,
    ) -> Result<LearningNotes, TipError> {
        let prompt = build_prompt(original, translations);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.backend.generate_content(&prompt).await {
                Ok(text) => return parse_model_output(&text),
                Err(TipError::RateLimited) if attempt < max_attempts => {
                    warn!(attempt, backoff_ms = self.retry.backoff.as_millis() as u64, "rate limited, retrying");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Prompt asking for strict JSON with `tips` and `pronunciations`
pub fn build_prompt(original: &str, translations: &TranslationSet) -> String {
    format!(
        r#"You are a language tutor. Provide a helpful learning tip AND a pronunciation guide for each of the following translations of the Korean sentence: "{}".

Translations:
1. English: "{}"
2. Japanese: "{}"
3. Chinese: "{}"

Requirements for Pronunciation Guides:
1. English (en): Provide the IPA (International Phonetic Alphabet) pronunciation guide.
2. Japanese (ja): Provide the full Hiragana (ひらがな) transcription for the entire sentence, including any Kanji.
3. Chinese (zh): Provide the Pinyin (한어병음) with tone marks.

Important: Provide all learning tips in Korean (한국어로 작성).
Return the response in strictly valid JSON format with keys "tips" and "pronunciations".
Each of those should have sub-keys "en", "ja", "zh".
Inside "tips", each value should be an array of 2-3 short strings in Korean.
Inside "pronunciations", each value should be a single string (the guide).

Example Format:
{{
  "tips": {{ "en": ["...", "..."], "ja": [...], "zh": [...] }},
  "pronunciations": {{ "en": "/.../", "ja": "...", "zh": "..." }}
}}
Do not use Markdown code blocks. Just raw JSON."#,
        original, translations.en, translations.ja, translations.zh
    )
}

/// Parse model output, tolerating ```json fences around the object
pub fn parse_model_output(text: &str) -> Result<LearningNotes, TipError> {
    let json = text.replace("```json", "").replace("```", "");
    serde_json::from_str(json.trim()).map_err(|e| TipError::InvalidOutput(e.to_string()))
}

/// Tip failures; the display text is what the user sees on every card
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TipError {
    #[error("모델을 찾을 수 없습니다.")]
    ModelNotFound,

    #[error("요청 한도가 초과되었습니다. (잠시 후 다시 시도해주세요)")]
    RateLimited,

    #[error("API 키가 유효하지 않거나 권한이 없습니다.")]
    InvalidKey,

    #[error("API 오류 ({0})")]
    Api(u16),

    #[error("네트워크 오류: {0}")]
    Network(String),

    #[error("응답 형식 오류: {0}")]
    MalformedResponse(String),

    #[error("응답을 해석할 수 없습니다: {0}")]
    InvalidOutput(String),
}

impl TipError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => TipError::ModelNotFound,
            429 => TipError::RateLimited,
            400 | 403 => TipError::InvalidKey,
            other => TipError::Api(other),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::study::mock_http::{MockServer, local_client};
    use crate::study::types::Tip;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const NOTES_JSON: &str = r#"{
        "tips": { "en": ["'Hello' is informal"], "ja": ["です is polite", "は marks topic"], "zh": "你好 is standard" },
        "pronunciations": { "en": "/həˈloʊ/", "ja": "こんにちは", "zh": "nǐ hǎo" }
    }"#;

    /// Backend replaying scripted responses in order
    pub(crate) struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<String, TipError>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn new(responses: Vec<Result<String, TipError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate_content(&self, _prompt: &str) -> Result<String, TipError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TipError::Api(500)))
        }
    }

    fn translations() -> TranslationSet {
        TranslationSet {
            en: "Hello".to_string(),
            ja: "こんにちは".to_string(),
            zh: "你好".to_string(),
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(TipError::from_status(404), TipError::ModelNotFound);
        assert_eq!(TipError::from_status(429), TipError::RateLimited);
        assert_eq!(TipError::from_status(400), TipError::InvalidKey);
        assert_eq!(TipError::from_status(403), TipError::InvalidKey);
        assert_eq!(TipError::from_status(500).to_string(), "API 오류 (500)");
    }

    #[test]
    fn test_fenced_output_parses_like_raw() {
        let raw = parse_model_output(NOTES_JSON).unwrap();
        let fenced = parse_model_output(&format!("```json\n{}\n```", NOTES_JSON)).unwrap();
        assert_eq!(raw, fenced);
        assert_eq!(raw.pronunciations.zh, "nǐ hǎo");
        assert_eq!(raw.tips.zh, Tip::Single("你好 is standard".to_string()));
        assert_eq!(raw.tips.ja, Tip::List(vec!["です is polite".to_string(), "は marks topic".to_string()]));
    }

    #[test]
    fn test_unparsable_output() {
        let result = parse_model_output("Sure! Here are your tips.");
        assert!(matches!(result, Err(TipError::InvalidOutput(_))));
    }

    #[test]
    fn test_prompt_mentions_sentence_and_translations() {
        let prompt = build_prompt("안녕하세요", &translations());
        assert!(prompt.contains("\"안녕하세요\""));
        assert!(prompt.contains("English: \"Hello\""));
        assert!(prompt.contains("Chinese: \"你好\""));
        assert!(prompt.contains("\"pronunciations\""));
    }

    #[test]
    fn test_candidate_text_extraction() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{}"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.first_text().as_deref(), Some("{}"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(empty.first_text().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_once() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(TipError::RateLimited),
            Ok(NOTES_JSON.to_string()),
        ]));
        let generator = TipGenerator::new(backend.clone());

        let started = tokio::time::Instant::now();
        let notes = generator.generate("안녕하세요", &translations()).await.unwrap();

        assert_eq!(backend.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(notes.pronunciations.en, "/həˈloʊ/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_second_attempt() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(TipError::RateLimited),
            Err(TipError::RateLimited),
            Ok(NOTES_JSON.to_string()),
        ]));
        let generator = TipGenerator::new(backend.clone());

        let result = generator.generate("안녕하세요", &translations()).await;
        assert_eq!(result, Err(TipError::RateLimited));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(TipError::InvalidKey)]));
        let generator = TipGenerator::new(backend.clone());

        let result = generator.generate("안녕하세요", &translations()).await;
        assert_eq!(result, Err(TipError::InvalidKey));
        assert_eq!(backend.calls(), 1);
    }

    fn candidate_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        })
        .to_string()
    }

    fn gemini(server: &MockServer) -> Arc<GeminiClient> {
        Arc::new(GeminiClient::with_client(local_client(), &server.base_url, "gemini-2.0-flash", "test-key"))
    }

    #[tokio::test]
    async fn test_gemini_request_shape() {
        let server = MockServer::start(vec![(200, candidate_body(NOTES_JSON))]).await;
        let generator = TipGenerator::new(gemini(&server));

        let notes = generator.generate("안녕하세요", &translations()).await.unwrap();
        assert_eq!(notes.pronunciations.ja, "こんにちは");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/models/gemini-2.0-flash:generateContent?key=test-key");

        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("안녕하세요"));
    }

    #[tokio::test]
    async fn test_gemini_forbidden_is_invalid_key() {
        let server = MockServer::start(vec![(403, r#"{"error":{"code":403}}"#.to_string())]).await;
        let generator = TipGenerator::new(gemini(&server));

        let err = generator.generate("안녕하세요", &translations()).await.unwrap_err();
        assert_eq!(err, TipError::InvalidKey);
        assert_eq!(err.to_string(), "API 키가 유효하지 않거나 권한이 없습니다.");
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_gemini_too_many_requests_retried() {
        let server = MockServer::start(vec![
            (429, r#"{"error":{"code":429}}"#.to_string()),
            (200, candidate_body(NOTES_JSON)),
        ])
        .await;
        let retry = RetryPolicy { max_attempts: 2, backoff: Duration::from_millis(10) };
        let generator = TipGenerator::with_retry(gemini(&server), retry);

        let notes = generator.generate("안녕하세요", &translations()).await.unwrap();

        assert_eq!(notes.pronunciations.zh, "nǐ hǎo");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_gemini_unknown_model() {
        let server = MockServer::start(vec![(404, "{}".to_string())]).await;
        let result = gemini(&server).generate_content("prompt").await;
        assert_eq!(result, Err(TipError::ModelNotFound));
    }

    #[tokio::test]
    async fn test_gemini_server_error_keeps_key_out_of_message() {
        let server = MockServer::start(vec![(503, "{}".to_string())]).await;
        let err = gemini(&server).generate_content("prompt").await.unwrap_err();
        assert_eq!(err, TipError::Api(503));
        assert!(!err.to_string().contains("test-key"));
    }
}
