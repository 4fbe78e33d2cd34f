//! HTTP grading client
//!
//! Sends one challenge/answer pair to a hosted model and turns the reply into
//! a [`ScoreVerdict`]. Anthropic and OpenAI-compatible endpoints differ only
//! in headers, where the system prompt goes, and where the reply text sits.

use reqwest::Client;
use serde_json::{json, Value};

use super::parser::{grading_request, parse_verdict, ScoreVerdict, SCORE_SYSTEM_PROMPT};
use crate::core::error::{ChronicleError, Result};

/// Verdicts are one short JSON object
const MAX_TOKENS: u32 = 256;

const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Wire dialect of the grading endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerEndpoint {
    Anthropic,
    OpenAiCompatible,
}

impl ScorerEndpoint {
    pub fn for_url(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ScorerEndpoint::Anthropic
        } else {
            ScorerEndpoint::OpenAiCompatible
        }
    }

    /// Request body asking `model` to grade one answer
    pub fn grading_body(self, model: &str, challenge: &str, answer: &str) -> Value {
        let user = grading_request(challenge, answer);
        match self {
            ScorerEndpoint::Anthropic => json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "temperature": 0,
                "system": SCORE_SYSTEM_PROMPT,
                "messages": [{ "role": "user", "content": user }],
            }),
            ScorerEndpoint::OpenAiCompatible => json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "temperature": 0,
                "messages": [
                    { "role": "system", "content": SCORE_SYSTEM_PROMPT },
                    { "role": "user", "content": user },
                ],
            }),
        }
    }

    /// Text of the model's reply, if the body has one
    pub fn reply_text(self, body: &Value) -> Option<&str> {
        let pointer = match self {
            ScorerEndpoint::Anthropic => "/content/0/text",
            ScorerEndpoint::OpenAiCompatible => "/choices/0/message/content",
        };
        body.pointer(pointer).and_then(Value::as_str)
    }
}

/// Grades answers against a hosted model
#[derive(Debug, Clone)]
pub struct GradingClient {
    http: Client,
    endpoint: ScorerEndpoint,
    api_key: String,
    api_url: String,
    model: String,
}

impl GradingClient {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>, model: impl Into<String>) -> Self {
        let api_url = api_url.into();
        Self {
            http: Client::new(),
            endpoint: ScorerEndpoint::for_url(&api_url),
            api_key: api_key.into(),
            api_url,
            model: model.into(),
        }
    }

    /// Reads LLM_API_KEY (required), LLM_API_URL and LLM_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ChronicleError::ScorerError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_URL.into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Ok(Self::new(api_key, api_url, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> ScorerEndpoint {
        self.endpoint
    }

    /// Ask the model to grade `answer` and parse its verdict
    pub async fn grade(&self, challenge: &str, answer: &str) -> Result<ScoreVerdict> {
        let body = self.endpoint.grading_body(&self.model, challenge, answer);
        let request = self.http.post(&self.api_url).json(&body);
        let request = match self.endpoint {
            ScorerEndpoint::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ScorerEndpoint::OpenAiCompatible => request.bearer_auth(&self.api_key),
        };

        let response = request
            .send()
            .await
            .map_err(|e| ChronicleError::ScorerError(format!("grading request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChronicleError::ScorerError(format!(
                "grading endpoint returned {}: {}",
                status, detail
            )));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ChronicleError::ScorerError(format!("unreadable grading reply: {}", e)))?;
        let text = self
            .endpoint
            .reply_text(&reply)
            .ok_or_else(|| ChronicleError::ScorerError("grading reply had no text".into()))?;
        parse_verdict(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_detected_from_url() {
        assert_eq!(ScorerEndpoint::for_url(DEFAULT_URL), ScorerEndpoint::Anthropic);
        assert_eq!(
            ScorerEndpoint::for_url("https://api.deepseek.com/chat/completions"),
            ScorerEndpoint::OpenAiCompatible
        );
        let client = GradingClient::new("k", "http://localhost:8080/v1", "m");
        assert_eq!(client.endpoint(), ScorerEndpoint::OpenAiCompatible);
        assert_eq!(client.model(), "m");
    }

    #[test]
    fn test_anthropic_body_carries_top_level_system() {
        let body = ScorerEndpoint::Anthropic.grading_body("haiku", "Define validity", "Truth preserving");
        assert_eq!(body["system"], SCORE_SYSTEM_PROMPT);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
        let user = body["messages"][0]["content"].as_str().unwrap();
        assert!(user.contains("Define validity"));
        assert!(user.contains("Truth preserving"));
    }

    #[test]
    fn test_openai_body_puts_system_first() {
        let body = ScorerEndpoint::OpenAiCompatible.grading_body("gpt", "c", "a");
        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[test]
    fn test_reply_text_per_endpoint() {
        let anthropic = json!({ "content": [{ "type": "text", "text": "{\"score\": 90}" }] });
        let openai = json!({ "choices": [{ "message": { "content": "{\"score\": 40}" } }] });
        assert_eq!(ScorerEndpoint::Anthropic.reply_text(&anthropic), Some("{\"score\": 90}"));
        assert_eq!(ScorerEndpoint::OpenAiCompatible.reply_text(&openai), Some("{\"score\": 40}"));
        assert_eq!(ScorerEndpoint::Anthropic.reply_text(&openai), None);
    }
}
