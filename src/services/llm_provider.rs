use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

/// Which wire protocol the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMBackend {
    /// OpenAI-compatible `/chat/completions` (cloud APIs).
    OpenAi,
    /// Ollama `/api/generate` (local models).
    Ollama,
}

impl LLMBackend {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" | "local" => Self::Ollama,
            _ => Self::OpenAi,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub backend: LLMBackend,
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        let backend = env_string("LLM_BACKEND")
            .map(|v| LLMBackend::parse(&v))
            .unwrap_or(LLMBackend::OpenAi);
        let api_key = env_string("LLM_API_KEY");
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));

        let (model, api_endpoint) = match backend {
            LLMBackend::OpenAi => (
                env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                normalize_endpoint(
                    env_string("LLM_API_ENDPOINT")
                        .or_else(|| env_string("LLM_BASE_URL"))
                        .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
                ),
            ),
            LLMBackend::Ollama => (
                env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                env_string("OLLAMA_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            ),
        };

        Self::new(LLMConfig {
            backend,
            api_key,
            model,
            api_endpoint,
            timeout,
        })
    }

    pub fn backend(&self) -> LLMBackend {
        self.config.backend
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn is_available(&self) -> bool {
        let has_key = match self.config.backend {
            LLMBackend::OpenAi => self
                .config
                .api_key
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty()),
            LLMBackend::Ollama => true,
        };
        has_key && !self.config.model.trim().is_empty() && !self.config.api_endpoint.trim().is_empty()
    }

    /// Single-turn completion. `json_mode` asks the backend for a JSON body
    /// where it supports that natively.
    pub async fn complete(
        &self,
        system: Option<&str>,
        prompt: &str,
        json_mode: bool,
    ) -> Result<String, LLMError> {
        match self.config.backend {
            LLMBackend::OpenAi => {
                let mut messages = Vec::with_capacity(2);
                if let Some(system) = system {
                    messages.push(ChatMessage { role: "system".into(), content: system.into() });
                }
                messages.push(ChatMessage { role: "user".into(), content: prompt.into() });
                let response = self.chat(&messages, json_mode).await?;
                response
                    .first_content()
                    .map(|s| s.trim().to_string())
                    .ok_or(LLMError::EmptyChoices)
            }
            LLMBackend::Ollama => {
                let full_prompt = match system {
                    Some(system) => format!("{system}\n\n{prompt}"),
                    None => prompt.to_string(),
                };
                self.generate(&full_prompt, json_mode).await
            }
        }
    }

    pub async fn chat(&self, messages: &[ChatMessage], json_mode: bool) -> Result<ChatResponse, LLMError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });
        if json_mode {
            payload["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let bytes = self.post_with_retry(&url, Some(api_key), &payload).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn generate(&self, prompt: &str, json_mode: bool) -> Result<String, LLMError> {
        let url = format!("{}/api/generate", self.config.api_endpoint);
        let mut payload = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false
        });
        if json_mode {
            payload["format"] = serde_json::json!("json");
        }

        let bytes = self.post_with_retry(&url, None, &payload).await?;
        let response: GenerateResponse = serde_json::from_slice(&bytes)?;
        let text = response.response.trim();
        if text.is_empty() {
            return Err(LLMError::EmptyChoices);
        }
        Ok(text.to_string())
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<bytes::Bytes, LLMError> {
        let mut last_error: Option<LLMError> = None;

        for retry in 0..=MAX_RETRIES {
            let mut request = self.client.post(url).json(payload);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.bytes().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LLMError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("unknown")))
    }
}

/// Drops markdown code fences models like to wrap JSON in.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn normalizes_endpoint() {
        assert_eq!(normalize_endpoint("https://x.ai/".into()), "https://x.ai/v1");
        assert_eq!(normalize_endpoint("https://x.ai/v1".into()), "https://x.ai/v1");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(reqwest::StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn ollama_needs_no_key() {
        let provider = LLMProvider::new(LLMConfig {
            backend: LLMBackend::Ollama,
            api_key: None,
            model: "llama3".into(),
            api_endpoint: DEFAULT_OLLAMA_URL.into(),
            timeout: Duration::from_secs(1),
        });
        assert!(provider.is_available());

        let cloud = LLMProvider::new(LLMConfig {
            backend: LLMBackend::OpenAi,
            api_key: Some("  ".into()),
            model: "gpt".into(),
            api_endpoint: DEFAULT_API_ENDPOINT.into(),
            timeout: Duration::from_secs(1),
        });
        assert!(!cloud.is_available());
    }

    #[test]
    fn backend_parse() {
        assert_eq!(LLMBackend::parse("Ollama"), LLMBackend::Ollama);
        assert_eq!(LLMBackend::parse("openai"), LLMBackend::OpenAi);
    }
}
