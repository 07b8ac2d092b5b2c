//! Model client abstraction.
//!
//! One trait, one real backend (local Ollama over blocking HTTP), and a
//! scripted client for exercising the categorization loop in tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Default generation model
pub const DEFAULT_MODEL: &str = "gemma3:12b";

/// Prefix artifact some instruction-tuned models prepend to their output
const RESPONSE_PREFIX: &str = "Response:";

/// LLM configuration (the `llm` section of config.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether the AI strategy is used at all; `false` selects keyword rules
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Ollama base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Generation model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Free RAM the model needs before a run is allowed to start
    #[serde(default = "default_min_ram_gb")]
    pub min_ram_gb: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_OLLAMA_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_min_ram_gb() -> u64 {
    9
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout(),
            min_ram_gb: default_min_ram_gb(),
        }
    }
}

/// Model call errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("invalid response payload: {0}")]
    InvalidPayload(String),

    #[error("model returned no usable text")]
    EmptyResponse,
}

/// Single-shot text completion boundary.
pub trait ModelClient {
    /// Generate a completion for `prompt`. The returned text is trimmed and
    /// stripped of known prefix artifacts; an empty result is an error.
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Request for POST /api/generate
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response from /api/generate (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama client over blocking HTTP.
pub struct OllamaClient {
    endpoint: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    /// Model this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ModelClient for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LlmError::Http(format!("HTTP {} from Ollama", response.status())));
        }

        let payload: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::InvalidPayload(e.to_string()))?;

        let text = clean_response(&payload.response);
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }
}

/// Trim the raw completion and strip the `Response:` prefix artifact.
pub fn clean_response(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(RESPONSE_PREFIX)
        .map(str::trim)
        .unwrap_or(trimmed)
        .to_string()
}

/// Scripted model client for tests: returns pre-programmed replies in order.
///
/// Once the script is exhausted every further call fails with
/// `EmptyResponse`.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    call_count: Mutex<usize>,
}

impl ScriptedModelClient {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            call_count: Mutex::new(0),
        }
    }

    /// Convenience constructor from plain reply strings.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl ModelClient for ScriptedModelClient {
    fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        *self.call_count.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert!(config.enabled);
        assert_eq!(config.endpoint, DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.min_ram_gb, 9);
    }

    #[test]
    fn test_clean_response_strips_prefix() {
        assert_eq!(clean_response("Response: Work"), "Work");
        assert_eq!(clean_response("  Work  "), "Work");
        assert_eq!(clean_response("Response:"), "");
    }

    #[test]
    fn test_clean_response_leaves_inner_text() {
        assert_eq!(clean_response("Work Response: x"), "Work Response: x");
    }

    #[test]
    fn test_scripted_client_plays_replies_in_order() {
        let client = ScriptedModelClient::replies(&["TOOL:GET_CATEGORIES", "Work"]);
        assert_eq!(client.generate("p").unwrap(), "TOOL:GET_CATEGORIES");
        assert_eq!(client.generate("p").unwrap(), "Work");
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_scripted_client_exhausted_is_empty_response() {
        let client = ScriptedModelClient::replies(&[]);
        assert!(matches!(client.generate("p"), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_scripted_client_error_reply() {
        let client = ScriptedModelClient::new(vec![Err(LlmError::Timeout(5))]);
        assert!(matches!(client.generate("p"), Err(LlmError::Timeout(5))));
        assert_eq!(client.call_count(), 1);
    }
}
