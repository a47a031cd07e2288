//! OpenAI-compatible chat-completions client
//!
//! Speaks the `/chat/completions` dialect shared by OpenAI, DeepSeek,
//! vLLM and Ollama's `/v1` endpoint. One request per `invoke`; no retries.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::{Completion, LlmClient, Result, TokenUsage};

/// Default endpoint when none is configured
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when none is configured
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL up to and including the API version segment (e.g. `.../v1`)
    pub base_url: String,
    /// Bearer token; optional for local backends
    pub api_key: Option<String>,
    /// Model used for any role without an override
    pub model: String,
    /// Provider label recorded in experiment logs
    pub provider: String,
    /// Per-role model overrides (`coder` -> `qwen2.5-coder:14b`)
    pub role_models: BTreeMap<String, String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request timeout enforced by the HTTP client
    pub timeout_secs: u64,
    /// Ask a local Ollama server to unload the model after each call
    pub unload_after_call: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            provider: "openai".to_string(),
            role_models: BTreeMap::new(),
            temperature: 0.2,
            max_tokens: 4096,
            timeout_secs: 300,
            unload_after_call: false,
        }
    }
}

impl LlmConfig {
    /// Build a config from `SKILLFORGE_LLM_*` environment variables.
    ///
    /// `SKILLFORGE_LLM_ROLE_MODELS` takes `role=model` pairs separated by commas.
    pub fn from_env() -> Self {
        let mut config = LlmConfig::default();
        if let Ok(url) = std::env::var("SKILLFORGE_LLM_BASE_URL") {
            config.base_url = url;
        }
        config.api_key = std::env::var("SKILLFORGE_LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(model) = std::env::var("SKILLFORGE_LLM_MODEL") {
            config.model = model;
        }
        if let Ok(provider) = std::env::var("SKILLFORGE_LLM_PROVIDER") {
            config.provider = provider;
        }
        if let Ok(pairs) = std::env::var("SKILLFORGE_LLM_ROLE_MODELS") {
            config.role_models = parse_role_models(&pairs);
        }
        if let Some(t) = env_parse::<f32>("SKILLFORGE_LLM_TEMPERATURE") {
            config.temperature = t;
        }
        if let Some(n) = env_parse::<u32>("SKILLFORGE_LLM_MAX_TOKENS") {
            config.max_tokens = n;
        }
        if let Some(secs) = env_parse::<u64>("SKILLFORGE_LLM_TIMEOUT_SECS") {
            config.timeout_secs = secs;
        }
        if let Some(flag) = env_parse::<bool>("SKILLFORGE_LLM_UNLOAD") {
            config.unload_after_call = flag;
        }
        config
    }

    /// Config for a local Ollama server.
    pub fn ollama(model: &str) -> Self {
        LlmConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            model: model.to_string(),
            provider: "ollama".to_string(),
            unload_after_call: true,
            ..Default::default()
        }
    }

    /// Model configured for `role`.
    pub fn model_for(&self, role: &str) -> &str {
        self.role_models
            .get(role)
            .map(String::as_str)
            .unwrap_or(&self.model)
    }

    fn requires_api_key(&self) -> bool {
        !matches!(self.provider.as_str(), "ollama" | "vllm" | "local")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_role_models(pairs: &str) -> BTreeMap<String, String> {
    pairs
        .split(',')
        .filter_map(|pair| {
            let (role, model) = pair.split_once('=')?;
            let (role, model) = (role.trim(), model.trim());
            (!role.is_empty() && !model.is_empty()).then(|| (role.to_string(), model.to_string()))
        })
        .collect()
}

/// Chat-completions client
pub struct OpenAiCompatClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::Config("base_url must not be empty".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("skillforge-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(OpenAiCompatClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LlmConfig::from_env())
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Server origin for Ollama's native API (base URL without `/v1`).
    fn native_origin(&self) -> &str {
        let base = self.config.base_url.trim_end_matches('/');
        base.strip_suffix("/v1").unwrap_or(base)
    }

    fn build_request_body(&self, role: &str, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model_for(role),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": false,
            "messages": [
                { "role": "system", "content": system_message(role) },
                { "role": "user", "content": prompt },
            ],
        })
    }
}

fn system_message(role: &str) -> String {
    format!(
        "You are the `{role}` model of an automated code-synthesis pipeline. \
         Reply with exactly one complete Python module."
    )
}

/// Extract text and usage from a chat-completions response body.
///
/// Accepts both plain-string `content` and the array-of-parts form.
pub fn parse_completion(body: &serde_json::Value) -> Result<Completion> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::Decode("missing choices[0].message".to_string()))?;

    let text = match message.get("content") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    };
    if text.trim().is_empty() {
        return Err(LlmError::EmptyCompletion);
    }

    let usage = body.get("usage").map(|u| TokenUsage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
    });

    Ok(Completion { text, usage })
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn invoke(&self, role: &str, prompt: &str) -> Result<Completion> {
        if self.config.requires_api_key() && self.config.api_key.is_none() {
            return Err(LlmError::MissingApiKey(self.config.provider.clone()));
        }

        let model = self.config.model_for(role);
        info!(role = %role, model = %model, prompt_len = prompt.len(), "invoking LLM");

        let mut request = self
            .http_client
            .post(self.completions_url())
            .json(&self.build_request_body(role, prompt));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        let completion = parse_completion(&body)?;
        debug!(
            completion_len = completion.text.len(),
            usage = ?completion.usage,
            "LLM completion received"
        );
        Ok(completion)
    }

    fn model_name(&self, role: &str) -> String {
        self.config.model_for(role).to_string()
    }

    fn provider(&self) -> String {
        self.config.provider.clone()
    }

    async fn release_resources(&self, role: &str) -> bool {
        if !self.config.unload_after_call {
            return false;
        }

        let url = format!("{}/api/generate", self.native_origin());
        let body = serde_json::json!({ "model": self.config.model_for(role), "keep_alive": 0 });
        match self.http_client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(model = %self.config.model_for(role), "local model unloaded");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "model unload request rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "model unload request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_content_and_usage() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "```python\nimport random\n```" } }],
            "usage": { "prompt_tokens": 812, "completion_tokens": 340, "total_tokens": 1152 }
        });
        let c = parse_completion(&body).unwrap();
        assert!(c.text.starts_with("```python"));
        assert_eq!(
            c.usage,
            Some(TokenUsage {
                prompt_tokens: 812,
                completion_tokens: 340
            })
        );
    }

    #[test]
    fn parses_array_content_without_usage() {
        let body = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "import math\n" },
                { "type": "text", "text": "def generate(level=1):\n    pass\n" }
            ] } }]
        });
        let c = parse_completion(&body).unwrap();
        assert_eq!(c.text, "import math\ndef generate(level=1):\n    pass\n");
        assert!(c.usage.is_none());
    }

    #[test]
    fn empty_or_missing_content_is_an_error() {
        let empty = json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(matches!(parse_completion(&empty), Err(LlmError::EmptyCompletion)));

        let missing = json!({ "error": { "message": "quota exceeded" } });
        assert!(matches!(parse_completion(&missing), Err(LlmError::Decode(_))));
    }

    #[test]
    fn role_overrides_select_model() {
        let mut config = LlmConfig::default();
        config.role_models = parse_role_models("coder=qwen2.5-coder:14b, architect = gpt-4o ,bad");
        assert_eq!(config.model_for("coder"), "qwen2.5-coder:14b");
        assert_eq!(config.model_for("architect"), "gpt-4o");
        assert_eq!(config.model_for("reviewer"), DEFAULT_MODEL);
        assert_eq!(config.role_models.len(), 2);
    }

    #[test]
    fn ollama_origin_strips_version_segment() {
        let client = OpenAiCompatClient::new(LlmConfig::ollama("qwen2.5-coder:7b")).unwrap();
        assert_eq!(client.native_origin(), "http://localhost:11434");
        assert_eq!(
            client.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let client = OpenAiCompatClient::new(LlmConfig::default()).unwrap();
        let err = client.invoke("coder", "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }

    #[test]
    fn request_body_carries_role_model_and_prompt() {
        let mut config = LlmConfig::ollama("base-model");
        config.role_models.insert("coder".to_string(), "coder-model".to_string());
        let client = OpenAiCompatClient::new(config).unwrap();
        let body = client.build_request_body("coder", "write it");
        assert_eq!(body["model"], "coder-model");
        assert_eq!(body["messages"][1]["content"], "write it");
        assert_eq!(body["stream"], false);
    }
}
