//! LLM API Providers
//!
//! Concrete clients for OpenAI-compatible endpoints (OpenAI, vLLM, Ollama in
//! OpenAI mode) and Anthropic, each with blocking and SSE-streaming calls.

use super::LanguageModel;
use crate::error::{ConfigError, LlmError};
use crate::{Message, Role};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// Configuration
// ============================================================================

/// LLM configuration loaded from environment or built explicitly
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Local,
}

impl LlmConfig {
    /// Load from environment variables, trying OpenAI, Anthropic, then a local server.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let mut config = Self::openai(
                &key,
                &std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            );
            config.base_url = std::env::var("OPENAI_BASE_URL").ok();
            return Ok(config);
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            let mut config = Self::anthropic(
                &key,
                &std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
            );
            config.base_url = std::env::var("ANTHROPIC_BASE_URL").ok();
            return Ok(config);
        }

        if let Ok(url) = std::env::var("LOCAL_LLM_URL") {
            return Ok(Self::local(
                &url,
                &std::env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| "default".to_string()),
            ));
        }

        Err(ConfigError::NoProviderConfigured)
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenAI,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn anthropic(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
            temperature: Some(0.0),
            max_tokens: Some(2048),
        }
    }

    pub fn local(url: &str, model: &str) -> Self {
        Self {
            provider: Provider::Local,
            api_key: String::new(),
            model: model.to_string(),
            base_url: Some(url.to_string()),
            timeout_secs: 120,
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    fn http_client(&self) -> Result<Client, LlmError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))
    }
}

// ============================================================================
// Shared HTTP helpers
// ============================================================================

/// Splits an SSE byte stream into `data:` payloads. Lines may straddle chunks.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }

        payloads
    }
}

async fn check_status(response: Response) -> Result<Response, LlmError> {
    if response.status() == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(LlmError::RateLimited {
            retry_after_ms: retry_after * 1000,
        });
    }

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(LlmError::Api(format!("{status}: {error_text}")));
    }

    Ok(response)
}

fn openai_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content
            })
        })
        .collect()
}

// ============================================================================
// OpenAI-compatible Provider
// ============================================================================

/// Chat-completions client for OpenAI and OpenAI-compatible local servers
#[cfg(feature = "openai")]
pub struct OpenAIClient {
    client: Client,
    config: LlmConfig,
}

#[cfg(feature = "openai")]
impl OpenAIClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        let base = match (self.config.provider, self.config.base_url.as_deref()) {
            (Provider::Local, Some(base)) => format!("{}/v1", base.trim_end_matches('/')),
            (_, Some(base)) => base.trim_end_matches('/').to_string(),
            (_, None) => DEFAULT_OPENAI_BASE_URL.to_string(),
        };
        format!("{base}/chat/completions")
    }

    fn body(&self, messages: &[Message], stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": openai_messages(messages),
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = self.config.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }

    async fn send(&self, body: &serde_json::Value) -> Result<Response, LlmError> {
        let mut request = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .json(body);
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        check_status(response).await
    }
}

#[cfg(feature = "openai")]
#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self.send(&self.body(messages, false)).await?;
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
    }

    async fn stream(&self, messages: &[Message], tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        let mut response = self.send(&self.body(messages, true)).await?;
        let mut decoder = SseDecoder::default();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?
        {
            for payload in decoder.push(&chunk) {
                if payload == "[DONE]" {
                    return Ok(());
                }
                let data: serde_json::Value = serde_json::from_str(&payload)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                if let Some(fragment) = data["choices"][0]["delta"]["content"].as_str() {
                    if !fragment.is_empty() && tx.send(fragment.to_string()).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("openai({})", self.config.model)
    }
}

// ============================================================================
// Anthropic Provider
// ============================================================================

#[cfg(feature = "anthropic")]
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

#[cfg(feature = "anthropic")]
impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn body(&self, messages: &[Message], stream: bool) -> serde_json::Value {
        // Anthropic takes the system prompt out of band.
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": turns,
            "max_tokens": self.config.max_tokens.unwrap_or(2048),
        });
        if !system.is_empty() {
            body["system"] = serde_json::json!(system);
        }
        if let Some(temp) = self.config.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if stream {
            body["stream"] = serde_json::json!(true);
        }
        body
    }

    async fn send(&self, body: &serde_json::Value) -> Result<Response, LlmError> {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL)
            .trim_end_matches('/');

        let response = self
            .client
            .post(format!("{base}/v1/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        check_status(response).await
    }
}

#[cfg(feature = "anthropic")]
#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self.send(&self.body(messages, false)).await?;
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let blocks = data["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing content array".to_string()))?;
        Ok(blocks
            .iter()
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .concat())
    }

    async fn stream(&self, messages: &[Message], tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        let mut response = self.send(&self.body(messages, true)).await?;
        let mut decoder = SseDecoder::default();

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?
        {
            for payload in decoder.push(&chunk) {
                let data: serde_json::Value = serde_json::from_str(&payload)
                    .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                match data["type"].as_str() {
                    Some("content_block_delta") => {
                        if let Some(fragment) = data["delta"]["text"].as_str() {
                            if tx.send(fragment.to_string()).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Some("message_stop") => return Ok(()),
                    Some("error") => {
                        return Err(LlmError::Api(
                            data["error"]["message"].as_str().unwrap_or("stream error").to_string(),
                        ))
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("anthropic({})", self.config.model)
    }
}

// ============================================================================
// Unified Client
// ============================================================================

/// Dispatches to the configured provider
pub enum UnifiedClient {
    #[cfg(feature = "openai")]
    OpenAI(OpenAIClient),
    #[cfg(feature = "anthropic")]
    Anthropic(AnthropicClient),
}

impl UnifiedClient {
    pub fn from_config(config: LlmConfig) -> Result<Self, ConfigError> {
        let invalid = |e: LlmError| ConfigError::Invalid(e.to_string());
        match config.provider {
            #[cfg(feature = "openai")]
            Provider::OpenAI | Provider::Local => {
                Ok(Self::OpenAI(OpenAIClient::new(config).map_err(invalid)?))
            }
            #[cfg(feature = "anthropic")]
            Provider::Anthropic => Ok(Self::Anthropic(AnthropicClient::new(config).map_err(invalid)?)),
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::Invalid(format!(
                "provider {other:?} is not compiled in"
            ))),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(LlmConfig::from_env()?)
    }
}

#[async_trait]
impl LanguageModel for UnifiedClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self {
            #[cfg(feature = "openai")]
            Self::OpenAI(c) => c.complete(messages).await,
            #[cfg(feature = "anthropic")]
            Self::Anthropic(c) => c.complete(messages).await,
        }
    }

    async fn stream(&self, messages: &[Message], tx: mpsc::Sender<String>) -> Result<(), LlmError> {
        match self {
            #[cfg(feature = "openai")]
            Self::OpenAI(c) => c.stream(messages, tx).await,
            #[cfg(feature = "anthropic")]
            Self::Anthropic(c) => c.stream(messages, tx).await,
        }
    }

    fn name(&self) -> String {
        match self {
            #[cfg(feature = "openai")]
            Self::OpenAI(c) => c.name(),
            #[cfg(feature = "anthropic")]
            Self::Anthropic(c) => c.name(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LlmConfig::openai("test-key", "gpt-4o");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, Some(0.0));
    }

    #[test]
    fn test_sse_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: x\ndata: {\"a\"").is_empty());
        let payloads = decoder.push(b":1}\r\n\ndata: [DONE]\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "[DONE]".to_string()]);
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_local_url_gets_v1_prefix() {
        let client = OpenAIClient::new(LlmConfig::local("http://127.0.0.1:11434/", "llama3")).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:11434/v1/chat/completions");

        let client = OpenAIClient::new(LlmConfig::openai("k", "m")).unwrap();
        assert_eq!(client.url(), "https://api.openai.com/v1/chat/completions");
    }

    #[cfg(feature = "anthropic")]
    #[test]
    fn test_anthropic_body_moves_system_out_of_band() {
        let client = AnthropicClient::new(LlmConfig::anthropic("k", "claude")).unwrap();
        let body = client.body(
            &[Message::system("rules"), Message::user("q")],
            false,
        );
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
