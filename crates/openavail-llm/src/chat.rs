//! OpenAI-compatible `/v1/chat/completions` client.

use std::time::Duration;

use serde_json::json;

use crate::retry::with_retry;
use crate::{ChatMessage, LlmError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TEMPERATURE: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    timeout: Duration,
}

pub struct ChatClientBuilder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    timeout: Option<Duration>,
}

impl ChatClientBuilder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: None,
            timeout: None,
        }
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ChatClient {
        ChatClient {
            client: reqwest::Client::new(),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl ChatClient {
    pub fn builder(base_url: impl Into<String>, model: impl Into<String>) -> ChatClientBuilder {
        ChatClientBuilder::new(base_url, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat exchange and return the assistant's text. Transient
    /// failures are retried up to three times with doubling backoff.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        with_retry("chat", || self.chat_once(messages)).await
    }

    /// Convenience: a single user prompt, no system message.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    async fn chat_once(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let mut req = self.client.post(&url).json(&payload).timeout(self.timeout);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(LlmError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &self.model));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))
    }
}
