//! OpenAI-compatible `/v1/embeddings` client.

use std::time::Duration;

use serde_json::json;

use crate::retry::with_retry;
use crate::LlmError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct EmbeddingsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl EmbeddingsClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts; result order matches input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        with_retry("embeddings", || self.embed_once(texts)).await
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let payload = json!({
            "model": self.model,
            "input": texts,
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

        let data = body["data"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing data array".into()))?;

        // The endpoint may reorder entries; restore input order by index.
        let mut out: Vec<Vec<f32>> = vec![vec![]; texts.len()];
        for entry in data {
            let idx = entry["index"].as_u64().unwrap_or(0) as usize;
            let vector: Vec<f32> = entry["embedding"]
                .as_array()
                .ok_or_else(|| LlmError::InvalidResponse("missing embedding".into()))?
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            if idx < out.len() {
                out[idx] = vector;
            }
        }
        if out.iter().any(|v| v.is_empty()) {
            return Err(LlmError::InvalidResponse(
                "embedding count does not match input".into(),
            ));
        }
        Ok(out)
    }
}
