//! OpenAI-compatible `/embeddings` adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use safar_core::ports::EmbeddingPort;
use safar_types::{config::LlmConfig, AgentError, Result};

use crate::llm::openai_compat::{http_client, status_error, transport_error};

pub struct OpenAiCompatEmbeddings {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiCompatEmbeddings {
    pub fn new(config: &LlmConfig, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key: config.api_key.clone(),
            base_url: config.base_url().to_string(),
            model: model.into(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Vectors in input order; the API may return them shuffled.
fn into_ordered(mut response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(AgentError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }
    response.data.sort_by_key(|item| item.index);
    Ok(response.data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl EmbeddingPort for OpenAiCompatEmbeddings {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Embedding(e.to_string()))?;
        into_ordered(body, texts.len())
    }

    fn backend_name(&self) -> &str {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorders_by_index() {
        let raw = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0]},
            {"index": 0, "embedding": [1.0, 0.0]}
        ]}"#;
        let body: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        let vectors = into_ordered(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let body: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(into_ordered(body, 1), Err(AgentError::Embedding(_))));
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let embedder = OpenAiCompatEmbeddings::new(&LlmConfig::default(), "text-embedding-3-small").unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }
}
