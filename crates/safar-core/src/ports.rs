//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `safar-core` (pure Rust).
//! Implementations live in `safar-platform` (HTTP adapters, system clock).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use safar_types::{message::Message, tool::ToolDefinition, Result};

// ─── LLM Port ────────────────────────────────────────────────

/// Request to send to an LLM
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Complete (non-streaming) response from an LLM
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Non-streaming chat completion
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse>;
}

// ─── Embedding Port ──────────────────────────────────────────

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| safar_types::AgentError::Embedding("empty embedding batch".to_string()))
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Clock Port ──────────────────────────────────────────────

/// Wall clock in the service's local (Iran) time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> chrono::NaiveDate {
        self.now().date()
    }
}

/// A clock pinned to one instant, for deterministic refunds and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
