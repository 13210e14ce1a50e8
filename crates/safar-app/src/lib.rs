//! Composition root: wires the platform adapters into the core services.

pub mod cli;
pub mod config;

use std::sync::Arc;

use safar_core::embedding::HashingEmbedder;
use safar_core::ports::{Clock, EmbeddingPort, LlmPort};
use safar_core::{ConversationManager, EventBus, PolicyStore, TicketStore, ToolRegistry};
use safar_platform::{read_policy_document, OpenAiCompatEmbeddings, OpenAiCompatProvider, SystemClock};
use safar_types::config::AgentConfig;
use safar_types::Result;

/// Everything one running agent needs.
pub struct AppContext {
    pub config: AgentConfig,
    pub manager: ConversationManager,
}

impl AppContext {
    /// Build the real adapters from `config` and load the policy document.
    pub async fn bootstrap(config: AgentConfig) -> Result<Self> {
        let llm: Arc<dyn LlmPort> = Arc::new(OpenAiCompatProvider::new(config.llm.clone())?);
        let embedder = embedder_for(&config)?;
        let document = read_policy_document(&config.policy.path);
        Self::assemble(config, llm, embedder, Arc::new(SystemClock), document.as_deref()).await
    }

    /// Wire the services around the given ports.
    pub async fn assemble(
        config: AgentConfig,
        llm: Arc<dyn LlmPort>,
        embedder: Arc<dyn EmbeddingPort>,
        clock: Arc<dyn Clock>,
        policy_document: Option<&str>,
    ) -> Result<Self> {
        let policy = PolicyStore::new(embedder, config.policy.effective_top_k());
        let state = policy.load(policy_document).await;
        log::info!(
            "Policy store {:?} with {} passages",
            state,
            policy.passage_count()
        );

        let tools = ToolRegistry::new(Arc::new(TicketStore::new()), Arc::new(policy), clock)
            .with_refund_table(config.refund.clone());
        let manager = ConversationManager::new(llm, tools, config.clone(), EventBus::new());

        Ok(Self { config, manager })
    }
}

fn embedder_for(config: &AgentConfig) -> Result<Arc<dyn EmbeddingPort>> {
    match config.llm.embedding_model.as_deref().map(str::trim) {
        Some(model) if !model.is_empty() => {
            log::info!("Using remote embedding model {}", model);
            Ok(Arc::new(OpenAiCompatEmbeddings::new(&config.llm, model)?))
        }
        _ => Ok(Arc::new(HashingEmbedder::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use safar_core::policy::PolicyState;
    use safar_core::ports::{ChatRequest, ChatResponse, FixedClock};
    use safar_types::message::Message;

    struct Echo;

    #[async_trait]
    impl LlmPort for Echo {
        async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse> {
            let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                message: Message::assistant(format!("echo: {last}")),
                usage: None,
            })
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(10, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn assemble_loads_policy_and_answers() {
        let ctx = AppContext::assemble(
            AgentConfig::default(),
            Arc::new(Echo),
            Arc::new(HashingEmbedder::default()),
            clock(),
            Some("Refunds follow the table.\n\nBaggage: 20 kg."),
        )
        .await
        .unwrap();

        let mut session = safar_types::session::Session::new();
        let reply = ctx.manager.handle(&mut session, "hello").await;
        assert_eq!(reply.text, "echo: hello");
        assert!(ctx.manager.tools().tickets().is_empty());
        assert_eq!(ctx.manager.tools().definitions().len(), 5);
    }

    #[tokio::test]
    async fn missing_policy_document_still_starts() {
        let ctx = AppContext::assemble(
            AgentConfig::default(),
            Arc::new(Echo),
            Arc::new(HashingEmbedder::default()),
            clock(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(ctx.config.agent.effective_bound(), 5);
    }

    #[tokio::test]
    async fn policy_store_state_after_load() {
        let store = PolicyStore::new(Arc::new(HashingEmbedder::default()), 2);
        assert_eq!(store.load(Some("   ")).await, PolicyState::Empty);
    }

    #[test]
    fn hashing_embedder_without_model() {
        let config = AgentConfig::default();
        assert_eq!(embedder_for(&config).unwrap().backend_name(), "hashing");

        let mut remote = AgentConfig::default();
        remote.llm.embedding_model = Some("text-embedding-3-small".to_string());
        assert_eq!(embedder_for(&remote).unwrap().backend_name(), "openai-compatible");
    }
}
