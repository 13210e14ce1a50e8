#[cfg(test)]
mod tests {
    use crate::embedding::HashingEmbedder;
    use crate::event_bus::EventBus;
    use crate::policy::{PolicyAnswer, PolicyState, PolicyStore};
    use crate::ports::*;
    use crate::runtime::*;
    use crate::tickets::TicketStore;
    use crate::tools::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use safar_types::config::AgentConfig;
    use safar_types::event::AgentEvent;
    use safar_types::message::*;
    use safar_types::session::Session;
    use safar_types::ticket::{TicketId, TicketStatus};
    use safar_types::tool::*;
    use safar_types::AgentError;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const POLICY: &str = "\
Refunds: cancelling 72 hours or more before departure refunds 90% of the fare.

Baggage: each passenger may carry 20 kg of checked baggage and one 7 kg cabin bag.

Changes: a travel date can be changed once, up to 24 hours before departure.";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    async fn ready_policy() -> Arc<PolicyStore> {
        let store = PolicyStore::new(Arc::new(HashingEmbedder::default()), 2);
        store.load(Some(POLICY)).await;
        Arc::new(store)
    }

    fn empty_policy() -> Arc<PolicyStore> {
        Arc::new(PolicyStore::new(Arc::new(HashingEmbedder::default()), 2))
    }

    fn registry_with(policy: Arc<PolicyStore>) -> ToolRegistry {
        ToolRegistry::new(Arc::new(TicketStore::new()), policy, Arc::new(FixedClock(now())))
    }

    fn book_args(origin: &str, destination: &str, date: &str) -> String {
        serde_json::json!({
            "origin_city": origin,
            "destination_city": destination,
            "travel_date": date,
            "passenger_name": "Ali Rezaei",
            "national_id": "0012345678",
        })
        .to_string()
    }

    fn observation(msg: &Message) -> Value {
        serde_json::from_str(&msg.content).unwrap()
    }

    // ─── Mock ports ──────────────────────────────────────────

    /// Replays scripted replies, then answers "done" forever.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<safar_types::Result<Message>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<safar_types::Result<Message>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, i: usize) -> ChatRequest {
            self.requests.lock().unwrap()[i].clone()
        }
    }

    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn chat_completion(&self, req: ChatRequest) -> safar_types::Result<ChatResponse> {
            self.requests.lock().unwrap().push(req);
            let next = self.replies.lock().unwrap().pop_front();
            let message = next.unwrap_or_else(|| Ok(Message::assistant("done")))?;
            Ok(ChatResponse {
                message,
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            })
        }
    }

    /// Requests a tool on every call, never answers.
    struct AlwaysToolLlm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmPort for AlwaysToolLlm {
        async fn chat_completion(&self, _req: ChatRequest) -> safar_types::Result<ChatResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                message: tool_reply(&format!("call_{}", n), LOOKUP_TICKET, r#"{"ticket_id":"SF-XXXX-000000"}"#),
                usage: None,
            })
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmPort for SlowLlm {
        async fn chat_completion(&self, _req: ChatRequest) -> safar_types::Result<ChatResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ChatResponse {
                message: Message::assistant("too late"),
                usage: None,
            })
        }
    }

    /// Embeds the first batch, fails every later call.
    struct FlakyEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingPort for FlakyEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> safar_types::Result<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.embed_batch(texts).await
            } else {
                Err(AgentError::Embedding("backend down".to_string()))
            }
        }

        fn backend_name(&self) -> &str {
            "flaky"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingPort for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[&str]) -> safar_types::Result<Vec<Vec<f32>>> {
            Err(AgentError::Network("connection refused".to_string()))
        }

        fn backend_name(&self) -> &str {
            "failing"
        }
    }

    fn tool_reply(id: &str, name: &str, args: &str) -> Message {
        Message::assistant_tool_calls("", vec![ToolCallRequest::new(id, name, args)])
    }

    fn manager(llm: Arc<dyn LlmPort>, registry: ToolRegistry) -> ConversationManager {
        ConversationManager::new(llm, registry, AgentConfig::default(), EventBus::new())
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        assert!(!bus.has_pending());
        bus.emit(AgentEvent::TurnStart { turn_id: 1, session_id: "s".to_string() });
        bus.emit(AgentEvent::LlmComplete { text: "hello".to_string() });
        assert!(bus.has_pending());
        assert_eq!(bus.drain().len(), 2);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(AgentEvent::TurnEnd { turn_id: 1 });
        assert!(bus2.has_pending());
        assert_eq!(bus2.drain().len(), 1);
        assert!(!bus1.has_pending());
    }

    #[test]
    fn test_event_bus_drops_oldest_past_capacity() {
        let bus = EventBus::with_capacity(3);
        for i in 0..5 {
            bus.emit(AgentEvent::TurnEnd { turn_id: i });
        }
        let events = bus.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], AgentEvent::TurnEnd { turn_id: 2 });
    }

    // ─── ToolRegistry Tests ──────────────────────────────────

    #[test]
    fn test_registry_definitions_are_valid_json() {
        let registry = registry_with(empty_policy());
        let defs = registry.definitions();
        assert_eq!(defs.len(), 5);
        for tool in &defs {
            let json = serde_json::to_value(tool).unwrap();
            assert_eq!(json["parameters"]["type"], "object");
        }
        assert!(registry.get(QUERY_POLICY).is_some());
        assert!(registry.get("bash").is_none());
    }

    #[tokio::test]
    async fn test_book_ticket_success() {
        let registry = registry_with(empty_policy());
        let out = registry
            .execute(BOOK_TICKET, &book_args("Tehran", "شیراز", "2026-10-23"))
            .await
            .unwrap();

        let id = out.data["ticket_id"].as_str().unwrap().to_string();
        assert!(id.starts_with("SF-TESH-"));
        assert!(out.message.contains(&id));
        assert_eq!(out.data["status"], "booked");
        assert_eq!(out.data["price_irr"], 1_500_000);

        let stored = registry.tickets().get(&TicketId::parse(&id)).unwrap();
        assert_eq!(stored.status, TicketStatus::Booked);
    }

    #[tokio::test]
    async fn test_book_outside_city_set_creates_nothing() {
        let registry = registry_with(empty_policy());
        let err = registry
            .execute(BOOK_TICKET, &book_args("Tehran", "Dubai", "2026-10-23"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidCity);

        let err = registry
            .execute(BOOK_TICKET, &book_args("Paris", "Shiraz", "2026-10-23"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidCity);
        assert!(registry.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_book_rejects_bad_inputs() {
        let registry = registry_with(empty_policy());
        for args in [
            book_args("Tehran", "tehran", "2026-10-23"),
            book_args("Tehran", "Shiraz", "2026-10-19"),
            book_args("Tehran", "Shiraz", "23 October"),
            book_args("Tehran", "Shiraz", "1405/08/01"),
        ] {
            let err = registry.execute(BOOK_TICKET, &args).await.unwrap_err();
            assert_eq!(err.kind, ToolErrorKind::InvalidInput, "{}", args);
        }

        let bad_id = serde_json::json!({
            "origin_city": "Tehran",
            "destination_city": "Shiraz",
            "travel_date": "2026-10-23",
            "passenger_name": "Ali Rezaei",
            "national_id": "12345",
        });
        let err = registry.execute(BOOK_TICKET, &bad_id.to_string()).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidInput);
        assert!(registry.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_not_found() {
        let registry = registry_with(empty_policy());
        let out = registry
            .execute(BOOK_TICKET, &book_args("Tehran", "Shiraz", "2026-10-25"))
            .await
            .unwrap();
        let id = out.data["ticket_id"].as_str().unwrap().to_string();
        let args = serde_json::json!({ "ticket_id": id.to_lowercase() }).to_string();

        let cancelled = registry.execute(CANCEL_TICKET, &args).await.unwrap();
        // departs 2026-10-25 08:00, now is 2026-10-19 10:00: 142h ahead
        assert_eq!(cancelled.data["refund"]["refund_percent"], 90);
        assert_eq!(cancelled.data["refund"]["refund_amount_irr"], 1_350_000);
        assert_eq!(cancelled.data["ticket"]["status"], "cancelled");

        let err = registry.execute(CANCEL_TICKET, &args).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::TicketNotFound);
        let stored = registry.tickets().get(&TicketId::parse(&id)).unwrap();
        assert_eq!(stored.status, TicketStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_lookup_unknown_ticket() {
        let registry = registry_with(empty_policy());
        let err = registry
            .execute(LOOKUP_TICKET, r#"{"ticket_id":"ABC123"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::TicketNotFound);
        assert!(err.message.contains("ABC123"));
    }

    #[tokio::test]
    async fn test_suggest_destination() {
        let registry = registry_with(empty_policy());
        let out = registry
            .execute(SUGGEST_DESTINATION, r#"{"preferences":"warm beach in winter"}"#)
            .await
            .unwrap();
        let picks = out.data["suggestions"].as_array().unwrap();
        assert!(!picks.is_empty() && picks.len() <= 3);
        assert_eq!(picks[0]["city_en"], "Kish");

        let none = registry
            .execute(SUGGEST_DESTINATION, r#"{"preferences":"xyz"}"#)
            .await
            .unwrap();
        assert!(none.data["suggestions"].as_array().unwrap().is_empty());
        assert!(none.message.contains("No catalog destination"));
    }

    #[tokio::test]
    async fn test_query_policy_unavailable_when_empty() {
        let policy = empty_policy();
        policy.load(Some("   \n\n ")).await;
        let registry = registry_with(policy);
        for question in ["refund rules?", "baggage", "قوانین استرداد"] {
            let err = registry
                .execute(QUERY_POLICY, &serde_json::json!({ "question": question }).to_string())
                .await
                .unwrap_err();
            assert_eq!(err.kind, ToolErrorKind::PolicyUnavailable);
        }
    }

    #[tokio::test]
    async fn test_query_policy_returns_passages() {
        let registry = registry_with(ready_policy().await);
        let out = registry
            .execute(QUERY_POLICY, r#"{"question":"how many kg of baggage can I carry?"}"#)
            .await
            .unwrap();
        let passages = out.data["passages"].as_array().unwrap();
        assert_eq!(passages.len(), 2);
        assert!(passages[0]["text"].as_str().unwrap().starts_with("Baggage"));
    }

    // ─── PolicyStore Tests ───────────────────────────────────

    #[tokio::test]
    async fn test_policy_lifecycle() {
        let store = PolicyStore::new(Arc::new(HashingEmbedder::default()), 2);
        assert_eq!(store.state(), PolicyState::Uninitialized);
        assert_eq!(store.query("refund").await, PolicyAnswer::Unavailable);

        assert_eq!(store.load(Some(POLICY)).await, PolicyState::Ready);
        assert_eq!(store.passage_count(), 3);

        // terminal: a second load is ignored
        assert_eq!(store.load(None).await, PolicyState::Ready);
        assert_eq!(store.passage_count(), 3);
    }

    #[tokio::test]
    async fn test_policy_missing_document_is_empty() {
        let store = PolicyStore::new(Arc::new(HashingEmbedder::default()), 2);
        assert_eq!(store.load(None).await, PolicyState::Empty);
        assert_eq!(store.query("refund").await, PolicyAnswer::Unavailable);
        assert_eq!(store.load(Some(POLICY)).await, PolicyState::Empty);
    }

    #[tokio::test]
    async fn test_policy_embedding_failure() {
        let store = PolicyStore::new(Arc::new(FailingEmbedder), 2);
        assert_eq!(store.load(Some(POLICY)).await, PolicyState::Empty);

        let flaky = PolicyStore::new(
            Arc::new(FlakyEmbedder {
                inner: HashingEmbedder::default(),
                calls: AtomicUsize::new(0),
            }),
            2,
        );
        assert_eq!(flaky.load(Some(POLICY)).await, PolicyState::Ready);
        assert_eq!(flaky.query("refund").await, PolicyAnswer::Unavailable);
    }

    #[tokio::test]
    async fn test_policy_top_k_and_ties() {
        assert_eq!(PolicyStore::new(Arc::new(HashingEmbedder::default()), 0).top_k(), 1);
        assert_eq!(PolicyStore::new(Arc::new(HashingEmbedder::default()), 10).top_k(), 3);

        let store = PolicyStore::new(Arc::new(HashingEmbedder::default()), 3);
        store
            .load(Some("Pets travel in carriers.\n\nPets travel in carriers.\n\nMeals are served."))
            .await;
        match store.query("pets").await {
            PolicyAnswer::Passages(matches) => {
                let order: Vec<usize> = matches.iter().map(|m| m.index).collect();
                assert_eq!(order, vec![0, 1, 2]);
                assert_eq!(matches[0].score, matches[1].score);
            }
            PolicyAnswer::Unavailable => panic!("store should be ready"),
        }
    }

    #[tokio::test]
    async fn test_policy_query_is_repeatable() {
        let store = ready_policy().await;
        for question in ["How much baggage can I bring?", "refund before departure", "بار مجاز"] {
            let first = store.query(question).await;
            let second = store.query(question).await;
            assert!(matches!(first, PolicyAnswer::Passages(ref m) if !m.is_empty()));
            assert_eq!(first, second);
        }

        let reloaded = ready_policy().await;
        assert_eq!(
            store.query("baggage allowance").await,
            reloaded.query("baggage allowance").await
        );
    }

    // ─── ConversationManager Tests ───────────────────────────

    #[tokio::test]
    async fn test_plain_answer() {
        let llm = ScriptedLlm::new(vec![Ok(Message::assistant("Hello! How can I help?"))]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "Hi there").await;
        assert_eq!(resp.outcome, TurnOutcome::Answered);
        assert_eq!(resp.text, "Hello! How can I help?");
        assert_eq!(resp.tool_calls, 0);
        assert_eq!(resp.round_trips, 1);

        // system prompt is sent but never stored
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[1].role, Role::Assistant);

        let req = llm.request(0);
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[0].content.contains("2026-10-19"));
        assert!(req.messages[0].content.contains("Respond in clear, friendly, professional English"));
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.tools.len(), 5);
    }

    #[tokio::test]
    async fn test_language_follows_user() {
        let llm = ScriptedLlm::new(vec![]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        mgr.handle(&mut session, "سلام، یک بلیط می‌خواهم").await;
        assert!(llm.request(0).messages[0].content.contains("Respond in Persian"));

        // digits only: language unchanged
        mgr.handle(&mut session, "0012345678").await;
        assert!(llm.request(1).messages[0].content.contains("Respond in Persian"));

        mgr.handle(&mut session, "Actually, let's speak English").await;
        assert!(llm.request(2).messages[0].content.contains("English"));
        assert!(!llm.request(2).messages[0].content.contains("Respond in Persian"));
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_reply("call_1", BOOK_TICKET, &book_args("Tehran", "Shiraz", "2026-10-23"))),
            Ok(Message::assistant("Your ticket is booked.")),
        ]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "Book Tehran to Shiraz").await;
        assert_eq!(resp.outcome, TurnOutcome::Answered);
        assert_eq!(resp.tool_calls, 1);
        assert_eq!(resp.round_trips, 2);

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert!(session.messages()[1].is_tool_call());
        assert_eq!(session.messages()[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(observation(&session.messages()[2])["status"], "success");
        assert_eq!(mgr.tools().tickets().len(), 1);

        // the second request carries the observation
        assert_eq!(llm.request(1).messages.last().unwrap().role, Role::Tool);

        let events = mgr.event_bus().drain();
        assert!(matches!(events.first(), Some(AgentEvent::TurnStart { turn_id: 1, .. })));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolExecStart { tool_name, .. } if tool_name == BOOK_TICKET)));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolExecEnd { success: true, .. })));
        assert!(matches!(events.last(), Some(AgentEvent::TurnEnd { turn_id: 1 })));
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_observation() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_reply("call_1", BOOK_TICKET, r#"{"origin_city":"Tehran""#)),
            Ok(tool_reply("call_2", "delete_everything", "{}")),
            Ok(Message::assistant("Could you give me the details again?")),
        ]);
        let mgr = manager(llm, registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "book something").await;
        assert_eq!(resp.outcome, TurnOutcome::Answered);
        assert!(mgr.tools().tickets().is_empty());

        let first = observation(&session.messages()[2]);
        assert_eq!(first["status"], "error");
        assert_eq!(first["kind"], "invalid_input");
        let second = observation(&session.messages()[4]);
        assert_eq!(second["kind"], "unknown_tool");
    }

    #[tokio::test]
    async fn test_only_first_of_several_calls_runs() {
        let reply = Message::assistant_tool_calls(
            "",
            vec![
                ToolCallRequest::new("a", BOOK_TICKET, book_args("Tehran", "Shiraz", "2026-10-23")),
                ToolCallRequest::new("b", BOOK_TICKET, book_args("Tehran", "Yazd", "2026-10-23")),
            ],
        );
        let llm = ScriptedLlm::new(vec![Ok(reply), Ok(Message::assistant("Booked one ticket."))]);
        let mgr = manager(llm, registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "book two").await;
        assert_eq!(resp.tool_calls, 1);
        assert_eq!(mgr.tools().tickets().len(), 1);

        let tool_msgs: Vec<&Message> = session.messages().iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_msgs.len(), 2);
        assert_eq!(tool_msgs[1].tool_call_id.as_deref(), Some("b"));
        assert_eq!(observation(tool_msgs[1])["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_bound_stops_endless_tool_requests() {
        let llm = Arc::new(AlwaysToolLlm { calls: AtomicUsize::new(0) });
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "keep looking it up").await;
        assert_eq!(resp.outcome, TurnOutcome::ExecutionBoundExceeded);
        assert_eq!(resp.text, BOUND_EN);
        assert_eq!(resp.round_trips, 5);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 5);
        assert_eq!(session.messages().last().unwrap().content, BOUND_EN);

        assert_eq!(
            resp.into_result(),
            Err(AgentError::ExecutionBoundExceeded { limit: 5 })
        );
    }

    #[tokio::test]
    async fn test_bound_is_configurable_and_at_least_one() {
        for (configured, expected) in [(2, 2), (0, 1)] {
            let llm = Arc::new(AlwaysToolLlm { calls: AtomicUsize::new(0) });
            let mut config = AgentConfig::default();
            config.agent.max_tool_iterations = configured;
            let mgr = ConversationManager::new(llm.clone(), registry_with(empty_policy()), config, EventBus::new());
            let mut session = Session::new();

            let resp = mgr.handle(&mut session, "سلام").await;
            assert_eq!(resp.outcome, TurnOutcome::ExecutionBoundExceeded);
            assert_eq!(resp.text, BOUND_FA);
            assert_eq!(llm.calls.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_retries_once_and_rolls_back() {
        let llm = ScriptedLlm::new(vec![
            Err(AgentError::Network("connection reset".to_string())),
            Err(AgentError::Network("connection reset".to_string())),
        ]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "بلیط تهران به شیراز").await;
        assert_eq!(resp.outcome, TurnOutcome::UpstreamUnavailable);
        assert_eq!(resp.text, UPSTREAM_FA);
        assert_eq!(llm.calls(), 2);
        assert!(session.is_empty());
        assert!(mgr
            .event_bus()
            .drain()
            .iter()
            .any(|e| matches!(e, AgentEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let llm = ScriptedLlm::new(vec![
            Err(AgentError::Timeout(30_000)),
            Ok(Message::assistant("Here you go.")),
        ]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "hello").await;
        assert_eq!(resp.outcome, TurnOutcome::Answered);
        assert_eq!(llm.calls(), 2);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let llm = ScriptedLlm::new(vec![Err(AgentError::Llm("HTTP 401: bad key".to_string()))]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();
        session.push(Message::user("earlier"));
        session.push(Message::assistant("earlier answer"));

        let resp = mgr.handle(&mut session, "hello").await;
        assert_eq!(resp.outcome, TurnOutcome::UpstreamUnavailable);
        assert_eq!(resp.text, UPSTREAM_EN);
        assert_eq!(llm.calls(), 1);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_mid_loop_keeps_completed_tool_steps() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_reply("call_1", LOOKUP_TICKET, r#"{"ticket_id":"ABC123"}"#)),
            Err(AgentError::Llm("HTTP 500".to_string())),
        ]);
        let mgr = manager(llm, registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "where is ABC123").await;
        assert_eq!(resp.outcome, TurnOutcome::UpstreamUnavailable);
        assert_eq!(resp.tool_calls, 1);

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(session.messages()[3].content, UPSTREAM_EN);
    }

    #[tokio::test]
    async fn test_booking_survives_follow_up_model_failure() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_reply("call_1", BOOK_TICKET, &book_args("Tehran", "Shiraz", "2026-10-23"))),
            Err(AgentError::Llm("HTTP 400: bad request".to_string())),
            Ok(Message::assistant("Your ticket is already booked.")),
        ]);
        let mgr = manager(llm.clone(), registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "Book Tehran to Shiraz").await;
        assert_eq!(resp.outcome, TurnOutcome::UpstreamUnavailable);
        assert_eq!(mgr.tools().tickets().len(), 1);
        let ticket_id = mgr.tools().tickets().list()[0].id.as_str().to_string();

        assert_eq!(session.len(), 4);
        assert!(session.messages()[1].is_tool_call());
        assert!(session.messages()[2].content.contains(&ticket_id));

        // the next turn still shows the model the completed booking
        let resp = mgr.handle(&mut session, "did it work?").await;
        assert_eq!(resp.outcome, TurnOutcome::Answered);
        assert_eq!(mgr.tools().tickets().len(), 1);
        let req = llm.request(2);
        assert!(req
            .messages
            .iter()
            .any(|m| m.role == Role::Tool && m.content.contains(&ticket_id)));
    }

    #[tokio::test]
    async fn test_empty_reply_after_tool_keeps_history() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_reply("call_1", CANCEL_TICKET, r#"{"ticket_id":"ABC123"}"#)),
            Ok(Message::assistant("")),
        ]);
        let mgr = manager(llm, registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "cancel ABC123").await;
        assert_eq!(resp.outcome, TurnOutcome::Unclear);
        assert_eq!(session.len(), 4);
        assert_eq!(session.messages().last().unwrap().content, UNCLEAR_EN);
    }

    #[tokio::test]
    async fn test_model_timeout() {
        let mut config = AgentConfig::default();
        config.llm.timeout_secs = 1;
        config.llm.max_retries = 0;
        let mgr = ConversationManager::new(Arc::new(SlowLlm), registry_with(empty_policy()), config, EventBus::new());
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "hello").await;
        assert_eq!(resp.outcome, TurnOutcome::UpstreamUnavailable);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_is_unclear() {
        let llm = ScriptedLlm::new(vec![Ok(Message::assistant("   "))]);
        let mgr = manager(llm, registry_with(empty_policy()));
        let mut session = Session::new();

        let resp = mgr.handle(&mut session, "hmm").await;
        assert_eq!(resp.outcome, TurnOutcome::Unclear);
        assert_eq!(resp.text, UNCLEAR_EN);
        assert!(session.is_empty());
        assert!(resp.into_result().is_err());
    }

    #[test]
    fn test_manager_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConversationManager>();
        assert_send_sync::<PolicyStore>();
        assert_send_sync::<TicketStore>();
    }
}
