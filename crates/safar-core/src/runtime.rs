//! Conversation manager: the bounded tool-calling loop.
//!
//! One user message drives a small state machine:
//! 1. `AwaitingModel`: send system prompt + history + tool schemas to the model
//! 2. `ToolPending`: the model asked for a tool; run it, append the observation
//!    and go back to 1
//! 3. `Answering`: the model answered in text; append it and finish
//! 4. `Done`: the turn ended, possibly with a fixed fallback message
//!
//! The number of model round-trips per message is bounded. Tool failures are
//! observations for the model; only model failures end a turn early.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use safar_types::{
    config::AgentConfig,
    event::AgentEvent,
    language::Language,
    message::{Message, ToolCallRequest},
    session::Session,
    tool::{ToolError, ToolResult},
    AgentError, Result,
};

use crate::event_bus::EventBus;
use crate::ports::{ChatRequest, LlmPort};
use crate::prompt::system_prompt;
use crate::tools::ToolRegistry;

pub(crate) const UPSTREAM_FA: &str =
    "متاسفانه در حال حاضر امکان برقراری ارتباط با سیستم وجود ندارد. لطفا کمی بعد دوباره تلاش کنید.";
pub(crate) const UPSTREAM_EN: &str =
    "Sorry, our service is temporarily unavailable. Please try again in a little while.";
pub(crate) const UNCLEAR_FA: &str = "متاسفانه نتوانستم درخواست شما را متوجه شوم. می‌توانید واضح‌تر توضیح دهید؟";
pub(crate) const UNCLEAR_EN: &str = "Sorry, I could not understand your request. Could you explain it more clearly?";
pub(crate) const BOUND_FA: &str =
    "متاسفانه پردازش درخواست شما به حداکثر مراحل داخلی رسید. لطفا درخواستتان را ساده‌تر بیان کنید.";
pub(crate) const BOUND_EN: &str =
    "Sorry, I reached the maximum number of internal steps. Could you please simplify your request?";

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final text answer.
    Answered,
    /// The round-trip bound tripped; a fixed apology was returned.
    ExecutionBoundExceeded,
    /// The model could not be reached; the turn was rolled back.
    UpstreamUnavailable,
    /// The model replied with neither text nor a tool call; rolled back.
    Unclear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub text: String,
    pub outcome: TurnOutcome,
    /// Tool calls dispatched this turn; skipped extra calls are not counted
    pub tool_calls: usize,
    pub round_trips: usize,
}

impl AgentResponse {
    /// Text for answered turns, the matching `AgentError` otherwise.
    pub fn into_result(self) -> Result<String> {
        match self.outcome {
            TurnOutcome::Answered => Ok(self.text),
            TurnOutcome::ExecutionBoundExceeded => Err(AgentError::ExecutionBoundExceeded {
                limit: self.round_trips,
            }),
            TurnOutcome::UpstreamUnavailable => Err(AgentError::UpstreamUnavailable(self.text)),
            TurnOutcome::Unclear => Err(AgentError::Llm("model returned an empty reply".to_string())),
        }
    }
}

/// End a turn the model could not finish. Without tool side effects the
/// turn is erased; otherwise the executed calls and their results stay in
/// history, followed by the fixed message.
fn close_failed_turn(session: &mut Session, checkpoint: usize, tool_calls: usize, text: &str) {
    if tool_calls == 0 {
        session.rollback_to(checkpoint);
    } else {
        session.push(Message::assistant(text));
    }
}

/// Loop state for one user message.
#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    Answering(String),
    ToolPending(Vec<ToolCallRequest>),
    Done(TurnOutcome, String),
}

pub struct ConversationManager {
    llm: Arc<dyn LlmPort>,
    tools: ToolRegistry,
    config: AgentConfig,
    event_bus: EventBus,
    turn_counter: AtomicU64,
}

impl ConversationManager {
    pub fn new(llm: Arc<dyn LlmPort>, tools: ToolRegistry, config: AgentConfig, event_bus: EventBus) -> Self {
        Self {
            llm,
            tools,
            config,
            event_bus,
            turn_counter: AtomicU64::new(0),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Process one user message against `session`.
    pub async fn handle(&self, session: &mut Session, user_text: &str) -> AgentResponse {
        let turn_id = self.turn_counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.event_bus.emit(AgentEvent::TurnStart {
            turn_id,
            session_id: session.id.clone(),
        });

        let checkpoint = session.len();
        let language = session.observe_language(user_text);
        session.push(Message::user(user_text));

        let bound = self.config.agent.effective_bound();
        let mut round_trips = 0usize;
        let mut tool_calls = 0usize;
        let mut state = LoopState::AwaitingModel;

        let (outcome, text) = loop {
            state = match state {
                LoopState::AwaitingModel if round_trips >= bound => {
                    log::warn!(
                        "Session {}: tool loop bound of {} round-trips reached",
                        session.id,
                        bound
                    );
                    let text = language.pick(BOUND_FA, BOUND_EN).to_string();
                    session.push(Message::assistant(&text));
                    LoopState::Done(TurnOutcome::ExecutionBoundExceeded, text)
                }
                LoopState::AwaitingModel => {
                    round_trips += 1;
                    match self.call_model(session, language).await {
                        Ok(reply) if !reply.tool_calls.is_empty() => {
                            let calls = reply.tool_calls.clone();
                            session.push(Message::assistant_tool_calls(reply.content, reply.tool_calls));
                            LoopState::ToolPending(calls)
                        }
                        Ok(reply) if !reply.content.trim().is_empty() => LoopState::Answering(reply.content),
                        Ok(_) => {
                            log::warn!("Session {}: model returned an empty reply", session.id);
                            let text = language.pick(UNCLEAR_FA, UNCLEAR_EN).to_string();
                            close_failed_turn(session, checkpoint, tool_calls, &text);
                            LoopState::Done(TurnOutcome::Unclear, text)
                        }
                        Err(e) => {
                            log::error!("Session {}: model unavailable: {}", session.id, e);
                            self.event_bus.emit(AgentEvent::Error { message: e.to_string() });
                            let text = language.pick(UPSTREAM_FA, UPSTREAM_EN).to_string();
                            close_failed_turn(session, checkpoint, tool_calls, &text);
                            LoopState::Done(TurnOutcome::UpstreamUnavailable, text)
                        }
                    }
                }
                LoopState::ToolPending(calls) => {
                    let mut calls = calls.into_iter();
                    if let Some(first) = calls.next() {
                        let result = self.execute_tool(&first).await;
                        tool_calls += 1;
                        session.push(Message::tool_result(&result.call_id, &result.output));
                    }
                    for extra in calls {
                        let rejected = self.reject_extra_call(&extra);
                        session.push(Message::tool_result(&rejected.call_id, &rejected.output));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Answering(text) => {
                    session.push(Message::assistant(&text));
                    self.event_bus.emit(AgentEvent::LlmComplete { text: text.clone() });
                    LoopState::Done(TurnOutcome::Answered, text)
                }
                LoopState::Done(outcome, text) => break (outcome, text),
            };
        };

        self.event_bus.emit(AgentEvent::TurnEnd { turn_id });
        log::debug!(
            "Session {}: turn {} ended {:?} after {} round-trips, {} tool calls",
            session.id,
            turn_id,
            outcome,
            round_trips,
            tool_calls
        );

        AgentResponse {
            text,
            outcome,
            tool_calls,
            round_trips,
        }
    }

    /// One model round-trip with timeout and at most one retry.
    async fn call_model(&self, session: &Session, language: Language) -> Result<Message> {
        let llm_config = &self.config.llm;
        let mut messages = Vec::with_capacity(session.len() + 1);
        messages.push(Message::system(system_prompt(
            &self.config.app_name,
            self.tools.clock().today(),
            language,
        )));
        messages.extend_from_slice(session.messages());

        let request = ChatRequest {
            messages,
            tools: self.tools.definitions(),
            model: llm_config.model.clone(),
            max_tokens: llm_config.max_tokens,
            temperature: llm_config.temperature,
        };

        let timeout = Duration::from_secs(llm_config.timeout_secs.max(1));
        let retries = llm_config.effective_retries();
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(timeout, self.llm.chat_completion(request.clone())).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout(timeout.as_millis() as u64)),
            };

            match result {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        log::debug!(
                            "Model usage: {} prompt + {} completion tokens",
                            usage.prompt_tokens,
                            usage.completion_tokens
                        );
                    }
                    return Ok(response.message);
                }
                Err(e) if attempt < retries && e.is_transient() => {
                    attempt += 1;
                    log::warn!("Model call failed ({}); retry {}/{}", e, attempt, retries);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute a single tool call and return the result
    async fn execute_tool(&self, tc: &ToolCallRequest) -> ToolResult {
        let call_id = tc.id.clone();
        let tool_name = tc.function.name.as_str();

        self.event_bus.emit(AgentEvent::ToolExecStart {
            call_id: call_id.clone(),
            tool_name: tool_name.to_string(),
            arguments: tc.function.arguments.clone(),
        });

        let outcome = self.tools.execute(tool_name, &tc.function.arguments).await;
        match &outcome {
            Ok(_) => log::info!("Tool {} executed", tool_name),
            Err(e) => log::info!("Tool {} failed: {} ({})", tool_name, e.kind.as_str(), e.message),
        }

        let result = ToolResult::from_outcome(call_id, &outcome);
        self.event_bus.emit(AgentEvent::ToolExecEnd {
            call_id: result.call_id.clone(),
            result: result.output.clone(),
            success: result.success,
        });
        result
    }

    fn reject_extra_call(&self, tc: &ToolCallRequest) -> ToolResult {
        log::warn!("Skipping extra tool call {} ({})", tc.id, tc.function.name);
        let error = ToolError::invalid_input(
            "Only one tool call runs per step; this call was skipped. Issue it again after reading the previous result.",
        );
        let result = ToolResult::from_outcome(tc.id.clone(), &Err(error));
        self.event_bus.emit(AgentEvent::ToolExecEnd {
            call_id: result.call_id.clone(),
            result: result.output.clone(),
            success: false,
        });
        result
    }
}
