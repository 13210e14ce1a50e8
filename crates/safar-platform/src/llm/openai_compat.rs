//! OpenAI-compatible LLM adapter.
//!
//! Works with AvalAI, OpenAI, and any provider using the
//! OpenAI chat completions API format.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use safar_core::ports::*;
use safar_types::{
    config::LlmConfig,
    message::{FunctionCall, Message, Role, ToolCallRequest},
    AgentError, Result,
};

/// Provider that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: LlmConfig,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = http_client(&config)?;
        let base_url = config.base_url().to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(message_to_json).collect();

        let mut body = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

#[async_trait]
impl LlmPort for OpenAiCompatProvider {
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(&req);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(status_error(status, &text));
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Unparseable response: {}", e)))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Llm("No choices in response".to_string()))?;

        let message = parse_api_message(choice.message);
        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse { message, usage })
    }
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Timeouts and connection failures are transient; anything else from the
/// transport is not.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> AgentError {
    if e.is_timeout() {
        AgentError::Timeout(timeout_secs.max(1) * 1000)
    } else if e.is_connect() || e.is_request() {
        AgentError::Network(e.to_string())
    } else {
        AgentError::Llm(e.to_string())
    }
}

/// Rate limits and server errors are worth a retry; client errors are not.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> AgentError {
    let detail = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        AgentError::Network(detail)
    } else {
        AgentError::Llm(detail)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ─── Serialization helpers ───────────────────────────────────

fn message_to_json(msg: &Message) -> Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let mut obj = json!({
        "role": role,
        "content": msg.content,
    });

    if let Some(ref id) = msg.tool_call_id {
        obj["tool_call_id"] = json!(id);
    }

    if !msg.tool_calls.is_empty() {
        let calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.function.name,
                        "arguments": tc.function.arguments,
                    }
                })
            })
            .collect();
        obj["tool_calls"] = json!(calls);
        if msg.content.is_empty() {
            obj["content"] = Value::Null;
        }
    }

    obj
}

fn parse_api_message(api: ApiMessage) -> Message {
    let role = match api.role.as_deref() {
        Some("system") => Role::System,
        Some("user") => Role::User,
        Some("tool") => Role::Tool,
        _ => Role::Assistant,
    };

    let tool_calls: Vec<ToolCallRequest> = api
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallRequest {
            id: tc.id,
            function: FunctionCall {
                name: tc.function.name,
                arguments: tc.function.arguments,
            },
        })
        .collect();

    Message {
        role,
        content: api.content.unwrap_or_default(),
        tool_call_id: None,
        tool_calls,
    }
}
