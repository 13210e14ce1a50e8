use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Definition of a tool that the LLM can invoke.
/// Follows the OpenAI function-calling schema for broad provider compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String, // always "object"
    pub properties: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

/// Successful tool output, serialised back to the model as an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ToolOutput {
    pub fn new(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    pub fn to_observation(&self) -> String {
        let mut obj = json!({
            "status": "success",
            "message": self.message,
        });
        if !self.data.is_null() {
            obj["data"] = self.data.clone();
        }
        obj.to_string()
    }
}

/// Error categories a tool can report. These are observations for the
/// model, never process failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidInput,
    InvalidCity,
    TicketNotFound,
    PolicyUnavailable,
    UnknownTool,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::InvalidInput => "invalid_input",
            ToolErrorKind::InvalidCity => "invalid_city",
            ToolErrorKind::TicketNotFound => "ticket_not_found",
            ToolErrorKind::PolicyUnavailable => "policy_unavailable",
            ToolErrorKind::UnknownTool => "unknown_tool",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{}: {message}", kind.as_str())]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidInput, message)
    }

    pub fn invalid_city(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidCity, message)
    }

    pub fn ticket_not_found(ticket_id: &str) -> Self {
        Self::new(
            ToolErrorKind::TicketNotFound,
            format!("Ticket ID '{}' not found. Please check the ID.", ticket_id),
        )
    }

    pub fn policy_unavailable() -> Self {
        Self::new(
            ToolErrorKind::PolicyUnavailable,
            "Policy data unavailable. Official policy information cannot be provided right now; suggest contacting customer support.",
        )
    }

    pub fn to_observation(&self) -> String {
        json!({
            "status": "error",
            "kind": self.kind,
            "message": self.message,
        })
        .to_string()
    }
}

/// Result of executing (or rejecting) one tool call, as recorded in history
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
    pub success: bool,
}

impl ToolResult {
    pub fn from_outcome(call_id: impl Into<String>, outcome: &Result<ToolOutput, ToolError>) -> Self {
        match outcome {
            Ok(output) => Self {
                call_id: call_id.into(),
                output: output.to_observation(),
                success: true,
            },
            Err(err) => Self {
                call_id: call_id.into(),
                output: err.to_observation(),
                success: false,
            },
        }
    }
}
