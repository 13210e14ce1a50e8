use serde::{Deserialize, Serialize};

/// Events emitted by the conversation manager.
/// Presentation adapters subscribe to these for progress and debug output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Manager started processing a user message
    TurnStart { turn_id: u64, session_id: String },

    /// The model produced a final answer
    LlmComplete { text: String },

    /// A tool call is about to execute
    ToolExecStart { call_id: String, tool_name: String, arguments: String },

    /// Tool execution finished (or was rejected at the argument boundary)
    ToolExecEnd { call_id: String, result: String, success: bool },

    /// Manager finished the current turn
    TurnEnd { turn_id: u64 },

    /// An error occurred
    Error { message: String },
}
