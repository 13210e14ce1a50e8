pub mod ports;
pub mod embedding;
pub mod policy;
pub mod refund;
pub mod tickets;
pub mod destinations;
pub mod tools;
pub mod prompt;
pub mod event_bus;
pub mod runtime;

#[cfg(test)]
mod tests;

pub use event_bus::EventBus;
pub use policy::{PolicyAnswer, PolicyStore};
pub use runtime::{AgentResponse, ConversationManager, TurnOutcome};
pub use tickets::TicketStore;
pub use tools::{ToolCall, ToolRegistry};
