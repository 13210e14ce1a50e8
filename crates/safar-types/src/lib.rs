pub mod message;
pub mod event;
pub mod tool;
pub mod config;
pub mod error;
pub mod session;
pub mod language;
pub mod city;
pub mod ticket;


pub use error::AgentError;
pub type Result<T> = std::result::Result<T, AgentError>;
