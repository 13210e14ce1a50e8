use std::path::PathBuf;

use clap::Parser;

use crate::config::LoadOptions;

/// Safar travel assistant: a bilingual chat agent for bus tickets,
/// destinations and company policy.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "safar", version, about)]
pub struct Cli {
    /// Config file path (defaults to ./safar.toml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Policy document to index, overriding the configured path.
    #[arg(short, long)]
    pub policy: Option<String>,

    /// Print the ticket store after every answer.
    #[arg(long)]
    pub show_tickets: bool,

    /// Validate configuration and exit.
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            policy_path: self.policy.clone(),
        }
    }
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Quit,
    Reset,
    Tickets,
    Help,
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> Input<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        if !line.starts_with('/') {
            return match line.to_lowercase().as_str() {
                "exit" | "quit" | "خروج" => Input::Quit,
                _ => Input::Message(line),
            };
        }
        match line {
            "/quit" | "/exit" => Input::Quit,
            "/reset" => Input::Reset,
            "/tickets" => Input::Tickets,
            "/help" => Input::Help,
            other => Input::Unknown(other),
        }
    }
}
