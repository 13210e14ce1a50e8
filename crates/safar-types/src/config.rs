use serde::{Deserialize, Serialize};

/// Top-level agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Cosmetic display name
    pub app_name: String,
    pub llm: LlmConfig,
    pub agent: LoopConfig,
    pub policy: PolicyConfig,
    pub refund: RefundTable,
    pub logging: LoggingConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            app_name: "Safar Travel AI Agent".to_string(),
            llm: LlmConfig::default(),
            agent: LoopConfig::default(),
            policy: PolicyConfig::default(),
            refund: RefundTable::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: String,
    pub api_base: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Extra attempts after a failed model call. Never more than one.
    pub max_retries: u32,
    /// Remote embedding model for policy retrieval; `None` selects the
    /// local hashing embedder.
    pub embedding_model: Option<String>,
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn base_url(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_retries(&self) -> u32 {
        self.max_retries.min(1)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5.2".to_string(),
            api_key: String::new(),
            api_base: None,
            max_tokens: 1024,
            temperature: 0.3,
            timeout_secs: 30,
            max_retries: 1,
            embedding_model: None,
        }
    }
}

/// Orchestration loop limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Model round-trips allowed for one user message
    pub max_tool_iterations: usize,
}

impl LoopConfig {
    pub fn effective_bound(&self) -> usize {
        self.max_tool_iterations.max(1)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub path: String,
    pub top_k: usize,
}

impl PolicyConfig {
    pub fn effective_top_k(&self) -> usize {
        self.top_k.clamp(1, 3)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: "data/company_policy.txt".to_string(),
            top_k: 2,
        }
    }
}

/// One row of the refund table: cancelling at least `min_hours_before`
/// hours ahead of departure refunds `refund_percent` of the fare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRule {
    pub min_hours_before: i64,
    pub refund_percent: u8,
}

/// Time-to-departure keyed refund rules.
///
/// Rules are matched from the largest threshold down; the first rule whose
/// threshold is met wins. Cancelling after departure (or below every
/// threshold) refunds `after_departure_percent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundTable {
    pub rules: Vec<RefundRule>,
    pub after_departure_percent: u8,
}

impl RefundTable {
    /// Rules ordered from the largest threshold down.
    pub fn ordered(&self) -> Vec<RefundRule> {
        let mut rules = self.rules.clone();
        rules.sort_by(|a, b| b.min_hours_before.cmp(&a.min_hours_before));
        rules
    }
}

impl Default for RefundTable {
    fn default() -> Self {
        Self {
            rules: vec![
                RefundRule { min_hours_before: 72, refund_percent: 90 },
                RefundRule { min_hours_before: 24, refund_percent: 70 },
                RefundRule { min_hours_before: 3, refund_percent: 50 },
                RefundRule { min_hours_before: 0, refund_percent: 30 },
            ],
            after_departure_percent: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
}
