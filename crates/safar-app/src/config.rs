//! Configuration loading: defaults, then an optional TOML file, then
//! environment overrides, then validation.

use std::path::{Path, PathBuf};

use safar_types::config::{AgentConfig, LogFormat};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "safar.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Explicit file; when set it must exist.
    pub config_path: Option<PathBuf>,
    /// Overrides `policy.path` after everything else.
    pub policy_path: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<AgentConfig, ConfigError> {
    load_with_env(options, read_env)
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with_env(
    options: LoadOptions,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AgentConfig, ConfigError> {
    let mut config = match resolve_config_path(options.config_path.as_deref())? {
        Some(path) => read_file(&path)?,
        None => AgentConfig::default(),
    };

    apply_env_overrides(&mut config, &env)?;
    if let Some(policy_path) = options.policy_path {
        config.policy.path = policy_path;
    }
    validate(&config)?;
    Ok(config)
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::MissingConfigFile(path.to_path_buf())),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            Ok(default.exists().then_some(default))
        }
    }
}

fn read_file(path: &Path) -> Result<AgentConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(
    config: &mut AgentConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let read = |keys: &[&'static str]| lookup(env, keys);

    if let Some((_, value)) = read(&["APP_NAME", "SAFAR_APP_NAME"]) {
        config.app_name = value;
    }

    if let Some((_, value)) = read(&["MODEL_NAME", "SAFAR_LLM_MODEL"]) {
        config.llm.model = value;
    }
    if let Some((_, value)) = read(&["AVALAI_API_KEY", "SAFAR_LLM_API_KEY"]) {
        config.llm.api_key = value;
    }
    if let Some((_, value)) = read(&["AVALAI_BASE_URL", "SAFAR_LLM_BASE_URL"]) {
        config.llm.api_base = Some(value);
    }
    if let Some((key, value)) = read(&["SAFAR_LLM_MAX_TOKENS"]) {
        config.llm.max_tokens = parse(key, &value)?;
    }
    if let Some((key, value)) = read(&["SAFAR_LLM_TEMPERATURE"]) {
        config.llm.temperature = parse(key, &value)?;
    }
    if let Some((key, value)) = read(&["SAFAR_LLM_TIMEOUT_SECS"]) {
        config.llm.timeout_secs = parse(key, &value)?;
    }
    if let Some((key, value)) = read(&["SAFAR_LLM_MAX_RETRIES"]) {
        config.llm.max_retries = parse(key, &value)?;
    }
    if let Some((_, value)) = read(&["SAFAR_LLM_EMBEDDING_MODEL", "SAFAR_EMBEDDING_MODEL"]) {
        config.llm.embedding_model = Some(value);
    }

    if let Some((key, value)) = read(&["SAFAR_MAX_TOOL_ITERATIONS"]) {
        config.agent.max_tool_iterations = parse(key, &value)?;
    }
    if let Some((_, value)) = read(&["SAFAR_POLICY_PATH"]) {
        config.policy.path = value;
    }
    if let Some((key, value)) = read(&["SAFAR_POLICY_TOP_K"]) {
        config.policy.top_k = parse(key, &value)?;
    }

    if let Some((_, value)) = read(&["SAFAR_LOG_LEVEL"]) {
        config.logging.level = value;
    }
    if let Some((key, value)) = read(&["SAFAR_LOG_FORMAT"]) {
        config.logging.format = match value.trim().to_ascii_lowercase().as_str() {
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnvOverride {
                    key: key.to_string(),
                    value,
                })
            }
        };
    }

    Ok(())
}

pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.llm.api_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set AVALAI_API_KEY)".to_string(),
        ));
    }

    match config.llm.api_base.as_deref().map(str::trim) {
        None | Some("") => {
            return Err(ConfigError::Validation(
                "llm.api_base is required (set AVALAI_BASE_URL)".to_string(),
            ))
        }
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            return Err(ConfigError::Validation(
                "llm.api_base must start with http:// or https://".to_string(),
            ))
        }
        Some(_) => {}
    }

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        return Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        ));
    }

    if config.refund.rules.iter().any(|r| r.refund_percent > 100 || r.min_hours_before < 0)
        || config.refund.after_departure_percent > 100
    {
        return Err(ConfigError::Validation(
            "refund rules need percentages in 0..=100 and non-negative hour thresholds".to_string(),
        ));
    }

    Ok(())
}

/// First key that is set, with its value.
fn lookup(
    env: &impl Fn(&str) -> Option<String>,
    keys: &[&'static str],
) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| env(*key).map(|value| (*key, value)))
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
