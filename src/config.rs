//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit `-f` path), then applies `BOOK_AGENT_DATASET` and
//! `BOOK_AGENT_LOG_LEVEL` env overrides. The API key comes from
//! `OPENAI_API_KEY` and is never sourced from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"openai"` or `"dummy"`).
    /// Named `default` in the `[llm]` TOML table.
    pub provider: String,
    pub openai: OpenAiConfig,
}

impl LlmConfig {
    /// Whether the active provider needs `OPENAI_API_KEY`.
    pub fn requires_api_key(&self) -> bool {
        self.provider != "dummy"
    }
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub agent_name: String,
    pub log_level: String,
    /// Path to the `{ "books": [...] }` dataset (already expanded, no `~`).
    pub dataset_path: PathBuf,
    /// Directory holding the prompt layers.
    pub prompts_dir: PathBuf,
    pub llm: LlmConfig,
    pub llm_api_key: Option<String>,
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawAgent {
    #[serde(default = "default_agent_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_dataset_path")]
    dataset_path: String,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
}

impl Default for RawAgent {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            dataset_path: default_dataset_path(),
            prompts_dir: default_prompts_dir(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
        }
    }
}

fn default_agent_name() -> String { "Book Recommendation Agent".to_string() }
fn default_log_level() -> String { "warn".to_string() }
fn default_dataset_path() -> String { "data/books.json".to_string() }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 60 }

/// Overrides applied on top of the TOML values.
#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub dataset_path: Option<&'a str>,
    pub log_level: Option<&'a str>,
}

/// Load config from `path` (or `config/default.toml`), then apply env-var
/// and CLI overrides. `dataset_cli` beats `BOOK_AGENT_DATASET`.
pub fn load(path: Option<&str>, dataset_cli: Option<&str>) -> Result<Config, AppError> {
    let dataset_env = env::var("BOOK_AGENT_DATASET").ok();
    let log_level_env = env::var("BOOK_AGENT_LOG_LEVEL").ok();
    let overrides = Overrides {
        dataset_path: dataset_cli.or(dataset_env.as_deref()),
        log_level: log_level_env.as_deref(),
    };

    let mut config = match path {
        Some(p) => load_from(Path::new(p), &overrides)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_from(Path::new(DEFAULT_CONFIG_PATH), &overrides)?
        }
        None => resolve(RawConfig::default(), &overrides),
    };
    config.llm_api_key = env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    Ok(config)
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    Ok(resolve(parsed, overrides))
}

fn resolve(parsed: RawConfig, overrides: &Overrides<'_>) -> Config {
    let a = parsed.agent;
    let dataset = overrides.dataset_path.unwrap_or(&a.dataset_path);
    let log_level = overrides.log_level.unwrap_or(&a.log_level).to_string();

    Config {
        agent_name: a.name,
        log_level,
        dataset_path: expand_home(dataset),
        prompts_dir: expand_home(&a.prompts_dir),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        llm_api_key: None,
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: dummy LLM, no API key, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(dataset_path: &Path) -> Self {
        Self {
            agent_name: "test".into(),
            log_level: "info".into(),
            dataset_path: dataset_path.to_path_buf(),
            prompts_dir: PathBuf::from("/nonexistent/prompts"),
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            llm_api_key: None,
        }
    }
}
