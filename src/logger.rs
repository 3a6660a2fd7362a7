//! Logging initialisation via tracing-subscriber.
//!
//! Logs go to stderr so they never interleave with the chat transcript on
//! stdout. Level precedence, highest first:
//!
//!   1. `-v` flags on the command line
//!   2. `RUST_LOG` (full `EnvFilter` directive syntax)
//!   3. the configured level (`BOOK_AGENT_LOG_LEVEL` or `[agent] log_level`)

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Where the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    Cli,
    RustLog,
    Config,
}

/// The filter directive that will be installed, and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveLevel {
    pub directive: String,
    pub source: LevelSource,
}

/// Pick the filter directive from the three sources.
///
/// A blank `RUST_LOG` counts as unset. A set but unparsable `RUST_LOG`, or an
/// invalid configured level, is an error rather than a silent fallback.
pub fn select_level(
    cli_level: Option<&str>,
    rust_log: Option<&str>,
    config_level: &str,
) -> Result<EffectiveLevel, AppError> {
    if let Some(level) = cli_level {
        parse_level(level)?;
        return Ok(EffectiveLevel { directive: level.to_string(), source: LevelSource::Cli });
    }

    if let Some(directive) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        EnvFilter::try_new(directive)
            .map_err(|e| AppError::Logger(format!("invalid RUST_LOG '{directive}': {e}")))?;
        return Ok(EffectiveLevel { directive: directive.to_string(), source: LevelSource::RustLog });
    }

    parse_level(config_level)?;
    Ok(EffectiveLevel { directive: config_level.to_string(), source: LevelSource::Config })
}

/// Resolve the level against the process environment and install the
/// global subscriber. Call once at startup.
pub fn init_from(cli_level: Option<&str>, config_level: &str) -> Result<EffectiveLevel, AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = select_level(cli_level, rust_log.as_deref(), config_level)?;

    let filter = EnvFilter::try_new(&level.directive)
        .map_err(|e| AppError::Logger(format!("invalid log filter '{}': {e}", level.directive)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(level)
}

/// Parse a plain level name (`error` .. `trace`, `off`). Directive strings
/// such as `book_agent=debug` are only accepted through `RUST_LOG`.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
