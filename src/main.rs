//! Book Recommendation Agent: interactive entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger once (CLI `-v` flags > RUST_LOG > configured level)
//!   4. Check the API key
//!   5. Load the book dataset
//!   6. Build provider + agent
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run the shell until `exit`, EOF or Ctrl-C

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use book_agent::agent::BookAgent;
use book_agent::catalog::loader;
use book_agent::config::{self, API_KEY_ENV};
use book_agent::error::AppError;
use book_agent::llm::providers;
use book_agent::{logger, shell};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("\nerror: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref(), args.dataset_path.as_deref())?;

    let level = logger::init_from(args.log_level, &config.log_level)?;

    info!(
        agent_name = %config.agent_name,
        dataset = %config.dataset_path.display(),
        provider = %config.llm.provider,
        model = %config.llm.openai.model,
        log_filter = %level.directive,
        log_source = ?level.source,
        "config loaded"
    );

    if config.llm.requires_api_key() && config.llm_api_key.is_none() {
        return Err(AppError::Credential(format!(
            "{API_KEY_ENV} is not set in your environment."
        )));
    }

    let catalog = Arc::new(loader::load(&config.dataset_path)?);

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let agent = BookAgent::new(provider, catalog, &config.prompts_dir);

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received: initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    shell::run(&agent, &config.agent_name, shutdown).await
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    dataset_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut dataset_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: book-agent [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -d, --data <PATH>          Path to books.json (default: data/books.json)");
                println!("  -v, -vv, -vvv              Increase logging verbosity");
                println!();
                println!("Environment:");
                println!("  {API_KEY_ENV}             API key for the hosted model (required)");
                std::process::exit(0);
            }
            "-f" | "--config" => match iter.next() {
                Some(path) => config_path = Some(path),
                None => {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            },
            "-d" | "--data" => match iter.next() {
                Some(path) => dataset_path = Some(path),
                None => {
                    eprintln!("error: -d/--data requires a path argument");
                    std::process::exit(1);
                }
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v    → info
    //   -vv   → debug  (request summaries, usage)
    //   -vvv+ → trace  (full payload dumps)
    let log_level = match verbosity {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path, dataset_path }
}
