//! Console shell: reads lines from stdin, runs one agent turn per line,
//! prints the reply to stdout.
//!
//! Runs until the user types `exit`, stdin is closed, or the `shutdown`
//! token is cancelled (Ctrl-C). A turn is always awaited to completion
//! before the next line is read.
//!
//! Errors (an unreadable stdin line, a failed turn) end the session and are
//! returned to the caller, which reports them once.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::BookAgent;
use crate::error::AppError;

const PROMPT: &str = "You: ";

/// `true` for the literal, case-insensitive `exit` command.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Drive the shell over the process stdin/stdout.
pub async fn run(agent: &BookAgent, title: &str, shutdown: CancellationToken) -> Result<(), AppError> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_with(agent, title, stdin, &mut stdout, shutdown).await
}

/// Shell loop over arbitrary input/output, so tests can script a session.
pub async fn run_with<R, W>(
    agent: &BookAgent,
    title: &str,
    input: R,
    out: &mut W,
    shutdown: CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!(books = agent.catalog().len(), "shell started");
    writeln!(out, "{title}")?;
    writeln!(out, "Loaded {} books.\n", agent.catalog().len())?;
    writeln!(out, "Type something like: \"Recommend a fantasy book\"")?;
    writeln!(out, "Type \"exit\" to quit.\n")?;

    let mut lines = input.lines();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let line = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received: closing shell");
                writeln!(out)?;
                break;
            }

            line = lines.next_line() => line,
        };

        let input = match line {
            Err(e) => return Err(AppError::Io(e)),
            Ok(None) => {
                info!("stdin closed");
                writeln!(out)?;
                break;
            }
            Ok(Some(input)) => input,
        };

        if is_exit(&input) {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        debug!(input = %input, "shell received line");

        let reply = agent.handle_turn(input).await?;
        writeln!(out, "\nAgent: {reply}\n")?;
    }

    let usage = agent.session_usage();
    info!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        cached_tokens = usage.cached_input_tokens,
        "session usage"
    );
    writeln!(out, "\nAgent closed")?;
    out.flush()?;
    Ok(())
}
