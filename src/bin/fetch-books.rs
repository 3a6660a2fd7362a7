//! `fetch-books`: regenerate the local book dataset.
//!
//! Downloads works for each genre from the Open Library subjects API and
//! writes `{ "books": [...] }` for `book-agent` to load.
//!
//! # Usage
//!
//! ```text
//! fetch-books [--out <path>] [--limit <n>] [--base-url <url>]
//!
//! Flags:
//!   --out <path>        output file (default: data/books.json)
//!   --limit <n>         works per genre (default: 25)
//!   --base-url <url>    subjects endpoint (default: https://openlibrary.org/subjects)
//!   --help, -h          print this help
//! ```

use std::path::PathBuf;
use std::process;

use book_agent::catalog::fetch::{self, Fetcher, DEFAULT_BASE_URL, DEFAULT_LIMIT, SUBJECTS};
use book_agent::error::AppError;
use book_agent::logger;

struct Args {
    out: PathBuf,
    limit: u32,
    base_url: String,
}

fn main() {
    let args = parse_args();

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), AppError> {
    logger::init_from(None, "info")?;

    let fetcher = Fetcher::new(args.base_url, args.limit)?;
    let books = fetcher.fetch_all(SUBJECTS)?;
    fetch::write_dataset(&args.out, &books)?;

    println!("\nSaved {} books to {}", books.len(), args.out.display());
    Ok(())
}

fn parse_args() -> Args {
    let mut args = Args {
        out: PathBuf::from("data/books.json"),
        limit: DEFAULT_LIMIT,
        base_url: DEFAULT_BASE_URL.to_string(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: fetch-books [--out <path>] [--limit <n>] [--base-url <url>]");
                process::exit(0);
            }
            "--out" => args.out = PathBuf::from(required(&mut iter, "--out")),
            "--limit" => {
                let raw = required(&mut iter, "--limit");
                args.limit = raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: --limit expects a positive integer, got '{raw}'");
                    process::exit(1);
                });
            }
            "--base-url" => args.base_url = required(&mut iter, "--base-url"),
            other => {
                eprintln!("error: unknown argument '{other}' (see --help)");
                process::exit(1);
            }
        }
    }

    args
}

fn required(iter: &mut impl Iterator<Item = String>, flag: &str) -> String {
    iter.next().unwrap_or_else(|| {
        eprintln!("error: {flag} requires a value");
        process::exit(1);
    })
}
