//! Dataset loading: `{ "books": [...] }` JSON into a [`Catalog`].
//!
//! Accepts both the single-`author` record shape and the `authors` array
//! written by `fetch-books`. Any failure here is fatal at startup.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{Book, Catalog};
use crate::error::AppError;

const REGENERATE_HINT: &str = "run: fetch-books";

#[derive(Deserialize)]
struct RawDataset {
    books: Vec<RawBook>,
}

#[derive(Deserialize)]
struct RawBook {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    authors: Vec<Option<String>>,
    #[serde(default)]
    first_publish_year: Option<i64>,
    subject: String,
}

impl From<RawBook> for Book {
    fn from(raw: RawBook) -> Self {
        let author = raw.author.or_else(|| {
            let names: Vec<String> = raw.authors.into_iter().flatten().collect();
            (!names.is_empty()).then(|| names.join(", "))
        });
        Book {
            title: raw.title,
            author,
            first_publish_year: raw.first_publish_year,
            subject: raw.subject,
        }
    }
}

/// Read and parse the dataset at `path`.
pub fn load(path: &Path) -> Result<Catalog, AppError> {
    if !path.exists() {
        return Err(AppError::Dataset(format!(
            "books.json not found at {}. {REGENERATE_HINT}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Dataset(format!("cannot read {}: {e}", path.display())))?;

    let catalog = parse(&raw).map_err(|e| match e {
        AppError::Dataset(msg) => AppError::Dataset(format!("{}: {msg}", path.display())),
        other => other,
    })?;

    info!(path = %path.display(), books = catalog.len(), "dataset loaded");
    Ok(catalog)
}

/// Parse dataset JSON text. Split out from [`load`] so callers with an
/// in-memory document skip the filesystem.
pub fn parse(text: &str) -> Result<Catalog, AppError> {
    let parsed: RawDataset = serde_json::from_str(text).map_err(|e| {
        AppError::Dataset(format!(
            "invalid books.json format, expected {{\"books\": [...]}} ({e}). {REGENERATE_HINT}"
        ))
    })?;

    let books: Vec<Book> = parsed.books.into_iter().map(Book::from).collect();
    debug!(books = books.len(), "dataset parsed");
    Ok(Catalog::new(books))
}
