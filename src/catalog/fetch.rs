//! Dataset regeneration from the Open Library subjects API.
//!
//! Blocking on purpose: `fetch-books` is a one-shot tool that runs a handful
//! of sequential requests and exits.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org/subjects";
pub const DEFAULT_LIMIT: u32 = 25;
pub const SUBJECTS: &[&str] = &["science_fiction", "mystery", "fantasy", "thriller"];

/// One record as written to `books.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedBook {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub first_publish_year: Option<i64>,
    pub subject: String,
}

#[derive(Deserialize)]
struct SubjectResponse {
    #[serde(default)]
    works: Vec<Work>,
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<WorkAuthor>,
    #[serde(default)]
    first_publish_year: Option<i64>,
}

#[derive(Deserialize)]
struct WorkAuthor {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct DatasetFile<'a> {
    books: &'a [FetchedBook],
}

pub struct Fetcher {
    client: Client,
    base_url: String,
    limit: u32,
}

impl Fetcher {
    pub fn new(base_url: impl Into<String>, limit: u32) -> Result<Self, AppError> {
        let base_url: String = base_url.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("book-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        })
    }

    /// Fetch up to `limit` works for one subject, tagged with that subject.
    pub fn fetch_subject(&self, subject: &str) -> Result<Vec<FetchedBook>, AppError> {
        let url = format!("{}/{subject}.json", self.base_url);
        info!(%subject, %url, "fetching books for genre");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", self.limit)])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Fetch(format!("{url}: {e}")))?;

        let parsed: SubjectResponse = response
            .json()
            .map_err(|e| AppError::Fetch(format!("{url}: invalid response body: {e}")))?;

        let books: Vec<FetchedBook> = parsed
            .works
            .into_iter()
            .map(|w| FetchedBook {
                title: w.title,
                authors: w.authors.into_iter().filter_map(|a| a.name).collect(),
                first_publish_year: w.first_publish_year,
                subject: subject.to_string(),
            })
            .collect();
        debug!(%subject, books = books.len(), "subject fetched");
        Ok(books)
    }

    /// Fetch every subject in order and concatenate the results.
    pub fn fetch_all(&self, subjects: &[&str]) -> Result<Vec<FetchedBook>, AppError> {
        let mut all = Vec::new();
        for subject in subjects {
            all.extend(self.fetch_subject(subject)?);
        }
        Ok(all)
    }
}

/// Write `{ "books": [...] }` as pretty JSON, creating parent directories.
pub fn write_dataset(path: &Path, books: &[FetchedBook]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&DatasetFile { books })
        .map_err(|e| AppError::Fetch(format!("failed to encode dataset: {e}")))?;
    fs::write(path, json)?;
    info!(path = %path.display(), books = books.len(), "dataset written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::loader;
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn fetches_and_maps_works() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/subjects/fantasy.json").query_param("limit", "2");
            then.status(200).json_body(json!({
                "name": "fantasy",
                "works": [
                    {
                        "title": "Good Omens",
                        "authors": [{ "name": "Terry Pratchett" }, { "name": "Neil Gaiman" }],
                        "first_publish_year": 1990
                    },
                    { "title": "Untitled", "authors": [{ "key": "/authors/x" }] }
                ]
            }));
        });

        let fetcher = Fetcher::new(server.url("/subjects/"), 2).unwrap();
        let books = fetcher.fetch_subject("fantasy").unwrap();

        mock.assert();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].authors, vec!["Terry Pratchett", "Neil Gaiman"]);
        assert_eq!(books[0].first_publish_year, Some(1990));
        assert_eq!(books[0].subject, "fantasy");
        assert!(books[1].authors.is_empty());
        assert_eq!(books[1].first_publish_year, None);
    }

    #[test]
    fn http_error_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/subjects/mystery.json");
            then.status(503);
        });

        let fetcher = Fetcher::new(server.url("/subjects"), 25).unwrap();
        let err = fetcher.fetch_all(&["mystery", "fantasy"]).unwrap_err().to_string();
        assert!(err.contains("fetch error"));
        assert!(err.contains("503"));
    }

    #[test]
    fn written_dataset_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("books.json");
        let books = vec![
            FetchedBook {
                title: Some("Dune".into()),
                authors: vec!["Frank Herbert".into()],
                first_publish_year: Some(1965),
                subject: "science_fiction".into(),
            },
            FetchedBook {
                title: None,
                authors: vec![],
                first_publish_year: None,
                subject: "mystery".into(),
            },
        ];

        write_dataset(&path, &books).unwrap();
        let catalog = loader::load(&path).unwrap();

        assert_eq!(catalog.len(), 2);
        let dune = catalog.resolve("Science Fiction").unwrap();
        assert_eq!(dune.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(catalog.books()[1].author, None);
    }
}
