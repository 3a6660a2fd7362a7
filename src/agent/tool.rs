//! The `recommend_book` tool exposed to the model.
//!
//! The result is a closed variant, [`RecommendOutcome`], serialized to the
//! flat `found/title/author/year/subject/message` object the model reads.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;

use crate::catalog::{Book, Catalog};
use crate::llm::ToolSpec;

pub const TOOL_NAME: &str = "recommend_book";

/// Offered in the not-found hint when the catalog has no genres at all.
pub const FALLBACK_GENRES: &[&str] = &["science_fiction", "mystery", "fantasy", "thriller"];

/// Tool definition handed to the provider.
pub fn spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_NAME.to_string(),
        description: "Recommend a book from the local dataset for the requested genre. \
                      Only return books from the dataset."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "genre": {
                    "type": "string",
                    "description": "Book genre requested by the user, e.g. \"science fiction\""
                }
            },
            "required": ["genre"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecommendArgs {
    pub genre: String,
}

/// Decode the model's raw JSON arguments.
pub fn parse_args(raw: &str) -> Result<RecommendArgs, serde_json::Error> {
    serde_json::from_str(raw)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendOutcome {
    Found(Book),
    NotFound { message: String },
}

impl RecommendOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, RecommendOutcome::Found(_))
    }
}

/// Run the lookup and wrap the result for the model.
pub fn recommend(catalog: &Catalog, genre: &str) -> RecommendOutcome {
    match catalog.resolve(genre) {
        Some(book) => RecommendOutcome::Found(book.clone()),
        None => {
            let known = catalog.genres();
            let hint = if known.is_empty() {
                FALLBACK_GENRES.join(", ")
            } else {
                known.join(", ")
            };
            RecommendOutcome::NotFound {
                message: format!("No books found for genre \"{genre}\". Try one of: {hint}."),
            }
        }
    }
}

#[derive(Serialize)]
struct FlatOutcome<'a> {
    found: bool,
    title: Option<&'a str>,
    author: Option<&'a str>,
    year: Option<i64>,
    subject: Option<&'a str>,
    message: Option<&'a str>,
}

impl Serialize for RecommendOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flat = match self {
            RecommendOutcome::Found(book) => FlatOutcome {
                found: true,
                title: book.title.as_deref(),
                author: book.author.as_deref(),
                year: book.first_publish_year,
                subject: Some(book.subject.as_str()),
                message: None,
            },
            RecommendOutcome::NotFound { message } => FlatOutcome {
                found: false,
                title: None,
                author: None,
                year: None,
                subject: None,
                message: Some(message.as_str()),
            },
        };
        flat.serialize(serializer)
    }
}
