//! Book catalog and genre resolution.
//!
//! The catalog is loaded once at startup and never changes afterwards.
//! [`resolve`] is the only lookup: a linear scan that compares normalized
//! subjects against a normalized genre query and keeps the first hit.

pub mod fetch;
pub mod loader;

use serde::{Deserialize, Serialize};

/// One book from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: Option<String>,
    pub author: Option<String>,
    pub first_publish_year: Option<i64>,
    /// Genre label as stored in the dataset. Never rewritten.
    pub subject: String,
}

/// Canonical form of a genre string: trimmed, lowercased, with every
/// whitespace run collapsed into a single `_`. U+FEFF counts as whitespace.
pub fn normalize(text: &str) -> String {
    text.split(is_separator)
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

/// Return the first book (in dataset order) whose normalized subject equals
/// the normalized `genre`, or `None`.
pub fn resolve<'a>(books: &'a [Book], genre: &str) -> Option<&'a Book> {
    let key = normalize(genre);
    books.iter().find(|b| normalize(&b.subject) == key)
}

/// The immutable, ordered record collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// See [`resolve`].
    pub fn resolve(&self, genre: &str) -> Option<&Book> {
        resolve(&self.books, genre)
    }

    /// Distinct normalized subjects in first-seen order.
    pub fn genres(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for book in &self.books {
            let key = normalize(&book.subject);
            if !key.is_empty() && !seen.contains(&key) {
                seen.push(key);
            }
        }
        seen
    }
}
