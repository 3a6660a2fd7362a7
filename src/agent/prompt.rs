//! Layered prompt builder.
//!
//! Prompts are assembled from plain-text fragments under `config/prompts/`.
//! Each layer is appended in order; a missing file falls back to built-in
//! text so the agent still works when run outside the repository.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR: &str = "\n\n";

pub const AGENT_LAYER: &str = "agent.md";
pub const NARRATE_LAYER: &str = "narrate.md";

const DEFAULT_AGENT_PROMPT: &str = "You are a Book Recommendation Agent. \
You MUST call the recommend_book tool to select a book. \
Known genres: {{genres}}. \
Only describe books returned by the tool. \
Keep the response short and helpful.";

const DEFAULT_NARRATE_PROMPT: &str = "Explain the following tool result to the user in a clear, \
friendly sentence. If found is false, explain that no books are available for that genre \
and suggest the listed alternatives.";

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append `filename` from the prompts directory, or `fallback` when the
    /// file is missing or empty.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("prompt: layer '{}' not found: using built-in", path.display());
                fallback.to_string()
            }
        };
        self.append(text)
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers with blank lines and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

/// System prompt for the tool-selection call.
pub fn system_prompt(prompts_dir: impl AsRef<Path>, genres: &[String]) -> String {
    let genres = if genres.is_empty() {
        "none".to_string()
    } else {
        genres.join(", ")
    };
    PromptBuilder::new(prompts_dir.as_ref())
        .layer_or(AGENT_LAYER, DEFAULT_AGENT_PROMPT)
        .var("genres", genres)
        .build()
}

/// System prompt for the narration call.
pub fn narration_prompt(prompts_dir: impl AsRef<Path>) -> String {
    PromptBuilder::new(prompts_dir.as_ref())
        .layer_or(NARRATE_LAYER, DEFAULT_NARRATE_PROMPT)
        .build()
}
