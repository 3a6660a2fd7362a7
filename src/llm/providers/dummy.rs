//! Dummy LLM provider: deterministic and offline.
//!
//! When tools are offered and the last message is from the user, it calls the
//! first tool with a `genre` guessed from the user text. Otherwise it echoes
//! the last message back prefixed with `[echo]`. Used by tests and for
//! trying the shell without an API key.

use serde_json::json;

use crate::llm::{ChatMessage, ChatReply, ProviderError, Role, ToolCall, ToolSpec};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatReply, ProviderError> {
        let last = messages
            .last()
            .ok_or_else(|| ProviderError::Request("no messages to answer".into()))?;

        if let (Some(tool), Role::User) = (tools.first(), last.role) {
            let arguments = json!({ "genre": guess_genre(&last.content) }).to_string();
            return Ok(ChatReply {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "call_dummy_0".into(),
                    name: tool.name.clone(),
                    arguments,
                }],
                usage: None,
            });
        }

        Ok(ChatReply {
            text: Some(format!("[echo] {}", last.content)),
            tool_calls: Vec::new(),
            usage: None,
        })
    }
}

/// "Recommend a fantasy book" → "fantasy".
fn guess_genre(text: &str) -> String {
    let mut s = text.trim().trim_end_matches(['.', '!', '?']).to_lowercase();
    for prefix in ["recommend me an ", "recommend me a ", "recommend an ", "recommend a ", "recommend "] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }
    for suffix in [" books", " book", " novel"] {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest.to_string();
            break;
        }
    }
    s.trim().to_string()
}
