//! Book recommendation agent: one user turn at a time.
//!
//! A turn is at most two model calls: the first offers the `recommend_book`
//! tool; if the model calls it, the catalog lookup runs locally and a second
//! call narrates the flat JSON result. A plain-text first reply is returned
//! as-is.

pub mod prompt;
pub mod tool;

use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::llm::{ChatMessage, ChatReply, LlmProvider, LlmUsage, ProviderError, ToolCall, ToolSpec};
use tool::RecommendOutcome;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid arguments for {tool}: {reason}")]
    ToolArguments { tool: String, reason: String },

    #[error("model called unknown tool: {0}")]
    UnknownTool(String),

    #[error("model returned no text")]
    EmptyReply,

    #[error("failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct BookAgent {
    provider: LlmProvider,
    catalog: Arc<Catalog>,
    tools: Vec<ToolSpec>,
    system_prompt: String,
    narration_prompt: String,
    /// Token counts summed over every model call this session.
    session_usage: Mutex<LlmUsage>,
}

impl BookAgent {
    pub fn new(provider: LlmProvider, catalog: Arc<Catalog>, prompts_dir: &Path) -> Self {
        let system_prompt = prompt::system_prompt(prompts_dir, &catalog.genres());
        let narration_prompt = prompt::narration_prompt(prompts_dir);
        Self {
            provider,
            catalog,
            tools: vec![tool::spec()],
            system_prompt,
            narration_prompt,
            session_usage: Mutex::new(LlmUsage::default()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Usage totals across all turns so far. Providers that report no usage
    /// contribute nothing.
    pub fn session_usage(&self) -> LlmUsage {
        match self.session_usage.lock() {
            Ok(total) => *total,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Process one user line to completion and return the reply text.
    pub async fn handle_turn(&self, user_text: &str) -> Result<String, AgentError> {
        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(user_text),
        ];
        let reply = self.chat(&messages, &self.tools).await?;

        let Some(call) = reply.tool_calls.first() else {
            debug!("model answered without a tool call");
            return reply.text.ok_or(AgentError::EmptyReply);
        };
        if reply.tool_calls.len() > 1 {
            warn!(calls = reply.tool_calls.len(), "model requested several tool calls; running the first");
        }

        let outcome = self.run_tool(call)?;
        self.narrate(&outcome).await
    }

    fn run_tool(&self, call: &ToolCall) -> Result<RecommendOutcome, AgentError> {
        if call.name != tool::TOOL_NAME {
            return Err(AgentError::UnknownTool(call.name.clone()));
        }
        let args = tool::parse_args(&call.arguments).map_err(|e| AgentError::ToolArguments {
            tool: call.name.clone(),
            reason: e.to_string(),
        })?;

        let outcome = tool::recommend(&self.catalog, &args.genre);
        info!(
            call_id = %call.id,
            genre = %args.genre,
            found = outcome.is_found(),
            "recommend_book executed"
        );
        Ok(outcome)
    }

    async fn narrate(&self, outcome: &RecommendOutcome) -> Result<String, AgentError> {
        let payload = serde_json::to_string(outcome)?;
        let messages = [
            ChatMessage::system(self.narration_prompt.as_str()),
            ChatMessage::user(payload),
        ];
        let reply = self.chat(&messages, &[]).await?;
        reply.text.ok_or(AgentError::EmptyReply)
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatReply, AgentError> {
        let reply = self.provider.chat(messages, tools).await?;
        if let Some(usage) = &reply.usage {
            let mut total = match self.session_usage.lock() {
                Ok(total) => total,
                Err(poisoned) => poisoned.into_inner(),
            };
            total.add(usage);
        }
        Ok(reply)
    }
}
