//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! All OpenAI wire types are private to this module: callers only see
//! [`ChatMessage`], [`ToolSpec`] and [`ChatReply`]. The provider is
//! stateless; one `chat` call is one HTTP round trip.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, ChatReply, LlmUsage, ProviderError, Role, ToolCall, ToolSpec};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Covers OpenAI and compatible servers (Ollama, LM Studio…). Constructed
/// once at startup, then cheaply cloned because `reqwest::Client` is an
/// `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// When `api_key` is present it is sent as `Authorization: Bearer <key>`.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatReply, ProviderError> {
        let payload = self.request(messages, tools);

        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");

        let usage = parsed.usage.map(|u| LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            cached_input_tokens: u.prompt_tokens_details.map(|d| d.cached_tokens).unwrap_or(0),
        });
        if let Some(u) = &usage {
            debug!(
                input_tokens = u.input_tokens,
                output_tokens = u.output_tokens,
                cached_tokens = u.cached_input_tokens,
                "llm usage"
            );
        }

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::Request("response contained no choices".into()))?;

        let text = message
            .content
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let tool_calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall { id: c.id, name: c.function.name, arguments: c.function.arguments })
            .collect();

        if text.is_none() && tool_calls.is_empty() {
            return Err(ProviderError::Request("empty or missing content in response".into()));
        }

        Ok(ChatReply { text, tool_calls, usage })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        tools: &'a [ToolSpec],
    ) -> ChatCompletionRequest<'a> {
        // The gpt-5 family rejects a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") {
            None
        } else {
            Some(self.temperature)
        };

        ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage { role: m.role, content: &m.content })
                .collect(),
            tools: tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireFunctionSpec {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            temperature,
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Pass a successful response through, or turn the body into an error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer, model: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            server.url("/v1/chat/completions"),
            model.into(),
            0.2,
            5,
            Some("sk-test".into()),
        )
        .unwrap()
    }

    fn genre_tool() -> ToolSpec {
        ToolSpec {
            name: "recommend_book".into(),
            description: "pick a book".into(),
            parameters: json!({ "type": "object", "properties": { "genre": { "type": "string" } } }),
        }
    }

    #[tokio::test]
    async fn parses_tool_call_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_contains("\"recommend_book\"")
                    .body_contains("\"temperature\"");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": { "name": "recommend_book", "arguments": "{\"genre\":\"fantasy\"}" }
                            }]
                        }
                    }],
                    "usage": { "prompt_tokens": 40, "completion_tokens": 8 }
                }));
            })
            .await;

        let reply = provider(&server, "gpt-4o-mini")
            .chat(&[ChatMessage::user("a fantasy book please")], &[genre_tool()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.text, None);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].id, "call_1");
        assert_eq!(reply.tool_calls[0].arguments, r#"{"genre":"fantasy"}"#);
        assert_eq!(reply.usage.unwrap().input_tokens, 40);
    }

    #[tokio::test]
    async fn parses_text_reply() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions").body_contains("\"gpt-5\"");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "  Try Dune by Frank Herbert.  ", "tool_calls": null } }]
                }));
            })
            .await;

        let reply = provider(&server, "gpt-5")
            .chat(&[ChatMessage::system("narrate"), ChatMessage::user("{}")], &[])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.text.as_deref(), Some("Try Dune by Frank Herbert."));
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.usage, None);
    }

    #[test]
    fn request_omits_temperature_for_gpt5() {
        let p = OpenAiCompatibleProvider::new("http://localhost:0".into(), "gpt-5".into(), 0.7, 1, None)
            .unwrap();
        let messages = [ChatMessage::user("hi")];
        let body = serde_json::to_value(p.request(&messages, &[])).unwrap();
        assert_eq!(body["model"], "gpt-5");
        assert!(body.get("temperature").is_none());
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0], json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn request_carries_tools_as_functions() {
        let p = OpenAiCompatibleProvider::new("http://localhost:0".into(), "gpt-4o-mini".into(), 0.5, 1, None)
            .unwrap();
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let tools = [genre_tool()];
        let body = serde_json::to_value(p.request(&messages, &tools)).unwrap();
        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "recommend_book");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[tokio::test]
    async fn decodes_error_envelope() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).json_body(json!({
                    "error": { "message": "Incorrect API key provided", "code": "invalid_api_key" }
                }));
            })
            .await;

        let err = provider(&server, "gpt-4o-mini")
            .chat(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("401"));
        assert!(err.contains("[code=invalid_api_key]"));
        assert!(err.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn plain_error_body_is_kept() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = provider(&server, "gpt-4o-mini")
            .chat(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("502"));
        assert!(err.contains("bad gateway"));
    }

    #[tokio::test]
    async fn empty_message_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "   " } }]
                }));
            })
            .await;

        let err = provider(&server, "gpt-4o-mini")
            .chat(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty or missing content"));
    }
}
