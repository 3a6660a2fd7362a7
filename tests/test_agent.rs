//! End-to-end turns over the shipped sample dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use book_agent::agent::{AgentError, BookAgent};
use book_agent::catalog::{self, loader, Catalog};
use book_agent::llm::providers::dummy::DummyProvider;
use book_agent::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use book_agent::llm::LlmProvider;
use book_agent::shell;

// ── helpers ──────────────────────────────────────────────────────────────────

fn sample_dataset() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/books.json")
}

fn sample_catalog() -> Arc<Catalog> {
    Arc::new(loader::load(&sample_dataset()).expect("sample dataset loads"))
}

fn openai(server: &MockServer) -> LlmProvider {
    let p = OpenAiCompatibleProvider::new(
        server.url("/v1/chat/completions"),
        "gpt-4o-mini".into(),
        0.0,
        5,
        Some("sk-test".into()),
    )
    .unwrap();
    LlmProvider::OpenAiCompatible(p)
}

// ── dataset ──────────────────────────────────────────────────────────────────

#[test]
fn sample_dataset_resolves_every_default_genre() {
    let catalog = sample_catalog();
    assert_eq!(catalog.genres(), vec!["science_fiction", "mystery", "fantasy", "thriller"]);

    let sf = catalog.resolve("  Science   Fiction ").unwrap();
    assert_eq!(sf.title.as_deref(), Some("Dune"));
    assert_eq!(sf.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(catalog::normalize(&sf.subject), "science_fiction");

    assert!(catalog.resolve("romance").is_none());
}

// ── dummy provider ───────────────────────────────────────────────────────────

#[tokio::test]
async fn dummy_shell_session() {
    let prompts = TempDir::new().unwrap();
    let agent = BookAgent::new(LlmProvider::Dummy(DummyProvider), sample_catalog(), prompts.path());

    let script = "Recommend a mystery book\nrecommend a cookbook\nexit\n";
    let mut out = Vec::new();
    shell::run_with(&agent, "Book Recommendation Agent", script.as_bytes(), &mut out, CancellationToken::new())
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("Loaded 5 books."));
    assert!(out.contains("\"title\":\"The Murder of Roger Ackroyd\""));
    assert!(out.contains("No books found for genre \\\"cookbook\\\""));
    assert!(out.contains("Agent closed"));
}

// ── OpenAI-compatible provider ───────────────────────────────────────────────

#[tokio::test]
async fn openai_tool_round_trip() {
    let server = MockServer::start_async().await;

    let select = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions").body_contains("\"tools\"");
            then.status(200).json_body(json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_42",
                            "type": "function",
                            "function": { "name": "recommend_book", "arguments": "{\"genre\":\"Fantasy\"}" }
                        }]
                    }
                }],
                "usage": { "prompt_tokens": 120, "completion_tokens": 15 }
            }));
        })
        .await;

    let narrate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Explain the following tool result")
                .body_contains("The Hobbit");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": "Try The Hobbit by J.R.R. Tolkien (1937)." } }],
                "usage": {
                    "prompt_tokens": 80,
                    "completion_tokens": 12,
                    "prompt_tokens_details": { "cached_tokens": 64 }
                }
            }));
        })
        .await;

    let prompts = TempDir::new().unwrap();
    let agent = BookAgent::new(openai(&server), sample_catalog(), prompts.path());
    let reply = agent.handle_turn("Recommend a fantasy book").await.unwrap();

    select.assert_async().await;
    narrate.assert_async().await;
    assert_eq!(reply, "Try The Hobbit by J.R.R. Tolkien (1937).");

    let usage = agent.session_usage();
    assert_eq!(usage.input_tokens, 200);
    assert_eq!(usage.output_tokens, 27);
    assert_eq!(usage.cached_input_tokens, 64);
}

#[tokio::test]
async fn openai_plain_answer_skips_tool() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": "Which genre would you like?" } }]
            }));
        })
        .await;

    let prompts = TempDir::new().unwrap();
    let agent = BookAgent::new(openai(&server), sample_catalog(), prompts.path());
    let reply = agent.handle_turn("hello").await.unwrap();

    mock.assert_hits_async(1).await;
    assert_eq!(reply, "Which genre would you like?");
}

#[tokio::test]
async fn provider_failure_ends_the_session() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).json_body(json!({ "error": { "message": "upstream exploded" } }));
        })
        .await;

    let prompts = TempDir::new().unwrap();
    let agent = BookAgent::new(openai(&server), sample_catalog(), prompts.path());

    let err = agent.handle_turn("Recommend a thriller").await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(_)));

    let mut out = Vec::new();
    let result = shell::run_with(
        &agent,
        "Book Recommendation Agent",
        "Recommend a thriller\nexit\n".as_bytes(),
        &mut out,
        CancellationToken::new(),
    )
    .await;
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("agent error"));
    assert!(msg.contains("upstream exploded"));
}
