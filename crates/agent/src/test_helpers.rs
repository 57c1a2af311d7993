//! Shared test helpers for agent tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stepwise_core::error::{ProviderError, ToolError};
use stepwise_core::message::Message;
use stepwise_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};
use stepwise_core::tool::{Tool, ToolRegistry, ToolResult, ToolView};
use tokio::sync::mpsc;

/// One scripted provider call.
pub enum Turn {
    /// Stream these fragments, then finish.
    Fragments(Vec<String>),
    /// Refuse the call outright.
    Fail(ProviderError),
    /// Stream some fragments, then break the stream.
    Interrupt(Vec<String>, ProviderError),
}

/// A mock provider that streams a sequence of scripted responses.
///
/// Each call to `stream` consumes the next turn. Panics if more calls are
/// made than turns provided.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Each response is streamed in `width`-char fragments.
    pub fn chunked(responses: &[&str], width: usize) -> Self {
        Self::new(
            responses
                .iter()
                .map(|r| Turn::Fragments(fragments(r, width)))
                .collect(),
        )
    }

    /// Each response is streamed in 3-char fragments.
    pub fn texts(responses: &[&str]) -> Self {
        Self::chunked(responses, 3)
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_turn(&self, request: ProviderRequest) -> Turn {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        let call = requests.len();
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no more turns (call #{call})"))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        match self.next_turn(request) {
            Turn::Fragments(parts) => Ok(ProviderResponse {
                message: Message::assistant(parts.concat()),
                usage: None,
                model,
            }),
            Turn::Fail(err) | Turn::Interrupt(_, err) => Err(err),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (parts, tail) = match self.next_turn(request) {
            Turn::Fragments(parts) => (parts, Ok(StreamChunk::done(None))),
            Turn::Fail(err) => return Err(err),
            Turn::Interrupt(parts, err) => (parts, Err(err)),
        };
        let (tx, rx) = mpsc::channel(parts.len() + 1);
        for part in parts {
            let _ = tx.send(Ok(StreamChunk::text(part))).await;
        }
        let _ = tx.send(tail).await;
        Ok(rx)
    }
}

/// Split `text` into fragments of `width` chars.
pub fn fragments(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// A response that asks for `tool` with `input`.
pub fn action(thought: &str, tool: &str, input: Value) -> String {
    format!(
        "{thought}\n```json\n{}\n```",
        json!({"tool_name": tool, "tool_input": input})
    )
}

/// Echoes its `text` argument; counts invocations.
#[derive(Default)]
pub struct EchoTool {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
            "additionalProperties": false
        })
    }
    fn summarize(&self, arguments: &Value) -> String {
        format!("Echoing {}", arguments["text"])
    }
    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::ok(arguments["text"].as_str().unwrap_or("")))
    }
}

/// Always raises; counts invocations.
#[derive(Default)]
pub struct FailingTool {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }
    fn description(&self) -> &str {
        "Fails every time"
    }
    fn parameters_schema(&self) -> Value {
        Value::Null
    }
    async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "boom".into(),
        })
    }
}

/// Reports failure through its result instead of an error.
pub struct RefusingTool;

#[async_trait]
impl Tool for RefusingTool {
    fn name(&self) -> &str {
        "refuse"
    }
    fn description(&self) -> &str {
        "Returns an unsuccessful result"
    }
    fn parameters_schema(&self) -> Value {
        Value::Null
    }
    async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::failed("quota exceeded"))
    }
}

/// A view with echo, flaky and refuse; returns the invocation counters.
pub fn tool_view() -> (ToolView, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let echo = EchoTool::default();
    let flaky = FailingTool::default();
    let echo_calls = Arc::clone(&echo.calls);
    let flaky_calls = Arc::clone(&flaky.calls);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(echo));
    registry.register(Box::new(flaky));
    registry.register(Box::new(RefusingTool));
    (registry.view(), echo_calls, flaky_calls)
}

/// Drain every event from a run's receiver.
pub async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Some(item) = rx.recv().await {
        out.push(item);
    }
    out
}

/// Streams one fragment, then never finishes.
#[derive(Default)]
pub struct StallingProvider {
    held: Mutex<Vec<mpsc::Sender<Result<StreamChunk, ProviderError>>>>,
}

#[async_trait]
impl Provider for StallingProvider {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (tx, rx) = mpsc::channel(4);
        let _ = tx.send(Ok(StreamChunk::text("Hmm"))).await;
        self.held.lock().unwrap().push(tx);
        Ok(rx)
    }
}
