//! Chat and agent streaming endpoints.
//!
//! - `POST /chat`             — plain chat, SSE of raw text chunks
//! - `POST /v1/agent/stream`  — agent run, SSE of agent events
//! - `POST /v2/assistant`     — chat or agent run, Vercel AI data stream

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use stepwise_agent::ChatEvent;
use stepwise_core::message::Message;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::SharedState;
use crate::data_stream;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
}

fn bad_request(detail: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

// ── /chat ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

fn to_message(role: &str, content: String) -> Message {
    match role {
        "assistant" => Message::assistant(content),
        "system" => Message::system(content),
        _ => Message::user(content),
    }
}

/// `POST /chat` — each chunk is one SSE data line; a failure is reported as
/// `{"error": "..."}`.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!(messages = payload.messages.len(), "chat request");
    let messages = payload
        .messages
        .into_iter()
        .map(|m| to_message(&m.role, m.content))
        .collect();

    let rx = state.chat().stream(messages);
    let stream = ReceiverStream::new(rx).filter_map(|event| match event {
        ChatEvent::Delta { text } => Some(Ok(SseEvent::default().data(text))),
        ChatEvent::Failed { message } => Some(Ok(SseEvent::default()
            .data(serde_json::json!({ "error": message }).to_string()))),
        ChatEvent::Done { .. } => None,
    });
    Sse::new(stream)
}

// ── /v1/agent/stream ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AgentRunRequest {
    pub prompt: String,
    #[serde(default)]
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub enabled_tools: Option<Vec<String>>,
}

/// `POST /v1/agent/stream` — SSE event names are the agent event types.
pub async fn agent_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<AgentRunRequest>,
) -> Result<
    Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    if payload.prompt.trim().is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }
    info!(max_steps = ?payload.max_steps, "agent stream request");

    let mut agent = state.agent(payload.enabled_tools.as_deref());
    if let Some(max) = payload.max_steps {
        agent = agent.with_max_steps(max);
    }

    let rx = agent.run_stream(payload.prompt);
    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type().to_string();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream))
}

// ── /v2/assistant ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl AssistantMessage {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.kind == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[derive(Deserialize)]
pub struct AssistantRequest {
    pub messages: Vec<AssistantMessage>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
}

fn default_mode() -> String {
    "standard".into()
}

/// The last non-empty user text.
fn latest_user_prompt(messages: &[AssistantMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == "user")
        .map(AssistantMessage::text)
        .find(|t| !t.is_empty())
}

/// `POST /v2/assistant` — agent mode runs the loop over the enabled tools;
/// standard mode, or agent mode with no usable tools, streams plain chat.
pub async fn assistant_handler(
    State(state): State<SharedState>,
    Json(payload): Json<AssistantRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    info!(
        mode = %payload.mode,
        tools = ?payload.enabled_tools,
        messages = payload.messages.len(),
        "assistant request"
    );

    let agent = state.agent(Some(payload.enabled_tools.as_slice()));
    let frames = if payload.mode == "agent" && !agent.tools().is_empty() {
        let prompt = latest_user_prompt(&payload.messages)
            .ok_or_else(|| bad_request("no user message with text content"))?;
        data_stream::agent_stream(agent.run_stream(prompt))
    } else {
        let messages = payload
            .messages
            .iter()
            .filter(|m| m.role == "user" || m.role == "assistant")
            .map(|m| to_message(&m.role, m.text()))
            .collect();
        data_stream::chat_stream(state.chat().stream(messages))
    };

    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (
                header::HeaderName::from_static(data_stream::HEADER_NAME),
                data_stream::HEADER_VALUE,
            ),
        ],
        body,
    )
        .into_response())
}
