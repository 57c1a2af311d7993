//! Vercel AI data stream framing for `/v2/assistant`.
//!
//! Each line is `<code>:<json>\n`: `0` carries text, `2` an array of data
//! values, `3` an error string and `d` the finish message. Agent events go
//! out twice: raw as a data part, and rendered to markdown as a text part so
//! plain chat UIs can show the reasoning.

use serde_json::{Value, json};
use stepwise_agent::{AgentEvent, ChatEvent};
use stepwise_core::provider::Usage;
use tokio::sync::mpsc;

pub const HEADER_NAME: &str = "x-vercel-ai-data-stream";
pub const HEADER_VALUE: &str = "v1";

pub fn text_part(text: &str) -> String {
    format!("0:{}\n", Value::String(text.to_string()))
}

pub fn data_part(value: Value) -> String {
    format!("2:{}\n", Value::Array(vec![value]))
}

pub fn error_part(message: &str) -> String {
    format!("3:{}\n", Value::String(message.to_string()))
}

pub fn finish_part(usage: Option<&Usage>) -> String {
    let (prompt, completion) = usage.map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));
    let finish = json!({
        "finishReason": "stop",
        "usage": { "promptTokens": prompt, "completionTokens": completion },
    });
    format!("d:{finish}\n")
}

/// Markdown for one agent event, if it has a visible form.
pub fn render_markdown(event: &AgentEvent) -> Option<String> {
    let text = match event {
        AgentEvent::ThoughtStart { .. } => "🤔 **Thinking:**\n".to_string(),
        AgentEvent::ThoughtChunk { text } | AgentEvent::ObservationChunk { text } => {
            if text.is_empty() {
                return None;
            }
            text.clone()
        }
        AgentEvent::ThoughtComplete | AgentEvent::ObservationComplete => "\n\n".to_string(),
        AgentEvent::ActionStart { tool_name, summary } => {
            format!("🔧 **Action:** Using tool `{tool_name}`\n{summary}\n")
        }
        AgentEvent::ActionProgress { text } => match text.strip_prefix("Input: ") {
            Some(input) => format!("*Input:* {input}\n\n"),
            None => format!("{text}\n\n"),
        },
        AgentEvent::ObservationStart => "📝 **Observation:**\n".to_string(),
        AgentEvent::Error { message } => format!("❌ **Error:**\n{message}\n\n"),
        AgentEvent::FinalAnswer { text } => format!("✅ **Final Answer:**\n{text}"),
        AgentEvent::RunFailed { .. } => return None,
    };
    Some(text)
}

/// Frames for one agent event, in send order.
pub fn frame_agent_event(event: &AgentEvent) -> Vec<String> {
    if let AgentEvent::RunFailed { message } = event {
        return vec![error_part(message)];
    }
    let mut frames = vec![data_part(
        serde_json::to_value(event).unwrap_or_default(),
    )];
    if let Some(text) = render_markdown(event) {
        frames.push(text_part(&text));
    }
    frames
}

/// Reframe a run's events. Ends with a finish part, or with an error part
/// when the run failed.
pub fn agent_stream(mut events: mpsc::Receiver<AgentEvent>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let failed = matches!(event, AgentEvent::RunFailed { .. });
            for frame in frame_agent_event(&event) {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            if failed {
                return;
            }
        }
        let _ = tx.send(finish_part(None)).await;
    });
    rx
}

/// Reframe a direct chat stream.
pub fn chat_stream(mut events: mpsc::Receiver<ChatEvent>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let frame = match event {
                ChatEvent::Delta { text } => text_part(&text),
                ChatEvent::Done { usage } => finish_part(usage.as_ref()),
                ChatEvent::Failed { message } => error_part(&message),
            };
            if tx.send(frame).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(frame) = rx.recv().await {
            out.push(frame);
        }
        out
    }

    #[test]
    fn part_framing() {
        assert_eq!(text_part("hi \"there\""), "0:\"hi \\\"there\\\"\"\n");
        assert_eq!(data_part(json!({"a": 1})), "2:[{\"a\":1}]\n");
        assert_eq!(error_part("boom"), "3:\"boom\"\n");

        let finish = finish_part(None);
        let body: Value = serde_json::from_str(finish["d:".len()..].trim_end()).unwrap();
        assert_eq!(
            body,
            json!({"finishReason": "stop", "usage": {"promptTokens": 0, "completionTokens": 0}})
        );
        assert!(finish.ends_with('\n'));
    }

    #[test]
    fn finish_part_carries_usage() {
        let usage = Usage {
            prompt_tokens: 12,
            completion_tokens: 7,
            total_tokens: 19,
        };
        let frame = finish_part(Some(&usage));
        assert!(frame.contains("\"promptTokens\":12"));
        assert!(frame.contains("\"completionTokens\":7"));
    }

    #[test]
    fn markdown_rendering() {
        assert_eq!(
            render_markdown(&AgentEvent::ActionProgress {
                text: "Input: {\"q\":1}".into()
            }),
            Some("*Input:* {\"q\":1}\n\n".into())
        );
        assert_eq!(
            render_markdown(&AgentEvent::FinalAnswer { text: "42".into() }),
            Some("✅ **Final Answer:**\n42".into())
        );
        assert_eq!(
            render_markdown(&AgentEvent::ThoughtChunk { text: String::new() }),
            None
        );
    }

    #[test]
    fn events_become_data_then_text() {
        let frames = frame_agent_event(&AgentEvent::ObservationChunk {
            text: "result".into(),
        });
        assert_eq!(frames.len(), 2);
        let data: Value = serde_json::from_str(frames[0]["2:".len()..].trim_end()).unwrap();
        assert_eq!(data, json!([{"type": "observation_chunk", "text": "result"}]));
        assert_eq!(frames[1], "0:\"result\"\n");
    }

    #[tokio::test]
    async fn agent_stream_ends_with_finish() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(AgentEvent::ThoughtStart { step: 1 }).await.unwrap();
        tx.send(AgentEvent::FinalAnswer { text: "ok".into() })
            .await
            .unwrap();
        drop(tx);

        let frames = drain(agent_stream(rx)).await;
        assert!(frames.last().unwrap().starts_with("d:"));
        assert!(frames.contains(&text_part("✅ **Final Answer:**\nok")));
    }

    #[tokio::test]
    async fn failed_run_ends_with_error_part() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(AgentEvent::ThoughtStart { step: 1 }).await.unwrap();
        tx.send(AgentEvent::RunFailed {
            message: "bad key".into(),
        })
        .await
        .unwrap();
        drop(tx);

        let frames = drain(agent_stream(rx)).await;
        assert_eq!(frames.last().unwrap(), "3:\"bad key\"\n");
        assert!(!frames.iter().any(|f| f.starts_with("d:")));
    }

    #[tokio::test]
    async fn chat_stream_framing() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ChatEvent::Delta { text: "Hel".into() }).await.unwrap();
        tx.send(ChatEvent::Delta { text: "lo".into() }).await.unwrap();
        tx.send(ChatEvent::Done { usage: None }).await.unwrap();
        drop(tx);

        let frames = drain(chat_stream(rx)).await;
        assert_eq!(frames[..2], ["0:\"Hel\"\n", "0:\"lo\"\n"]);
        assert!(frames[2].starts_with("d:"));
    }
}
