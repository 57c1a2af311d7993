//! Plain streaming chat, without the reasoning loop.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stepwise_core::error::Result;
use stepwise_core::message::Message;
use stepwise_core::provider::{Provider, ProviderRequest, Usage};
use tokio::sync::mpsc;
use tracing::warn;

/// Events from a direct chat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Delta { text: String },
    Done { usage: Option<Usage> },
    Failed { message: String },
}

/// Forwards a conversation to the provider and streams the reply.
#[derive(Clone)]
pub struct DirectChat {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl DirectChat {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest::new(self.model.clone(), messages).with_temperature(self.temperature)
    }

    /// Complete reply in one piece.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let response = self.provider.complete(self.request(messages)).await?;
        Ok(response.message.content)
    }

    /// Stream the reply. Ends with exactly one `done` or `failed`.
    pub fn stream(&self, messages: Vec<Message>) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(64);
        let provider = Arc::clone(&self.provider);
        let request = self.request(messages).streaming();

        tokio::spawn(async move {
            let mut chunks = match provider.stream(request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(error = %e, "Chat stream failed to start");
                    let _ = tx.send(ChatEvent::Failed { message: e.to_string() }).await;
                    return;
                }
            };

            let mut usage = None;
            while let Some(chunk) = chunks.recv().await {
                match chunk {
                    Ok(chunk) => {
                        if let Some(text) = chunk.content
                            && !text.is_empty()
                            && tx.send(ChatEvent::Delta { text }).await.is_err()
                        {
                            return;
                        }
                        if chunk.usage.is_some() {
                            usage = chunk.usage;
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Chat stream interrupted");
                        let _ = tx.send(ChatEvent::Failed { message: e.to_string() }).await;
                        return;
                    }
                }
            }
            let _ = tx.send(ChatEvent::Done { usage }).await;
        });

        rx
    }
}
