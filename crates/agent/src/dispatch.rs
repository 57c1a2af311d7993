//! Resolving and running one tool call.

use serde_json::Value;
use stepwise_core::error::ToolError;
use stepwise_core::tool::ToolView;
use tracing::{debug, warn};

use crate::directive::Directive;
use crate::emitter::{EventEmitter, ReceiverClosed};
use crate::error::StepError;
use crate::stream_event::AgentEvent;

/// What a dispatched call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Observation(String),
    Failed(StepError),
}

/// Runs directives against a fixed set of tools.
///
/// Event order for a successful call is `action_start`, `action_progress`,
/// `observation_start`, any number of `observation_chunk`, then
/// `observation_complete`. A failed call stops at `error` and the tool is
/// invoked at most once either way.
pub struct Dispatcher<'a> {
    tools: &'a ToolView,
    chunk_chars: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn new(tools: &'a ToolView, chunk_chars: usize) -> Self {
        Self {
            tools,
            chunk_chars: chunk_chars.max(1),
        }
    }

    pub async fn dispatch(
        &self,
        directive: &Directive,
        emitter: &EventEmitter,
    ) -> Result<Outcome, ReceiverClosed> {
        let name = directive.tool_name.as_str();

        let Some(tool) = self.tools.lookup(name) else {
            warn!(tool = name, "Model requested an unknown tool");
            let err = StepError::UnknownTool {
                name: name.to_string(),
                available: self.tools.names().iter().map(|s| s.to_string()).collect(),
            };
            return fail(err, emitter).await;
        };

        let arguments = Value::Object(directive.tool_input.clone());
        emitter
            .emit(AgentEvent::ActionStart {
                tool_name: name.to_string(),
                summary: tool.summarize(&arguments),
            })
            .await?;

        if let Err(e) = tool.validate(&arguments) {
            let reason = match e {
                ToolError::InvalidArguments(reason) => reason,
                other => other.to_string(),
            };
            return fail(
                StepError::InvalidInput {
                    tool_name: name.to_string(),
                    reason,
                },
                emitter,
            )
            .await;
        }

        emitter
            .emit(AgentEvent::ActionProgress {
                text: format!("Input: {arguments}"),
            })
            .await?;

        debug!(tool = name, "Executing tool");
        let output = match tool.execute(arguments).await {
            Ok(result) if result.success => result.output,
            Ok(result) => return fail(execution_error(name, result.output), emitter).await,
            Err(e) => {
                let message = match e {
                    ToolError::ExecutionFailed { reason, .. } => reason,
                    other => other.to_string(),
                };
                return fail(execution_error(name, message), emitter).await;
            }
        };

        emitter.emit(AgentEvent::ObservationStart).await?;
        for piece in chunk_chars(&output, self.chunk_chars) {
            emitter
                .emit(AgentEvent::ObservationChunk {
                    text: piece.to_string(),
                })
                .await?;
        }
        emitter.emit(AgentEvent::ObservationComplete).await?;

        Ok(Outcome::Observation(output))
    }
}

fn execution_error(tool_name: &str, message: String) -> StepError {
    StepError::ToolExecution {
        tool_name: tool_name.to_string(),
        message,
    }
}

async fn fail(err: StepError, emitter: &EventEmitter) -> Result<Outcome, ReceiverClosed> {
    warn!(error = %err, "Tool call failed");
    emitter
        .emit(AgentEvent::Error {
            message: err.to_string(),
        })
        .await?;
    Ok(Outcome::Failed(err))
}

/// Split `text` into pieces of at most `max` chars, on char boundaries.
pub fn chunk_chars(text: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max {
            pieces.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
