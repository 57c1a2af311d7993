//! Agent-level streaming events.
//!
//! `AgentEvent` is the single ordered stream a run produces. The gateway
//! forwards it to clients over SSE, either as-is or through the data stream
//! framing.

use serde::{Deserialize, Serialize};

/// Events emitted by the agent during a run.
///
/// Every run ends with exactly one `final_answer`, or with `run_failed`
/// when the provider itself fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A new reasoning step begins (1-based).
    ThoughtStart { step: usize },

    /// Narrative text from the model, action blocks removed.
    ThoughtChunk { text: String },

    ThoughtComplete,

    /// A tool is about to be invoked.
    ActionStart { tool_name: String, summary: String },

    /// Progress detail for the pending tool call.
    ActionProgress { text: String },

    ObservationStart,

    /// A piece of the tool's output.
    ObservationChunk { text: String },

    ObservationComplete,

    /// A recoverable step error. The run continues.
    Error { message: String },

    /// The run's answer. Always the last event of a successful run.
    FinalAnswer { text: String },

    /// The provider failed and the run was aborted.
    RunFailed { message: String },
}

impl AgentEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ThoughtStart { .. } => "thought_start",
            Self::ThoughtChunk { .. } => "thought_chunk",
            Self::ThoughtComplete => "thought_complete",
            Self::ActionStart { .. } => "action_start",
            Self::ActionProgress { .. } => "action_progress",
            Self::ObservationStart => "observation_start",
            Self::ObservationChunk { .. } => "observation_chunk",
            Self::ObservationComplete => "observation_complete",
            Self::Error { .. } => "error",
            Self::FinalAnswer { .. } => "final_answer",
            Self::RunFailed { .. } => "run_failed",
        }
    }

    /// True for the events that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. } | Self::RunFailed { .. })
    }
}

/// One entry of a run's execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum ExecutionStep {
    Thought {
        text: String,
    },
    Action {
        tool_name: String,
        tool_input: serde_json::Value,
    },
    Observation {
        text: String,
    },
    Error {
        message: String,
    },
    FinalAnswer {
        text: String,
    },
}
