//! The streaming ReAct agent.
//!
//! A run repeats one step until it has an answer:
//!
//! 1. **Think**: stream a model response, emitting its narrative while
//!    suppressing any embedded action block
//! 2. **Decide**: extract the action block from the full response, or ask the
//!    final-answer policy whether the response ends the run
//! 3. **Act**: validate and run the requested tool, streaming its output
//! 4. **Record**: commit the step to the scratchpad the next prompt shows
//!
//! Tool and parse failures are recoverable and are reported as `error`
//! events. Provider failures end the run with `run_failed`. Every other run
//! ends with exactly one `final_answer`, bounded by the step budget.

pub mod chat;
pub mod classifier;
pub mod directive;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod heuristic;
pub mod prompt;
pub mod runner;
pub mod scratchpad;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chat::{ChatEvent, DirectChat};
pub use classifier::NarrativeFilter;
pub use directive::{Directive, Extraction, ParseError};
pub use emitter::EventEmitter;
pub use error::StepError;
pub use heuristic::{FinalAnswerPolicy, LexicalPolicy, Verdict};
pub use runner::{MAX_STEPS_ANSWER, Phase, ReactAgent, RunOutcome, Termination};
pub use scratchpad::Scratchpad;
pub use stream_event::{AgentEvent, ExecutionStep};
