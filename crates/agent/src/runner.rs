//! The step state machine: think, decide, act, observe, repeat.
//!
//! Each step streams one model response through the [`NarrativeFilter`],
//! then inspects the full text. An action block dispatches a tool; no block
//! asks the [`FinalAnswerPolicy`] whether the run is done. Step errors are
//! recorded and the loop continues. Only provider failures end a run early.
//!
//! A step's scratchpad entries are committed when the step completes, so a
//! cancelled run never leaves half a step behind.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use stepwise_config::AgentConfig;
use stepwise_core::error::{Error, ProviderError, Result};
use stepwise_core::provider::{Provider, ProviderRequest};
use stepwise_core::tool::ToolView;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::classifier::NarrativeFilter;
use crate::directive::{self, Directive};
use crate::dispatch::{Dispatcher, Outcome};
use crate::emitter::{EventEmitter, ReceiverClosed};
use crate::error::StepError;
use crate::heuristic::{FinalAnswerPolicy, LexicalPolicy, Verdict, clean_answer};
use crate::prompt;
use crate::scratchpad::{Entry, Scratchpad, StepDraft};
use crate::stream_event::{AgentEvent, ExecutionStep};

/// Answer given when the step budget runs out.
pub const MAX_STEPS_ANSWER: &str = "Agent stopped after reaching max steps.";

const EVENT_BUFFER: usize = 64;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Thinking,
    Deciding,
    Acting,
    Observing,
    Continuing,
    Terminated,
}

impl Phase {
    /// Whether `next` may follow `self`.
    pub fn can_enter(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Thinking)
                | (Idle, Terminated)
                | (Thinking, Deciding)
                | (Deciding, Acting)
                | (Deciding, Continuing)
                | (Deciding, Terminated)
                | (Acting, Observing)
                | (Acting, Continuing)
                | (Observing, Continuing)
                | (Continuing, Thinking)
                | (Continuing, Terminated)
        )
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    FinalAnswer,
    MaxStepsExceeded,
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub final_answer: String,
    pub termination: Termination,
    /// Reasoning steps taken.
    pub steps: usize,
    pub trace: Vec<ExecutionStep>,
}

enum Halt {
    Provider(ProviderError),
    TimedOut(Duration),
    Closed,
}

impl From<ProviderError> for Halt {
    fn from(e: ProviderError) -> Self {
        Halt::Provider(e)
    }
}

impl From<ReceiverClosed> for Halt {
    fn from(_: ReceiverClosed) -> Self {
        Halt::Closed
    }
}

struct RunState {
    phase: Phase,
    step: usize,
    scratchpad: Scratchpad,
    trace: Vec<ExecutionStep>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            step: 0,
            scratchpad: Scratchpad::new(),
            trace: Vec::new(),
        }
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_enter(next),
            "illegal transition {:?} -> {next:?}",
            self.phase
        );
        debug!(step = self.step, from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
    }

    fn record(&mut self, draft: &mut StepDraft, entry: Entry) {
        let step = match &entry {
            Entry::Thought(text) => ExecutionStep::Thought { text: text.clone() },
            Entry::Observation(text) => ExecutionStep::Observation { text: text.clone() },
            Entry::Error(message) => ExecutionStep::Error {
                message: message.clone(),
            },
            // Actions are traced with their structured input by the caller.
            Entry::Action(_) => {
                draft.push(entry);
                return;
            }
        };
        self.trace.push(step);
        draft.push(entry);
    }

    async fn finish(
        mut self,
        answer: String,
        termination: Termination,
        emitter: &EventEmitter,
    ) -> std::result::Result<RunOutcome, Halt> {
        self.enter(Phase::Terminated);
        self.trace.push(ExecutionStep::FinalAnswer {
            text: answer.clone(),
        });
        emitter
            .emit(AgentEvent::FinalAnswer {
                text: answer.clone(),
            })
            .await?;
        Ok(RunOutcome {
            final_answer: answer,
            termination,
            steps: self.step,
            trace: self.trace,
        })
    }
}

/// A streaming ReAct agent over a fixed tool view.
///
/// Cheap to clone; concurrent runs share nothing mutable.
#[derive(Clone)]
pub struct ReactAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    tools: ToolView,
    max_steps: usize,
    policy: Arc<dyn FinalAnswerPolicy>,
    observation_chunk_chars: usize,
    timeout: Option<Duration>,
}

impl ReactAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: ToolView) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            tools,
            max_steps: 20,
            policy: Arc::new(LexicalPolicy::default()),
            observation_chunk_chars: 512,
            timeout: None,
        }
    }

    /// Apply the `[agent]` settings.
    pub fn with_config(self, config: &AgentConfig) -> Self {
        self.with_max_steps(config.max_steps)
            .with_policy(LexicalPolicy::new(config.min_answer_chars))
            .with_observation_chunk_chars(config.observation_chunk_chars)
    }

    /// Set max reasoning steps. Zero answers immediately without a model call.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_policy(mut self, policy: impl FinalAnswerPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_observation_chunk_chars(mut self, chars: usize) -> Self {
        self.observation_chunk_chars = chars.max(1);
        self
    }

    /// Wall-clock limit for a whole run. An expired run is dropped
    /// mid-step and fails like a provider error.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn tools(&self) -> &ToolView {
        &self.tools
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run to completion without streaming events.
    pub async fn run(&self, request: &str) -> Result<RunOutcome> {
        match self.drive_bounded(request, &EventEmitter::detached()).await {
            Ok(outcome) => Ok(outcome),
            Err(Halt::Provider(e)) => Err(Error::Provider(e)),
            Err(Halt::TimedOut(limit)) => Err(Error::Internal(timed_out(limit))),
            Err(Halt::Closed) => Err(Error::Internal("event consumer closed".into())),
        }
    }

    /// Run in a background task, streaming events as they happen.
    ///
    /// The stream ends after `final_answer`, or after `run_failed` when the
    /// provider fails. Dropping the receiver cancels the run at its next
    /// event.
    pub fn run_stream(&self, request: impl Into<String>) -> mpsc::Receiver<AgentEvent> {
        let (emitter, rx) = EventEmitter::channel(EVENT_BUFFER);
        let agent = self.clone();
        let request = request.into();

        tokio::spawn(async move {
            match agent.drive_bounded(&request, &emitter).await {
                Ok(outcome) => info!(
                    steps = outcome.steps,
                    termination = ?outcome.termination,
                    "Agent run finished"
                ),
                Err(Halt::Provider(e)) => {
                    warn!(error = %e, "Agent run failed");
                    let _ = emitter
                        .emit(AgentEvent::RunFailed {
                            message: e.to_string(),
                        })
                        .await;
                }
                Err(Halt::TimedOut(limit)) => {
                    warn!(secs = limit.as_secs(), "Agent run timed out");
                    let _ = emitter
                        .emit(AgentEvent::RunFailed {
                            message: timed_out(limit),
                        })
                        .await;
                }
                Err(Halt::Closed) => debug!("Event consumer went away; run cancelled"),
            }
        });

        rx
    }

    async fn drive_bounded(
        &self,
        request: &str,
        emitter: &EventEmitter,
    ) -> std::result::Result<RunOutcome, Halt> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.drive(request, emitter))
                .await
                .unwrap_or(Err(Halt::TimedOut(limit))),
            None => self.drive(request, emitter).await,
        }
    }

    async fn drive(
        &self,
        request: &str,
        emitter: &EventEmitter,
    ) -> std::result::Result<RunOutcome, Halt> {
        info!(
            max_steps = self.max_steps,
            tools = self.tools.len(),
            "Starting agent run"
        );
        let mut state = RunState::new();

        while state.step < self.max_steps {
            state.step += 1;
            state.enter(Phase::Thinking);
            if let Some(answer) = self.step(request, &mut state, emitter).await? {
                return state
                    .finish(answer, Termination::FinalAnswer, emitter)
                    .await;
            }
        }

        warn!(max_steps = self.max_steps, "Reached max steps without a final answer");
        state
            .finish(
                MAX_STEPS_ANSWER.to_string(),
                Termination::MaxStepsExceeded,
                emitter,
            )
            .await
    }

    /// One full step. Returns the final answer when the run should end.
    async fn step(
        &self,
        request: &str,
        state: &mut RunState,
        emitter: &EventEmitter,
    ) -> std::result::Result<Option<String>, Halt> {
        emitter
            .emit(AgentEvent::ThoughtStart { step: state.step })
            .await?;
        let raw = self.think(request, state, emitter).await?;

        state.enter(Phase::Deciding);
        let extraction = directive::extract(&raw);
        let thought = extraction.narrative.trim().to_string();
        let mut draft = StepDraft::default();

        match extraction.directive {
            Some(Ok(directive)) => {
                emitter.emit(AgentEvent::ThoughtComplete).await?;
                if !thought.is_empty() {
                    state.record(&mut draft, Entry::Thought(thought));
                }
                self.act(directive, state, &mut draft, emitter).await?;
            }
            Some(Err(parse)) => {
                emitter.emit(AgentEvent::ThoughtComplete).await?;
                let err = StepError::from(parse);
                warn!(step = state.step, error = %err, "Unusable action block");
                emitter
                    .emit(AgentEvent::Error {
                        message: err.to_string(),
                    })
                    .await?;
                if !thought.is_empty() {
                    state.record(&mut draft, Entry::Thought(thought));
                }
                state.record(&mut draft, Entry::Error(err.to_string()));
            }
            None => {
                let observed = state.scratchpad.has_observation();
                match self.policy.decide(&thought, observed) {
                    Verdict::Final => {
                        emitter.emit(AgentEvent::ThoughtComplete).await?;
                        return Ok(Some(clean_answer(&thought)));
                    }
                    Verdict::Continue { nudge } => {
                        if !thought.is_empty() {
                            state.record(&mut draft, Entry::Thought(thought));
                        }
                        if let Some(nudge) = nudge {
                            debug!(step = state.step, "Nudging model toward an action");
                            emitter
                                .emit(AgentEvent::ThoughtChunk {
                                    text: nudge.clone(),
                                })
                                .await?;
                            state.record(&mut draft, Entry::Thought(nudge.trim().to_string()));
                        }
                        emitter.emit(AgentEvent::ThoughtComplete).await?;
                    }
                }
            }
        }

        state.scratchpad.commit(draft);
        state.enter(Phase::Continuing);
        Ok(None)
    }

    /// Stream one model response, emitting its narrative as it settles.
    async fn think(
        &self,
        request: &str,
        state: &RunState,
        emitter: &EventEmitter,
    ) -> std::result::Result<String, Halt> {
        let messages = prompt::build_messages(request, &self.tools, &state.scratchpad);
        let provider_request = ProviderRequest::new(self.model.clone(), messages)
            .with_temperature(self.temperature)
            .streaming();

        let mut rx = self.provider.stream(provider_request).await?;
        let mut filter = NarrativeFilter::new();
        let mut raw = String::new();

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content.as_deref()
                && !text.is_empty()
            {
                raw.push_str(text);
                let narrative = filter.push(text);
                if !narrative.is_empty() {
                    emitter
                        .emit(AgentEvent::ThoughtChunk { text: narrative })
                        .await?;
                }
            }
            if chunk.done {
                break;
            }
        }

        let tail = filter.finish();
        if !tail.is_empty() {
            emitter.emit(AgentEvent::ThoughtChunk { text: tail }).await?;
        }
        debug!(step = state.step, chars = raw.len(), "Model response complete");
        Ok(raw)
    }

    async fn act(
        &self,
        directive: Directive,
        state: &mut RunState,
        draft: &mut StepDraft,
        emitter: &EventEmitter,
    ) -> std::result::Result<(), Halt> {
        state.enter(Phase::Acting);
        info!(step = state.step, tool = %directive.tool_name, "Dispatching tool");

        let tool_input = Value::Object(directive.tool_input.clone());
        let action = json!({"tool_name": directive.tool_name, "tool_input": tool_input});
        state.trace.push(ExecutionStep::Action {
            tool_name: directive.tool_name.clone(),
            tool_input,
        });
        state.record(draft, Entry::Action(action.to_string()));

        let dispatcher = Dispatcher::new(&self.tools, self.observation_chunk_chars);
        match dispatcher.dispatch(&directive, emitter).await? {
            Outcome::Observation(text) => {
                state.enter(Phase::Observing);
                state.record(draft, Entry::Observation(text));
            }
            Outcome::Failed(err) => state.record(draft, Entry::Error(err.to_string())),
        }
        Ok(())
    }
}

fn timed_out(limit: Duration) -> String {
    format!("Run timed out after {}s", limit.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        ScriptedProvider, StallingProvider, Turn, action, collect, fragments, tool_view,
    };
    use std::sync::atomic::Ordering;

    const LONG_ANSWER: &str = "The echo tool returned the word hello, which confirms the \
        service is reachable and responding with exactly what was sent to it.";

    fn agent(provider: Arc<ScriptedProvider>) -> ReactAgent {
        let (tools, _, _) = tool_view();
        ReactAgent::new(provider, "mock-model", tools)
    }

    fn kinds(events: &[AgentEvent]) -> Vec<&'static str> {
        events.iter().map(AgentEvent::event_type).collect()
    }

    fn final_answers(events: &[AgentEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, AgentEvent::FinalAnswer { .. }))
            .count()
    }

    #[tokio::test]
    async fn direct_answer_in_one_step() {
        let provider = Arc::new(ScriptedProvider::texts(&["Final Answer: 4"]));
        let events = collect(agent(Arc::clone(&provider)).run_stream("2+2?")).await;

        assert_eq!(events.first(), Some(&AgentEvent::ThoughtStart { step: 1 }));
        assert_eq!(
            events.last(),
            Some(&AgentEvent::FinalAnswer { text: "4".into() })
        );
        assert_eq!(events[events.len() - 2], AgentEvent::ThoughtComplete);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_then_answer_event_order() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("I should echo it.", "echo", json!({"text": "hello"})),
            LONG_ANSWER,
        ]));
        let events = collect(agent(provider).run_stream("ping")).await;
        let kinds = kinds(&events);

        let tail: Vec<_> = kinds
            .iter()
            .copied()
            .filter(|k| *k != "thought_chunk")
            .collect();
        assert_eq!(
            tail,
            [
                "thought_start",
                "thought_complete",
                "action_start",
                "action_progress",
                "observation_start",
                "observation_chunk",
                "observation_complete",
                "thought_start",
                "thought_complete",
                "final_answer"
            ]
        );
        assert_eq!(
            events.last(),
            Some(&AgentEvent::FinalAnswer {
                text: LONG_ANSWER.into()
            })
        );
        assert!(events.contains(&AgentEvent::ThoughtStart { step: 2 }));
    }

    #[tokio::test]
    async fn action_block_never_reaches_thought_chunks() {
        let response = action("Checking.", "echo", json!({"text": "secret-input"}));
        for width in 1..=9 {
            let provider = Arc::new(ScriptedProvider::chunked(
                &[&response, "Final Answer: done"],
                width,
            ));
            let events = collect(agent(provider).run_stream("q")).await;
            let narrative: String = events
                .iter()
                .take_while(|e| !matches!(e, AgentEvent::ThoughtComplete))
                .filter_map(|e| match e {
                    AgentEvent::ThoughtChunk { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(narrative, "Checking.\n", "width {width}");
            assert!(!narrative.contains("tool_name"));
        }
    }

    #[tokio::test]
    async fn run_returns_outcome_and_trace() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Echo first.", "echo", json!({"text": "hi"})),
            LONG_ANSWER,
        ]));
        let outcome = agent(provider).run("ping").await.unwrap();

        assert_eq!(outcome.termination, Termination::FinalAnswer);
        assert_eq!(outcome.steps, 2);
        assert_eq!(outcome.final_answer, LONG_ANSWER);
        assert_eq!(
            outcome.trace,
            [
                ExecutionStep::Thought {
                    text: "Echo first.".into()
                },
                ExecutionStep::Action {
                    tool_name: "echo".into(),
                    tool_input: json!({"text": "hi"})
                },
                ExecutionStep::Observation { text: "hi".into() },
                ExecutionStep::FinalAnswer {
                    text: LONG_ANSWER.into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_and_fed_back() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Trying.", "missing", json!({})),
            "Final Answer: gave up",
        ]));
        let events = collect(agent(Arc::clone(&provider)).run_stream("q")).await;

        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::Error { message } if message.contains("Unknown tool 'missing'")
        )));
        assert!(!kinds(&events).contains(&"action_start"));

        let second = &provider.requests()[1];
        assert!(second.messages[1].content.contains("Error: Unknown tool 'missing'"));
        assert_eq!(final_answers(&events), 1);
    }

    #[tokio::test]
    async fn parse_error_continues_the_run() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            "Let me try.\n```json\n{\"tool_name\": \"echo\", \"tool_input\": \n```",
            "Final Answer: ok",
        ]));
        let events = collect(agent(Arc::clone(&provider)).run_stream("q")).await;

        let error_at = kinds(&events).iter().position(|k| *k == "error").unwrap();
        assert_eq!(events[error_at - 1], AgentEvent::ThoughtComplete);
        assert_eq!(events.last(), Some(&AgentEvent::FinalAnswer { text: "ok".into() }));
        assert!(provider.requests()[1].messages[1]
            .content
            .contains("Error: Could not parse the action block"));
    }

    #[tokio::test]
    async fn unterminated_block_is_a_step_error() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            "Hmm ```json {\"tool_name\": \"echo\"",
            "Final Answer: ok",
        ]));
        let events = collect(agent(provider).run_stream("q")).await;
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::Error { message } if message.contains("never closed")
        )));
        for e in &events {
            if let AgentEvent::ThoughtChunk { text } = e {
                assert!(!text.contains("tool_name"));
            }
        }
    }

    #[tokio::test]
    async fn failing_tool_runs_once_and_run_continues() {
        let (tools, _, flaky_calls) = tool_view();
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Try flaky.", "flaky", json!({})),
            "Final Answer: it failed",
        ]));
        let agent = ReactAgent::new(provider, "m", tools);
        let events = collect(agent.run_stream("q")).await;

        assert_eq!(flaky_calls.load(Ordering::SeqCst), 1);
        assert!(events.contains(&AgentEvent::Error {
            message: "Tool 'flaky' failed: boom".into()
        }));
        assert_eq!(
            events.last(),
            Some(&AgentEvent::FinalAnswer {
                text: "it failed".into()
            })
        );
    }

    #[tokio::test]
    async fn zero_max_steps_answers_without_calling_provider() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let agent = agent(Arc::clone(&provider)).with_max_steps(0);
        let events = collect(agent.run_stream("q")).await;

        assert_eq!(
            events,
            [AgentEvent::FinalAnswer {
                text: MAX_STEPS_ANSWER.into()
            }]
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn max_steps_exceeded_gives_synthetic_answer() {
        let provider = Arc::new(ScriptedProvider::texts(&["Thinking...", "Still thinking..."]));
        let outcome = agent(Arc::clone(&provider))
            .with_max_steps(2)
            .run("q")
            .await
            .unwrap();

        assert_eq!(outcome.termination, Termination::MaxStepsExceeded);
        assert_eq!(outcome.final_answer, MAX_STEPS_ANSWER);
        assert_eq!(outcome.steps, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn thinking_phases_never_exceed_max_steps() {
        let provider = Arc::new(ScriptedProvider::texts(&["a", "b", "c"]));
        let events = collect(agent(provider).with_max_steps(3).run_stream("q")).await;
        let starts = kinds(&events)
            .iter()
            .filter(|k| **k == "thought_start")
            .count();
        assert_eq!(starts, 3);
        assert_eq!(final_answers(&events), 1);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn continuation_without_action_gets_nudged() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            "I will look this up.",
            "Final Answer: done",
        ]));
        let events = collect(agent(Arc::clone(&provider)).run_stream("q")).await;

        let nudge = crate::heuristic::CONTINUATION_NUDGE.to_string();
        assert!(events.contains(&AgentEvent::ThoughtChunk { text: nudge }));
        assert!(provider.requests()[1].messages[1]
            .content
            .contains("I have not used any tool yet"));
    }

    #[tokio::test]
    async fn long_answer_after_action_is_final() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Echo.", "echo", json!({"text": "x"})),
            LONG_ANSWER,
        ]));
        let agent = agent(provider).with_policy(LexicalPolicy::new(80));
        let outcome = agent.run("q").await.unwrap();
        assert!(LONG_ANSWER.chars().count() > 80);
        assert_eq!(outcome.final_answer, LONG_ANSWER);
    }

    #[tokio::test]
    async fn long_answer_after_failed_action_keeps_going() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Trying.", "missing", json!({})),
            LONG_ANSWER,
            "Final Answer: real",
        ]));
        let outcome = agent(Arc::clone(&provider)).run("q").await.unwrap();

        assert!(LONG_ANSWER.chars().count() > 80);
        assert_eq!(outcome.final_answer, "real");
        assert_eq!(outcome.steps, 3);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn provider_failure_emits_run_failed() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Fail(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let events = collect(agent(provider).run_stream("q")).await;

        assert_eq!(kinds(&events), ["thought_start", "run_failed"]);
        assert_eq!(final_answers(&events), 0);
    }

    #[tokio::test]
    async fn interrupted_stream_fails_the_run() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Interrupt(
            fragments("Partial thought", 4),
            ProviderError::StreamInterrupted("reset".into()),
        )]));
        let events = collect(agent(provider).run_stream("q")).await;

        assert!(matches!(events.last(), Some(AgentEvent::RunFailed { .. })));
        assert_eq!(final_answers(&events), 0);
    }

    #[tokio::test]
    async fn run_surfaces_provider_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![Turn::Fail(
            ProviderError::Timeout("30s".into()),
        )]));
        let err = agent(provider).run("q").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_before_model_call() {
        let provider = Arc::new(ScriptedProvider::texts(&["Final Answer: x"]));
        let rx = agent(Arc::clone(&provider)).run_stream("q");
        drop(rx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn observation_is_chunked() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            &action("Echo.", "echo", json!({"text": "abcdefghij"})),
            "Final Answer: ok",
        ]));
        let events = collect(
            agent(provider)
                .with_observation_chunk_chars(4)
                .run_stream("q"),
        )
        .await;
        let chunks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::ObservationChunk { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, ["abcd", "efgh", "ij"]);
    }

    #[tokio::test]
    async fn concurrent_runs_are_isolated() {
        let (tools, _, _) = tool_view();
        let a = ReactAgent::new(
            Arc::new(ScriptedProvider::texts(&["Final Answer: first"])),
            "m",
            tools.clone(),
        );
        let b = ReactAgent::new(
            Arc::new(ScriptedProvider::texts(&["Final Answer: second"])),
            "m",
            tools,
        );
        let (ea, eb) = tokio::join!(collect(a.run_stream("1")), collect(b.run_stream("2")));
        assert_eq!(ea.last(), Some(&AgentEvent::FinalAnswer { text: "first".into() }));
        assert_eq!(eb.last(), Some(&AgentEvent::FinalAnswer { text: "second".into() }));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_run_times_out() {
        let (tools, _, _) = tool_view();
        let agent = ReactAgent::new(Arc::new(StallingProvider::default()), "m", tools)
            .with_timeout(Duration::from_secs(5));
        let events = collect(agent.run_stream("q")).await;

        assert_eq!(
            events,
            [
                AgentEvent::ThoughtStart { step: 1 },
                AgentEvent::ThoughtChunk {
                    text: "Hmm".into()
                },
                AgentEvent::RunFailed {
                    message: "Run timed out after 5s".into()
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_reports_timeout() {
        let (tools, _, _) = tool_view();
        let agent = ReactAgent::new(Arc::new(StallingProvider::default()), "m", tools)
            .with_timeout(Duration::from_secs(1));
        let err = agent.run("q").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn phase_transitions() {
        assert!(Phase::Idle.can_enter(Phase::Thinking));
        assert!(Phase::Idle.can_enter(Phase::Terminated));
        assert!(Phase::Deciding.can_enter(Phase::Acting));
        assert!(Phase::Observing.can_enter(Phase::Continuing));
        assert!(!Phase::Terminated.can_enter(Phase::Thinking));
        assert!(!Phase::Thinking.can_enter(Phase::Acting));
        assert!(!Phase::Observing.can_enter(Phase::Terminated));
    }
}
