//! Deciding whether a step without an action block ends the run.

/// Outcome of judging a directive-free response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The response is the final answer.
    Final,
    /// Keep going. `nudge` is appended to the step's reasoning when set.
    Continue { nudge: Option<String> },
}

/// Pluggable final-answer decision.
pub trait FinalAnswerPolicy: Send + Sync {
    fn decide(&self, narrative: &str, has_observation: bool) -> Verdict;
}

/// Phrases showing the model intends to do more work.
pub const CONTINUATION_MARKERS: &[&str] = &[
    "i will",
    "i'll",
    "let me",
    "i need to",
    "i should",
    "next, i",
    "i am going to",
    "i'm going to",
    "first, i",
    "let's",
];

/// Phrases showing the model is wrapping up.
pub const COMPLETION_MARKERS: &[&str] = &[
    "final answer",
    "in conclusion",
    "in summary",
    "to summarize",
    "here is the answer",
    "here's the answer",
    "the answer is",
];

pub const CONTINUATION_NUDGE: &str = "\nI have not used any tool yet. I should emit an action block to call one of the available tools, or answer directly starting with \"Final Answer:\".";

/// Marker-based policy. Rules apply in order and the first match wins:
///
/// 1. no action yet and a continuation marker: continue with a nudge
/// 2. a completion marker: final
/// 3. an observed action, longer than `min_answer_chars`, no continuation marker: final
/// 4. otherwise: continue
#[derive(Debug, Clone)]
pub struct LexicalPolicy {
    min_answer_chars: usize,
}

impl LexicalPolicy {
    pub fn new(min_answer_chars: usize) -> Self {
        Self { min_answer_chars }
    }
}

impl Default for LexicalPolicy {
    fn default() -> Self {
        Self::new(80)
    }
}

impl FinalAnswerPolicy for LexicalPolicy {
    fn decide(&self, narrative: &str, has_observation: bool) -> Verdict {
        let normalized = narrative.to_lowercase().replace('\u{2019}', "'");
        let continuing = contains_any(&normalized, CONTINUATION_MARKERS);

        if !has_observation && continuing {
            return Verdict::Continue {
                nudge: Some(CONTINUATION_NUDGE.to_string()),
            };
        }
        if contains_any(&normalized, COMPLETION_MARKERS) {
            return Verdict::Final;
        }
        if has_observation && narrative.trim().chars().count() > self.min_answer_chars && !continuing
        {
            return Verdict::Final;
        }
        Verdict::Continue { nudge: None }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Strip reasoning labels the prompt asks the model to use.
///
/// Text after the last `Final Answer:` label is kept when the label is
/// present; otherwise a leading `Thought:` is dropped.
pub fn clean_answer(narrative: &str) -> String {
    const FINAL: &str = "final answer:";
    const THOUGHT: &str = "thought:";

    let trimmed = narrative.trim();
    let lower = trimmed.to_ascii_lowercase();

    if let Some(at) = lower.rfind(FINAL) {
        return trimmed[at + FINAL.len()..].trim().to_string();
    }
    if lower.starts_with(THOUGHT) {
        return trimmed[THOUGHT.len()..].trim().to_string();
    }
    trimmed.to_string()
}
