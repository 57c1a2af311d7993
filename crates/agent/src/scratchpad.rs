//! Append-only reasoning record carried between steps.

use std::fmt;

/// One labelled line of the scratchpad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Thought(String),
    Action(String),
    Observation(String),
    Error(String),
}

impl Entry {
    pub fn label(&self) -> &'static str {
        match self {
            Entry::Thought(_) => "Thought",
            Entry::Action(_) => "Action",
            Entry::Observation(_) => "Observation",
            Entry::Error(_) => "Error",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Entry::Thought(t) | Entry::Action(t) | Entry::Observation(t) | Entry::Error(t) => t,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.text())
    }
}

/// Entries produced by one step, committed together or not at all.
#[derive(Debug, Default)]
pub struct StepDraft {
    entries: Vec<Entry>,
}

impl StepDraft {
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulated reasoning for one run.
#[derive(Debug, Default)]
pub struct Scratchpad {
    entries: Vec<Entry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished step's entries in one move.
    pub fn commit(&mut self, draft: StepDraft) {
        self.entries.extend(draft.entries);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True once an action has produced an observation. Actions that ended
    /// in an error do not count.
    pub fn has_observation(&self) -> bool {
        self.entries
            .windows(2)
            .any(|w| matches!(w, [Entry::Action(_), Entry::Observation(_)]))
    }

    /// Render for inclusion in the next prompt.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(Entry::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_labelled_lines() {
        let mut pad = Scratchpad::new();
        let mut draft = StepDraft::default();
        draft.push(Entry::Thought("search first".into()));
        draft.push(Entry::Action("web_search".into()));
        draft.push(Entry::Observation("3 results".into()));
        pad.commit(draft);
        assert_eq!(
            pad.render(),
            "Thought: search first\nAction: web_search\nObservation: 3 results"
        );
    }

    #[test]
    fn uncommitted_draft_leaves_no_trace() {
        let mut pad = Scratchpad::new();
        {
            let mut draft = StepDraft::default();
            draft.push(Entry::Thought("partial".into()));
        }
        assert!(pad.is_empty());

        let mut draft = StepDraft::default();
        draft.push(Entry::Error("boom".into()));
        pad.commit(draft);
        assert_eq!(pad.len(), 1);
        assert!(!pad.has_observation());
    }

    #[test]
    fn commits_append_in_order() {
        let mut pad = Scratchpad::new();
        for i in 0..3 {
            let mut draft = StepDraft::default();
            draft.push(Entry::Thought(format!("t{i}")));
            pad.commit(draft);
        }
        let texts: Vec<_> = pad.entries().iter().map(Entry::text).collect();
        assert_eq!(texts, ["t0", "t1", "t2"]);
    }

    #[test]
    fn failed_action_is_not_an_observation() {
        let mut pad = Scratchpad::new();
        let mut draft = StepDraft::default();
        draft.push(Entry::Action("missing".into()));
        draft.push(Entry::Error("Unknown tool 'missing'".into()));
        pad.commit(draft);
        assert!(!pad.has_observation());

        let mut draft = StepDraft::default();
        draft.push(Entry::Action("read_file".into()));
        draft.push(Entry::Observation("contents".into()));
        pad.commit(draft);
        assert!(pad.has_observation());
    }
}
