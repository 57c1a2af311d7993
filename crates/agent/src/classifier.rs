//! Incremental narrative filter for streamed model output.
//!
//! Fragments arrive with arbitrary boundaries, so a marker may be split
//! across two (or more) fragments. The filter keeps a small pending buffer
//! holding only the longest tail that could still grow into the marker it
//! is waiting for; everything before that tail is settled and is either
//! emitted as narrative or dropped as block content.
//!
//! A block that is never closed stays suppressed to the end of the stream.

/// Opens an embedded action block.
pub const BLOCK_OPEN: &str = "```json";

/// Closes an embedded action block.
pub const BLOCK_CLOSE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Narrative,
    Block,
}

/// Splits a fragment stream into narrative text, suppressing action blocks.
#[derive(Debug)]
pub struct NarrativeFilter {
    mode: Mode,
    pending: String,
}

impl Default for NarrativeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeFilter {
    pub fn new() -> Self {
        Self {
            mode: Mode::Narrative,
            pending: String::new(),
        }
    }

    /// True while the filter is inside an unclosed block.
    pub fn in_block(&self) -> bool {
        self.mode == Mode::Block
    }

    /// Feed one fragment; returns the narrative text it settled (possibly empty).
    pub fn push(&mut self, fragment: &str) -> String {
        self.pending.push_str(fragment);
        let mut out = String::new();

        loop {
            let marker = match self.mode {
                Mode::Narrative => BLOCK_OPEN,
                Mode::Block => BLOCK_CLOSE,
            };

            if let Some(at) = self.pending.find(marker) {
                if self.mode == Mode::Narrative {
                    out.push_str(&self.pending[..at]);
                }
                self.pending.drain(..at + marker.len());
                self.mode = match self.mode {
                    Mode::Narrative => Mode::Block,
                    Mode::Block => Mode::Narrative,
                };
                continue;
            }

            let settled = self.pending.len() - partial_marker_len(&self.pending, marker);
            if self.mode == Mode::Narrative {
                out.push_str(&self.pending[..settled]);
            }
            self.pending.drain(..settled);
            return out;
        }
    }

    /// End of stream. Returns any narrative still held back.
    pub fn finish(self) -> String {
        match self.mode {
            Mode::Narrative => self.pending,
            Mode::Block => String::new(),
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    let max = (marker.len() - 1).min(text.len());
    (1..=max)
        .rev()
        .find(|&k| {
            let start = text.len() - k;
            text.is_char_boundary(start) && marker.starts_with(&text[start..])
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive;

    fn run(fragments: &[&str]) -> String {
        let mut filter = NarrativeFilter::new();
        let mut out = String::new();
        for f in fragments {
            out.push_str(&filter.push(f));
        }
        out.push_str(&filter.finish());
        out
    }

    /// Split `text` into fragments of `width` chars.
    fn chunks(text: &str, width: usize) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(width).map(|c| c.iter().collect()).collect()
    }

    const WITH_BLOCK: &str = "I should search.\n```json\n{\"tool_name\": \"web_search\", \"tool_input\": {\"query\": \"x\"}}\n```\nDone.";
    const WITHOUT_BLOCK: &str = "I should search.\n\nDone.";

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(run(&["Hello, ", "world"]), "Hello, world");
    }

    #[test]
    fn block_is_removed() {
        assert_eq!(run(&[WITH_BLOCK]), WITHOUT_BLOCK);
    }

    #[test]
    fn narrative_before_marker_flushes_on_open() {
        let mut filter = NarrativeFilter::new();
        assert_eq!(filter.push("Thinking ```json\n{"), "Thinking ");
        assert!(filter.in_block());
    }

    #[test]
    fn marker_prefix_is_held_back() {
        let mut filter = NarrativeFilter::new();
        assert_eq!(filter.push("abc``"), "abc");
        assert_eq!(filter.push("`js"), "");
        assert_eq!(filter.push("on {}```tail"), "tail");
    }

    #[test]
    fn other_fences_are_narrative() {
        let text = "Example:\n```rust\nfn main() {}\n```\nok";
        assert_eq!(run(&chunks(text, 2).iter().map(String::as_str).collect::<Vec<_>>()), text);
    }

    #[test]
    fn held_prefix_released_at_finish() {
        let mut filter = NarrativeFilter::new();
        assert_eq!(filter.push("trailing ``"), "trailing ");
        assert_eq!(filter.finish(), "``");
    }

    #[test]
    fn unterminated_block_fails_closed() {
        let out = run(&["Before ", "```json\n{\"tool_name\": ", "\"leak\"}"]);
        assert_eq!(out, "Before ");
    }

    #[test]
    fn unterminated_block_hides_partial_close() {
        let out = run(&["```json {\"a\":1}", "``"]);
        assert_eq!(out, "");
    }

    #[test]
    fn multiple_blocks_all_removed() {
        let text = "a```json\n1\n```b```json\n2\n```c";
        assert_eq!(run(&[text]), "abc");
    }

    #[test]
    fn multibyte_text_is_not_split() {
        let text = "Réponse ```json\n{}\n``` señal → fin";
        for width in 1..=4 {
            let parts = chunks(text, width);
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            assert_eq!(run(&refs), "Réponse  señal → fin");
        }
    }

    #[test]
    fn every_fixed_width_chunking_matches() {
        for width in 1..=WITH_BLOCK.len() {
            let parts = chunks(WITH_BLOCK, width);
            let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
            assert_eq!(run(&refs), WITHOUT_BLOCK, "width {width}");
        }
    }

    #[test]
    fn every_two_way_split_matches() {
        for at in 0..=WITH_BLOCK.len() {
            let (a, b) = WITH_BLOCK.split_at(at);
            assert_eq!(run(&[a, b]), WITHOUT_BLOCK, "split at {at}");
        }
    }

    #[test]
    fn every_three_way_split_around_markers_matches() {
        let open = WITH_BLOCK.find(BLOCK_OPEN).unwrap();
        let close = WITH_BLOCK.rfind(BLOCK_CLOSE).unwrap();
        for i in open..=open + BLOCK_OPEN.len() {
            for j in close..=close + BLOCK_CLOSE.len() {
                let (a, rest) = WITH_BLOCK.split_at(i);
                let (b, c) = rest.split_at(j - i);
                assert_eq!(run(&[a, b, c]), WITHOUT_BLOCK, "splits {i},{j}");
            }
        }
    }

    #[test]
    fn streaming_view_agrees_with_whole_text_extraction() {
        let samples = [
            WITH_BLOCK,
            WITHOUT_BLOCK,
            "no markers at all",
            "x```json\n{\"toolName\":\"a\",\"toolInput\":{}}\n```",
            "open only ```json {\"tool_name\":",
            "```json\n{}\n``` and ```json\n{}\n``` twice",
            "``` not json ```",
        ];
        for sample in samples {
            let expected = directive::extract(sample).narrative;
            for width in [1, 2, 3, 5, 8, 13] {
                let parts = chunks(sample, width);
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                assert_eq!(run(&refs), expected, "{sample:?} at width {width}");
            }
        }
    }
}
