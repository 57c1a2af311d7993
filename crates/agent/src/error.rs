//! Recoverable per-step errors.
//!
//! None of these end a run. Each is reported as an `error` event and recorded
//! in the scratchpad so the model can correct itself on the next step.

use crate::directive::ParseError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("Could not parse the action block: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown tool '{name}'. Available tools: {}", available.join(", "))]
    UnknownTool { name: String, available: Vec<String> },

    #[error("Invalid input for tool '{tool_name}': {reason}")]
    InvalidInput { tool_name: String, reason: String },

    #[error("Tool '{tool_name}' failed: {message}")]
    ToolExecution { tool_name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_lists_available() {
        let err = StepError::UnknownTool {
            name: "nope".into(),
            available: vec!["read_file".into(), "web_search".into()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown tool 'nope'. Available tools: read_file, web_search"
        );
    }

    #[test]
    fn parse_error_wraps_reason() {
        let err = StepError::from(ParseError::Unterminated);
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn tool_execution_keeps_message() {
        let err = StepError::ToolExecution {
            tool_name: "web_search".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Tool 'web_search' failed: boom");
    }
}
