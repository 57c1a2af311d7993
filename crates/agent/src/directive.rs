//! Action directive extraction from a completed model response.
//!
//! The narrative computed here must match what [`NarrativeFilter`] emits for
//! the same text under any fragmentation, so both sides search for the same
//! markers leftmost-first and treat an unclosed block the same way.
//!
//! [`NarrativeFilter`]: crate::classifier::NarrativeFilter

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classifier::{BLOCK_CLOSE, BLOCK_OPEN};

/// A structured request from the model to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(alias = "toolName")]
    pub tool_name: String,
    #[serde(alias = "toolInput")]
    pub tool_input: Map<String, Value>,
}

/// Why an action block could not be turned into a [`Directive`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("action block was opened but never closed")]
    Unterminated,

    #[error("action block is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("action block must be a JSON object")]
    NotAnObject,

    #[error("action block is missing '{0}'")]
    MissingField(&'static str),

    #[error("'tool_name' must be a non-empty string")]
    InvalidToolName,

    #[error("'tool_input' must be a JSON object")]
    InputNotObject,
}

/// Result of scanning one full response.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The response with every action block removed.
    pub narrative: String,
    /// `None` when the response holds no action block.
    pub directive: Option<Result<Directive, ParseError>>,
}

/// Scan a completed response for its first action block.
pub fn extract(text: &str) -> Extraction {
    let mut narrative = String::with_capacity(text.len());
    let mut first: Option<Result<&str, ParseError>> = None;
    let mut extra_blocks = 0usize;
    let mut rest = text;

    while let Some(open) = rest.find(BLOCK_OPEN) {
        narrative.push_str(&rest[..open]);
        let body = &rest[open + BLOCK_OPEN.len()..];

        match body.find(BLOCK_CLOSE) {
            Some(close) => {
                if first.is_none() {
                    first = Some(Ok(body[..close].trim()));
                } else {
                    extra_blocks += 1;
                }
                rest = &body[close + BLOCK_CLOSE.len()..];
            }
            None => {
                if first.is_none() {
                    first = Some(Err(ParseError::Unterminated));
                }
                rest = "";
                break;
            }
        }
    }
    narrative.push_str(rest);

    if extra_blocks > 0 {
        tracing::warn!(
            ignored = extra_blocks,
            "Response contained more than one action block; using the first"
        );
    }

    Extraction {
        narrative,
        directive: first.map(|block| block.and_then(parse_block)),
    }
}

fn parse_block(interior: &str) -> Result<Directive, ParseError> {
    let value: Value =
        serde_json::from_str(interior).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let Value::Object(mut obj) = value else {
        return Err(ParseError::NotAnObject);
    };

    let tool_name = match take(&mut obj, "tool_name", "toolName") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => return Err(ParseError::InvalidToolName),
        None => return Err(ParseError::MissingField("tool_name")),
    };

    let tool_input = match take(&mut obj, "tool_input", "toolInput") {
        Some(Value::Object(input)) => input,
        Some(_) => return Err(ParseError::InputNotObject),
        None => return Err(ParseError::MissingField("tool_input")),
    };

    Ok(Directive {
        tool_name,
        tool_input,
    })
}

fn take(obj: &mut Map<String, Value>, key: &str, alias: &str) -> Option<Value> {
    obj.remove(key).or_else(|| obj.remove(alias))
}
