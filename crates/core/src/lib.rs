//! # stepwise core
//!
//! Domain types, traits, and error definitions shared by every stepwise crate.
//! The agent loop, the providers and the tools all depend inward on this crate.
//!
//! - [`Provider`]: an opaque source of model output, whole or streamed
//! - [`Tool`] and [`ToolRegistry`]: named capabilities with input schemas
//! - [`ToolView`]: the immutable, filtered registry a single run is given

pub mod error;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use tool::{Tool, ToolDefinition, ToolRegistry, ToolResult, ToolView};
