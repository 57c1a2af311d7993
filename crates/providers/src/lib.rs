//! Completion provider implementations for stepwise.
//!
//! All providers implement the `stepwise_core::Provider` trait.
//! [`build_from_config`] selects one based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
