//! Provider selection: builds the configured completion provider.

use std::sync::Arc;

use stepwise_config::AppConfig;
use stepwise_core::error::ProviderError;
use stepwise_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Providers that run locally and accept any API key.
const KEYLESS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

/// Build the default provider from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();

    let base_url = match (&config.api_url, default_base_url(name)) {
        (Some(url), _) => url.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown provider '{name}'; set api_url to use a custom endpoint"
            )));
        }
    };

    let api_key = match &config.api_key {
        Some(key) => key.clone(),
        None if KEYLESS.contains(&name) => name.to_string(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for '{name}'; set STEPWISE_API_KEY or OPENAI_API_KEY"
            )));
        }
    };

    debug!(provider = name, base_url = %base_url, "Building provider");
    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}
