//! Web search tool backed by the Brave Search API.

use async_trait::async_trait;
use serde::Deserialize;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult};
use tracing::{debug, warn};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

pub struct WebSearchTool {
    api_key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            endpoint: BRAVE_API_URL.into(),
            client,
        }
    }

    /// Point the tool at a different search endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Performs a web search for up-to-date information. Returns titles, URLs and summaries."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        match arguments["query"].as_str() {
            Some(query) => format!("Searching the web for \"{query}\""),
            None => "Searching the web".into(),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| self.failed("BRAVE_API_KEY is not configured"))?;

        debug!(query, "Calling search API");
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| self.failed(format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Search API request failed");
            return Err(self.failed(format!(
                "search API returned status {}",
                status.as_u16()
            )));
        }

        let body: BraveResponse = response
            .json()
            .await
            .map_err(|e| self.failed(format!("unreadable search response: {e}")))?;

        let results = body.web.map(|w| w.results).unwrap_or_default();
        Ok(ToolResult::ok(render(query, &results)))
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: String,
}

fn render(query: &str, results: &[BraveResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut entry = format!("{}. {}", i + 1, r.title);
            if let Some(url) = &r.url {
                entry.push_str(&format!("\n   {url}"));
            }
            if !r.description.is_empty() {
                entry.push_str(&format!("\n   {}", r.description));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition() {
        let tool = WebSearchTool::new(None);
        assert_eq!(tool.name(), "web_search");
        assert_eq!(tool.parameters_schema()["required"], serde_json::json!(["query"]));
    }

    #[tokio::test]
    async fn missing_key_fails_cleanly() {
        let tool = WebSearchTool::new(None);
        let err = tool
            .execute(serde_json::json!({"query": "rust"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "web_search failed: BRAVE_API_KEY is not configured");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_execution_failure() {
        let tool = WebSearchTool::new(Some("key".into())).with_endpoint("http://127.0.0.1:9/search");
        let err = tool
            .execute(serde_json::json!({"query": "rust"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[test]
    fn parses_and_renders_results() {
        let body: BraveResponse = serde_json::from_str(
            r#"{"web":{"results":[
                {"title":"Rust","url":"https://rust-lang.org","description":"A language"},
                {"title":"Crates","description":""}
            ]}}"#,
        )
        .unwrap();
        let results = body.web.unwrap().results;
        assert_eq!(
            render("rust", &results),
            "1. Rust\n   https://rust-lang.org\n   A language\n2. Crates"
        );
    }

    #[test]
    fn empty_results() {
        let body: BraveResponse = serde_json::from_str("{}").unwrap();
        assert!(body.web.is_none());
        assert_eq!(render("zzz", &[]), "No results found for 'zzz'.");
    }

    #[test]
    fn summary_quotes_query() {
        let tool = WebSearchTool::new(None);
        assert_eq!(
            tool.summarize(&serde_json::json!({"query": "x"})),
            "Searching the web for \"x\""
        );
    }
}
