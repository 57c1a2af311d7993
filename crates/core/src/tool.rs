//! Tool trait, the abstraction over agent capabilities.
//!
//! Tools give the agent the ability to act: search the web, read and write
//! files. A [`ToolRegistry`] owns every known tool; each agent run receives a
//! [`ToolView`], an immutable subset of the registry chosen for that run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::error::ToolError;
use crate::schema;

/// A tool description shown to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content, fed back to the model verbatim
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// The core Tool trait.
///
/// Each capability implements this trait and is registered in a
/// [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    ///
    /// `Value::Null` declares no schema, and no validation happens.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Check `arguments` before execution.
    fn validate(&self, arguments: &serde_json::Value) -> std::result::Result<(), ToolError> {
        schema::validate(arguments, &self.parameters_schema()).map_err(ToolError::InvalidArguments)
    }

    /// One-line, human-readable description of a pending call.
    fn summarize(&self, _arguments: &serde_json::Value) -> String {
        format!("Using tool `{}`", self.name())
    }

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for the prompt.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::from(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.view().definitions()
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// A view over every registered tool.
    pub fn view(&self) -> ToolView {
        ToolView {
            tools: Arc::new(
                self.tools
                    .iter()
                    .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
                    .collect(),
            ),
        }
    }

    /// A view restricted to `enabled`. Names that are not registered are
    /// skipped with a warning.
    pub fn filtered<S: AsRef<str>>(&self, enabled: &[S]) -> ToolView {
        let mut tools = BTreeMap::new();
        for name in enabled {
            let name = name.as_ref();
            match self.tools.get(name) {
                Some(tool) => {
                    tools.insert(name.to_string(), Arc::clone(tool));
                }
                None => warn!(tool = name, "Enabled tool is not registered; ignoring"),
            }
        }
        ToolView {
            tools: Arc::new(tools),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable set of tools handed to one agent run.
///
/// Cloning is cheap; concurrent runs can share the same view.
#[derive(Clone, Default)]
pub struct ToolView {
    tools: Arc<BTreeMap<String, Arc<dyn Tool>>>,
}

impl ToolView {
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolView")
            .field("tools", &self.names())
            .finish()
    }
}
