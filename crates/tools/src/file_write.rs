//! Write-side file tools: `create_file` and `edit_file`.

use async_trait::async_trait;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult};

use crate::file_read::{str_arg, tool_error};
use crate::files::{FileOperation, FileService};

fn operation_result(op: FileOperation) -> ToolResult {
    ToolResult::ok(format!("{} ({} bytes)", op.message, op.size_bytes))
}

pub struct CreateFileTool {
    files: FileService,
}

impl CreateFileTool {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Creates a new file with the given content in the output directory. \
         Use a path like 'output/filename.txt'. Fails if the file already exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "Where to create the file, e.g. 'output/report.md'"
                },
                "content": {
                    "type": "string",
                    "description": "Content of the new file"
                }
            },
            "required": ["filepath", "content"],
            "additionalProperties": false
        })
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        match arguments["filepath"].as_str() {
            Some(path) => format!("Creating `{path}`"),
            None => "Creating a file".into(),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filepath = str_arg(&arguments, "filepath")?;
        let content = str_arg(&arguments, "content")?;
        let op = self
            .files
            .create(filepath, content)
            .await
            .map_err(|e| tool_error(self.name(), e))?;
        Ok(operation_result(op))
    }
}

pub struct EditFileTool {
    files: FileService,
}

impl EditFileTool {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edits a file in 'knowledge_base/' or 'output/' by replacing its content, \
         or appending to it when 'append' is true."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "File to edit, e.g. 'output/report.md'"
                },
                "content": {
                    "type": "string",
                    "description": "New content (replaces the file unless append is true)"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of replacing (default false)"
                }
            },
            "required": ["filepath", "content"],
            "additionalProperties": false
        })
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        let verb = if arguments["append"].as_bool().unwrap_or(false) {
            "Appending to"
        } else {
            "Editing"
        };
        match arguments["filepath"].as_str() {
            Some(path) => format!("{verb} `{path}`"),
            None => format!("{verb} a file"),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filepath = str_arg(&arguments, "filepath")?;
        let content = str_arg(&arguments, "content")?;
        let append = arguments["append"].as_bool().unwrap_or(false);
        let op = self
            .files
            .edit(filepath, content, append)
            .await
            .map_err(|e| tool_error(self.name(), e))?;
        Ok(operation_result(op))
    }
}
