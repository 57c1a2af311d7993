//! Read-side file tools: `list_files` and `read_file`.

use async_trait::async_trait;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{Tool, ToolResult};

use crate::files::{FileError, FileService};

/// Map a file service failure onto the tool error taxonomy.
pub(crate) fn tool_error(tool_name: &str, err: FileError) -> ToolError {
    match err {
        FileError::Sandbox(e) => ToolError::PermissionDenied {
            tool_name: tool_name.into(),
            reason: e.to_string(),
        },
        other => ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: other.to_string(),
        },
    }
}

pub(crate) fn str_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub struct ListFilesTool {
    files: FileService,
}

impl ListFilesTool {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists all files in a directory. Use 'knowledge_base' or 'output' as directory names, \
         or relative paths within them."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "'knowledge_base', 'output', or a relative path within them"
                }
            },
            "required": ["directory"],
            "additionalProperties": false
        })
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        match arguments["directory"].as_str() {
            Some(dir) => format!("Listing files in `{dir}`"),
            None => "Listing files".into(),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let directory = str_arg(&arguments, "directory")?;
        let list = self
            .files
            .list(directory)
            .await
            .map_err(|e| tool_error(self.name(), e))?;

        let output = if list.files.is_empty() {
            format!("No files in {}.", list.directory)
        } else {
            let lines: Vec<String> = list.files.iter().map(|f| format!("- {f}")).collect();
            format!(
                "Files in {} ({}):\n{}",
                list.directory,
                list.total_count,
                lines.join("\n")
            )
        };

        Ok(ToolResult::ok(output))
    }
}

pub struct ReadFileTool {
    files: FileService,
}

impl ReadFileTool {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads and returns the contents of a text file. Use a path like \
         'knowledge_base/filename.txt' or 'output/filename.txt'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filepath": {
                    "type": "string",
                    "description": "Path to the file, e.g. 'knowledge_base/notes.md'"
                }
            },
            "required": ["filepath"],
            "additionalProperties": false
        })
    }

    fn summarize(&self, arguments: &serde_json::Value) -> String {
        match arguments["filepath"].as_str() {
            Some(path) => format!("Reading `{path}`"),
            None => "Reading a file".into(),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let filepath = str_arg(&arguments, "filepath")?;
        let file = self
            .files
            .read(filepath)
            .await
            .map_err(|e| tool_error(self.name(), e))?;

        let output = format!(
            "Contents of {} ({} bytes):\n{}",
            file.filepath, file.size_bytes, file.content
        );
        Ok(ToolResult::ok(output))
    }
}
