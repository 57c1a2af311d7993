//! Built-in tool implementations for stepwise.
//!
//! Tools give the agent the ability to interact with the world: search the
//! web, and list, read, create or edit files inside two sandboxed
//! directories (`knowledge_base/` and `output/`).

pub mod file_read;
pub mod file_write;
pub mod files;
pub mod sandbox;
pub mod web_search;

use stepwise_config::ToolsConfig;
use stepwise_core::tool::ToolRegistry;

pub use files::FileService;
pub use sandbox::FileRoots;

/// Build the file service for the configured roots, creating them if needed.
pub fn file_service(config: &ToolsConfig) -> std::io::Result<FileService> {
    let roots = FileRoots::new(&config.knowledge_base_path, &config.output_path);
    roots.ensure()?;
    Ok(FileService::new(roots))
}

/// Create a tool registry with all built-in tools.
pub fn default_registry(config: &ToolsConfig) -> std::io::Result<ToolRegistry> {
    let files = file_service(config)?;
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(web_search::WebSearchTool::new(
        config.brave_api_key.clone(),
    )));
    registry.register(Box::new(file_read::ListFilesTool::new(files.clone())));
    registry.register(Box::new(file_read::ReadFileTool::new(files.clone())));
    registry.register(Box::new(file_write::CreateFileTool::new(files.clone())));
    registry.register(Box::new(file_write::EditFileTool::new(files)));
    Ok(registry)
}
