//! Sandboxed file operations shared by the file tools and the HTTP API.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sandbox::{FileRoots, SandboxError};

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Directory not found: '{0}'")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: '{0}'")]
    NotADirectory(String),

    #[error("File not found: '{0}'")]
    FileNotFound(String),

    #[error("Path is not a file: '{0}'")]
    NotAFile(String),

    #[error("File already exists: '{0}'. Use edit_file to modify existing files.")]
    AlreadyExists(String),

    #[error("File '{0}' is not a valid text file (UTF-8 encoding required)")]
    NotText(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn io(path: &str) -> impl FnOnce(std::io::Error) -> FileError + '_ {
    move |source| FileError::Io {
        path: path.to_string(),
        source,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
    pub directory: String,
    pub files: Vec<String>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub filepath: String,
    pub content: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOperation {
    pub filepath: String,
    pub operation: String,
    pub message: String,
    pub size_bytes: u64,
}

/// File operations confined to a [`FileRoots`] pair.
#[derive(Debug, Clone)]
pub struct FileService {
    roots: FileRoots,
}

impl FileService {
    pub fn new(roots: FileRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &FileRoots {
        &self.roots
    }

    /// List regular files (not subdirectories) in a directory, sorted by name.
    pub async fn list(&self, directory: &str) -> Result<FileList, FileError> {
        let resolved = self.roots.resolve(directory)?;
        let meta = tokio::fs::metadata(&resolved.path)
            .await
            .map_err(|_| FileError::DirectoryNotFound(directory.into()))?;
        if !meta.is_dir() {
            return Err(FileError::NotADirectory(directory.into()));
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&resolved.path)
            .await
            .map_err(io(directory))?;
        while let Some(entry) = entries.next_entry().await.map_err(io(directory))? {
            let file_type = entry.file_type().await.map_err(io(directory))?;
            if file_type.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        info!(count = files.len(), path = %resolved.path.display(), "Listed files");
        Ok(FileList {
            directory: directory.into(),
            total_count: files.len(),
            files,
        })
    }

    /// Read a UTF-8 text file.
    pub async fn read(&self, filepath: &str) -> Result<FileContent, FileError> {
        let resolved = self.roots.resolve(filepath)?;
        let meta = tokio::fs::metadata(&resolved.path)
            .await
            .map_err(|_| FileError::FileNotFound(filepath.into()))?;
        if !meta.is_file() {
            return Err(FileError::NotAFile(filepath.into()));
        }

        let bytes = tokio::fs::read(&resolved.path).await.map_err(io(filepath))?;
        let content =
            String::from_utf8(bytes).map_err(|_| FileError::NotText(filepath.into()))?;

        info!(path = %resolved.path.display(), size = meta.len(), "Read file");
        Ok(FileContent {
            filepath: filepath.into(),
            content,
            size_bytes: meta.len(),
        })
    }

    /// Create a new file under `output/`. Existing files are never overwritten.
    pub async fn create(&self, filepath: &str, content: &str) -> Result<FileOperation, FileError> {
        let resolved = self.roots.resolve_output(filepath)?;
        if tokio::fs::try_exists(&resolved.path).await.unwrap_or(false) {
            return Err(FileError::AlreadyExists(filepath.into()));
        }
        if let Some(parent) = resolved.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io(filepath))?;
        }
        tokio::fs::write(&resolved.path, content)
            .await
            .map_err(io(filepath))?;
        let size_bytes = size_of(&resolved.path, filepath).await?;

        info!(path = %resolved.path.display(), size = size_bytes, "Created file");
        Ok(FileOperation {
            filepath: filepath.into(),
            operation: "create".into(),
            message: format!("File '{filepath}' created successfully"),
            size_bytes,
        })
    }

    /// Replace or append to a file under either root.
    pub async fn edit(
        &self,
        filepath: &str,
        content: &str,
        append: bool,
    ) -> Result<FileOperation, FileError> {
        let resolved = self.roots.resolve(filepath)?;
        if let Some(parent) = resolved.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io(filepath))?;
        }

        let mode = if append { "append" } else { "replace" };
        if append {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&resolved.path)
                .await
                .map_err(io(filepath))?;
            file.write_all(content.as_bytes())
                .await
                .map_err(io(filepath))?;
            file.flush().await.map_err(io(filepath))?;
        } else {
            tokio::fs::write(&resolved.path, content)
                .await
                .map_err(io(filepath))?;
        }
        let size_bytes = size_of(&resolved.path, filepath).await?;

        info!(path = %resolved.path.display(), mode, size = size_bytes, "Edited file");
        Ok(FileOperation {
            filepath: filepath.into(),
            operation: format!("edit_{mode}"),
            message: format!("File '{filepath}' edited successfully ({mode})"),
            size_bytes,
        })
    }
}

async fn size_of(path: &std::path::Path, filepath: &str) -> Result<u64, FileError> {
    Ok(tokio::fs::metadata(path).await.map_err(io(filepath))?.len())
}
