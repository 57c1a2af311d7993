//! Path sandboxing for the file tools.
//!
//! Callers name files relative to one of two roots: `knowledge_base/...`
//! or `output/...`. A path that names neither is tried under the knowledge
//! base first (if it exists there), then under output. Traversal segments
//! and absolute paths are rejected before anything touches the filesystem,
//! and the resolved location must still sit inside its root once symlinks
//! are followed.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path fails sandbox checks.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Path '{path}' must be relative and cannot contain '..'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the allowed directories")]
    OutsideRoots { path: String },

    #[error("Path '{path}' must be under '{root}/'")]
    WrongRoot { path: String, root: &'static str },

    #[error("Failed to resolve '{path}': {reason}")]
    ResolveFailed { path: String, reason: String },
}

/// One of the two directories the file tools may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    KnowledgeBase,
    Output,
}

impl Root {
    pub fn label(&self) -> &'static str {
        match self {
            Root::KnowledgeBase => "knowledge_base",
            Root::Output => "output",
        }
    }
}

/// A path that passed sandbox checks.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub root: Root,
    pub path: PathBuf,
}

/// The pair of directories exposed to the file tools.
#[derive(Debug, Clone)]
pub struct FileRoots {
    knowledge_base: PathBuf,
    output: PathBuf,
}

impl FileRoots {
    pub fn new(knowledge_base: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            knowledge_base: knowledge_base.into(),
            output: output.into(),
        }
    }

    pub fn knowledge_base(&self) -> &Path {
        &self.knowledge_base
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn dir(&self, root: Root) -> &Path {
        match root {
            Root::KnowledgeBase => &self.knowledge_base,
            Root::Output => &self.output,
        }
    }

    /// Create both roots if they do not exist yet.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [&self.knowledge_base, &self.output] {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                tracing::info!(path = %dir.display(), "Created file tool directory");
            }
        }
        Ok(())
    }

    /// Resolve a caller-supplied path to a location inside one of the roots.
    pub fn resolve(&self, input: &str) -> Result<Resolved, SandboxError> {
        let normalized = input.replace('\\', "/");
        let raw = Path::new(&normalized);
        if raw.is_absolute()
            || normalized.starts_with('/')
            || raw.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(SandboxError::PathTraversal { path: input.into() });
        }

        let normalized = normalized.trim_end_matches('/');
        let (root, relative) = match normalized.split_once('/') {
            _ if normalized == "knowledge_base" => (Root::KnowledgeBase, ""),
            _ if normalized == "output" => (Root::Output, ""),
            Some(("knowledge_base", rest)) => (Root::KnowledgeBase, rest),
            Some(("output", rest)) => (Root::Output, rest),
            _ => {
                let under_kb = self.knowledge_base.join(normalized);
                if under_kb.exists() {
                    (Root::KnowledgeBase, normalized)
                } else {
                    (Root::Output, normalized)
                }
            }
        };

        let candidate = if relative.is_empty() {
            self.dir(root).to_path_buf()
        } else {
            self.dir(root).join(relative)
        };

        let root_dir = canonical(self.dir(root), input)?;
        let resolved = canonical(&candidate, input)?;
        if !resolved.starts_with(&root_dir) {
            return Err(SandboxError::OutsideRoots { path: input.into() });
        }

        Ok(Resolved {
            root,
            path: resolved,
        })
    }

    /// Resolve a path that must live under `output/`.
    pub fn resolve_output(&self, input: &str) -> Result<Resolved, SandboxError> {
        let normalized = input.replace('\\', "/");
        if !normalized.starts_with("output/") {
            return Err(SandboxError::WrongRoot {
                path: input.into(),
                root: Root::Output.label(),
            });
        }
        self.resolve(input)
    }
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn canonical(path: &Path, input: &str) -> Result<PathBuf, SandboxError> {
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
        if existing.as_os_str().is_empty() {
            existing = PathBuf::from(".");
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| SandboxError::ResolveFailed {
            path: input.into(),
            reason: e.to_string(),
        })?;
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
