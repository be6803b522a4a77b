use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of file contents for the analysis stages
#[async_trait]
pub trait FileContentProvider: Send + Sync {
    async fn read(&self, path: &str) -> std::io::Result<String>;
}

/// Reads from the local filesystem, optionally relative to a root directory
#[derive(Debug, Clone, Default)]
pub struct FsFileProvider {
    root: Option<PathBuf>,
}

impl FsFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        match &self.root {
            Some(root) if candidate.is_relative() => root.join(candidate),
            _ => candidate.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileContentProvider for FsFileProvider {
    async fn read(&self, path: &str) -> std::io::Result<String> {
        let bytes = tokio::fs::read(self.resolve(path)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fixed in-memory file set
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileProvider {
    files: HashMap<String, String>,
}

impl InMemoryFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

#[async_trait]
impl FileContentProvider for InMemoryFileProvider {
    async fn read(&self, path: &str) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path),
            )
        })
    }
}
