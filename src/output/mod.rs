//! Artifact storage
//!
//! Artifacts live at `<root>/<category>/<artifact_name>` and are write-once:
//! an existing file is never truncated or replaced. Writes go to a temporary
//! file in the target directory that is then linked into place without
//! clobbering, so a failed or cancelled unit never leaves a partial artifact.

use crate::endpoint::Category;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Target artifact is already present
    #[error("artifact already exists: {0}")]
    AlreadyExists(PathBuf),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Write-once JSON artifact store rooted at a data directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `root`; directories are created lazily on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding artifacts of `category`
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Full path of an artifact
    pub fn path_for(&self, category: Category, artifact_name: &str) -> PathBuf {
        self.category_dir(category).join(artifact_name)
    }

    /// Whether the artifact is already persisted
    ///
    /// Read-only probe; safe to run concurrently with other probes and writes.
    pub async fn exists(&self, category: Category, artifact_name: &str) -> bool {
        let path = self.path_for(category, artifact_name);
        let exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if exists {
            info!(
                category = %category,
                artifact = artifact_name,
                "Artifact already exists"
            );
        }
        exists
    }

    /// Persist `body` as pretty-printed JSON, refusing to overwrite
    ///
    /// Returns the final path, or [`OutputError::AlreadyExists`] when another
    /// writer got there first.
    pub async fn save(
        &self,
        category: Category,
        artifact_name: &str,
        body: &Value,
    ) -> OutputResult<PathBuf> {
        let json = serde_json::to_string_pretty(body)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        let dir = self.category_dir(category);
        let path = dir.join(artifact_name);

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_new_file(&dir, &target, json.as_bytes()))
            .await
            .map_err(|e| OutputError::IoError(format!("write task failed: {e}")))??;

        info!(path = %path.display(), "Artifact saved");
        Ok(path)
    }
}

/// Atomically create `path` with `contents` unless it already exists
fn write_new_file(dir: &Path, path: &Path, contents: &[u8]) -> OutputResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| OutputError::IoError(e.to_string()))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;

    temp_file
        .write_all(contents)
        .map_err(|e| OutputError::IoError(format!("Failed to write to temp file: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| OutputError::IoError(format!("Failed to flush temp file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| OutputError::IoError(format!("Failed to sync temp file: {e}")))?;

    // The temp file is removed on drop if the link fails
    temp_file.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            OutputError::AlreadyExists(path.to_path_buf())
        } else {
            OutputError::IoError(format!("Failed to persist temp file: {}", e.error))
        }
    })?;

    if let Ok(parent) = std::fs::File::open(dir) {
        let _ = parent.sync_all();
    }

    debug!(path = %path.display(), bytes = contents.len(), "Artifact written");
    Ok(())
}
