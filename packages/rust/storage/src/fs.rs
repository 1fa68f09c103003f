//! Filesystem store: one file per artifact under `<root>/<workspace>/<name>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use outreach_shared::{OutreachError, Result};

use crate::artifact::ArtifactKey;
use crate::store::ArtifactStore;

/// Stores artifacts as plain files below a data directory.
///
/// Writes go to a uniquely named temp file in the target directory and are
/// then renamed into place, so a crash mid-write never leaves a truncated
/// artifact behind.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the file backing `key`.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        let mut path = self.root.join(key.workspace.relative_path());
        for segment in key.name.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| OutreachError::io(&path, e))
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OutreachError::io(&path, e)),
        }
    }

    async fn store(&self, key: &ArtifactKey, body: &str) -> Result<()> {
        let path = self.path_for(key);
        let parent = path
            .parent()
            .ok_or_else(|| OutreachError::Storage(format!("no parent directory for {key}")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| OutreachError::io(parent, e))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let tmp = parent.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| OutreachError::io(&tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(OutreachError::io(&path, e));
        }

        debug!(path = %path.display(), bytes = body.len(), "artifact written");
        Ok(())
    }
}
