//! The key-value seam between the artifact cache and its backing storage.

use async_trait::async_trait;

use outreach_shared::Result;

use crate::artifact::ArtifactKey;

/// Persistent string storage addressed by [`ArtifactKey`].
///
/// `store` must be all-or-nothing: a reader never observes a partially
/// written value.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool>;

    /// Stored body, or `None` when the key is absent.
    async fn load(&self, key: &ArtifactKey) -> Result<Option<String>>;

    async fn store(&self, key: &ArtifactKey, body: &str) -> Result<()>;
}
