//! In-memory store for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use outreach_shared::Result;

use crate::artifact::ArtifactKey;
use crate::store::ArtifactStore;

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<ArtifactKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &ArtifactKey, body: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.clone(), body.to_string());
        Ok(())
    }
}
