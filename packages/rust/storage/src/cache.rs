//! Compute-if-absent cache over an [`ArtifactStore`].
//!
//! Each (workspace, artifact) pair is computed at most once per process:
//! callers for the same key are serialised on a per-key async mutex, and the
//! later ones observe the stored artifact instead of recomputing it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use outreach_shared::{Result, Workspace};

use crate::artifact::{Artifact, ArtifactKey};
use crate::store::ArtifactStore;

pub struct ArtifactCache {
    store: Arc<dyn ArtifactStore>,
    locks: Mutex<HashMap<ArtifactKey, Arc<Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub async fn exists<A: Artifact>(&self, workspace: &Workspace, artifact: &A) -> Result<bool> {
        self.store
            .exists(&ArtifactKey::new(workspace, artifact.name()))
            .await
    }

    /// Load and decode an artifact without computing it.
    pub async fn load<A: Artifact>(
        &self,
        workspace: &Workspace,
        artifact: &A,
    ) -> Result<Option<A::Value>> {
        let key = ArtifactKey::new(workspace, artifact.name());
        match self.store.load(&key).await? {
            Some(raw) => Ok(Some(artifact.decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Return the stored artifact, or run `compute`, store its result and return it.
    ///
    /// A failing `compute` stores nothing and its error is returned unchanged.
    pub async fn get_or_compute<A, F, Fut>(
        &self,
        workspace: &Workspace,
        artifact: &A,
        compute: F,
    ) -> Result<A::Value>
    where
        A: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<A::Value>>,
    {
        let key = ArtifactKey::new(workspace, artifact.name());
        let guard = self.lock_key(&key).await;
        let result = self.load_or_compute(&key, artifact, compute).await;
        drop(guard);
        self.release(&[&key]).await;
        result
    }

    /// Two-artifact variant for stages that produce both outputs at once.
    ///
    /// The stage is skipped only when both artifacts exist; otherwise both are
    /// recomputed and stored.
    pub async fn get_or_compute_pair<A, B, F, Fut>(
        &self,
        workspace: &Workspace,
        first: &A,
        second: &B,
        compute: F,
    ) -> Result<(A::Value, B::Value)>
    where
        A: Artifact,
        B: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(A::Value, B::Value)>>,
    {
        let first_key = ArtifactKey::new(workspace, first.name());
        let second_key = ArtifactKey::new(workspace, second.name());

        // Fixed acquisition order keeps concurrent pair calls deadlock-free.
        let guards = if first_key <= second_key {
            let a = self.lock_key(&first_key).await;
            (a, self.lock_key(&second_key).await)
        } else {
            let b = self.lock_key(&second_key).await;
            (self.lock_key(&first_key).await, b)
        };
        let result = self
            .load_or_compute_pair(&first_key, first, &second_key, second, compute)
            .await;
        drop(guards);
        self.release(&[&first_key, &second_key]).await;
        result
    }

    async fn load_or_compute<A, F, Fut>(
        &self,
        key: &ArtifactKey,
        artifact: &A,
        compute: F,
    ) -> Result<A::Value>
    where
        A: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<A::Value>>,
    {
        if let Some(raw) = self.store.load(key).await? {
            debug!(artifact = %key, "cache hit");
            return artifact.decode(&raw);
        }

        info!(artifact = %key, "cache miss, computing");
        let value = compute().await?;
        self.store.store(key, &artifact.encode(&value)?).await?;
        Ok(value)
    }

    async fn load_or_compute_pair<A, B, F, Fut>(
        &self,
        first_key: &ArtifactKey,
        first: &A,
        second_key: &ArtifactKey,
        second: &B,
        compute: F,
    ) -> Result<(A::Value, B::Value)>
    where
        A: Artifact,
        B: Artifact,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(A::Value, B::Value)>>,
    {
        let stored_first = self.store.load(first_key).await?;
        let stored_second = self.store.load(second_key).await?;
        if let (Some(raw_a), Some(raw_b)) = (stored_first, stored_second) {
            debug!(first = %first_key, second = %second_key, "cache hit");
            return Ok((first.decode(&raw_a)?, second.decode(&raw_b)?));
        }

        info!(first = %first_key, second = %second_key, "cache miss, computing");
        let (value_a, value_b) = compute().await?;
        self.store.store(first_key, &first.encode(&value_a)?).await?;
        self.store
            .store(second_key, &second.encode(&value_b)?)
            .await?;
        Ok((value_a, value_b))
    }

    async fn lock_key(&self, key: &ArtifactKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget per-key locks that no caller holds or waits on.
    async fn release(&self, keys: &[&ArtifactKey]) {
        let mut locks = self.locks.lock().await;
        for key in keys {
            // The map's own reference is the only one left once every guard dropped.
            if locks.get(*key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(*key);
            }
        }
    }
}
