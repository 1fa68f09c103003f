//! Chunking, embedding and similarity search over cached site text.
//!
//! The [`Retriever`] builds one [`VectorIndex`] per entity workspace from the
//! cached full-site text the first time it is needed, persists it through the
//! artifact cache, and answers nearest-neighbour queries against it.

pub mod chunker;
pub mod embedder;
pub mod index;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use outreach_shared::{OutreachError, PipelineConfig, Result, Workspace};
use outreach_storage::{ArtifactCache, WEBSITE_INFO};

pub use chunker::{ChunkParams, chunk_text, filter_chunks};
pub use embedder::{Embedder, OpenAiEmbedder};
pub use index::{SIMILARITY_INDEX, ScoredChunk, VectorIndex, cosine_similarity};

/// Lazily built, cached similarity search for entity workspaces.
pub struct Retriever {
    cache: Arc<ArtifactCache>,
    embedder: Arc<dyn Embedder>,
    params: ChunkParams,
}

impl Retriever {
    pub fn new(
        cache: Arc<ArtifactCache>,
        embedder: Arc<dyn Embedder>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            cache,
            embedder,
            params: ChunkParams::from_config(config),
        }
    }

    /// Load the workspace's index, building and persisting it on first use.
    ///
    /// Building requires the cached full-site text; without it this fails
    /// with [`OutreachError::MissingPrecondition`].
    #[instrument(skip_all, fields(workspace = %workspace))]
    pub async fn ensure_index(&self, workspace: &Workspace) -> Result<VectorIndex> {
        let entity = workspace.entity();
        let index = self
            .cache
            .get_or_compute(&entity, &SIMILARITY_INDEX, || self.build_index(&entity))
            .await?;

        if index.model != self.embedder.model() {
            warn!(
                index_model = %index.model,
                embedder_model = %self.embedder.model(),
                "index was built with a different embedding model"
            );
        }
        Ok(index)
    }

    /// Up to `k` chunks most similar to `query`, best first, deduplicated.
    #[instrument(skip_all, fields(workspace = %workspace, k))]
    pub async fn retrieve(&self, query: &str, workspace: &Workspace, k: usize) -> Result<Vec<String>> {
        let index = self.ensure_index(workspace).await?;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OutreachError::Embedding("no vector returned for query".into()))?;

        let hits = index.search(&query_vector, k)?;
        let chunks = filter_chunks(hits.into_iter().map(|hit| hit.text), self.params.min_len);

        info!(returned = chunks.len(), "retrieved context chunks");
        Ok(chunks)
    }

    async fn build_index(&self, entity: &Workspace) -> Result<VectorIndex> {
        let site_text = self.cache.load(entity, &WEBSITE_INFO).await?.ok_or_else(|| {
            OutreachError::MissingPrecondition(format!(
                "{entity}: website text must be fetched before the similarity index is built"
            ))
        })?;

        let chunks = chunk_text(&site_text, &self.params);
        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&chunks).await?
        };

        info!(
            chunks = chunks.len(),
            model = %self.embedder.model(),
            "built similarity index"
        );
        VectorIndex::build(self.embedder.model(), &site_text, chunks, vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use outreach_storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Letter-frequency vectors: deterministic and similarity-preserving enough for tests.
    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    impl LetterEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn model(&self) -> &str {
            "letters"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn workspace() -> Workspace {
        Workspace::for_entity(&Url::parse("https://example.com").unwrap()).unwrap()
    }

    fn config(size: usize, overlap: usize, min_len: usize) -> PipelineConfig {
        PipelineConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            min_chunk_length: min_len,
            ..PipelineConfig::default()
        }
    }

    async fn retriever_with_text(
        text: Option<&str>,
        config: &PipelineConfig,
    ) -> (Retriever, Arc<LetterEmbedder>) {
        let cache = Arc::new(ArtifactCache::new(Arc::new(MemoryStore::new())));
        if let Some(text) = text {
            let text = text.to_string();
            cache
                .get_or_compute(&workspace(), &WEBSITE_INFO, move || async move { Ok(text) })
                .await
                .unwrap();
        }
        let embedder = Arc::new(LetterEmbedder::new());
        (Retriever::new(cache, embedder.clone(), config), embedder)
    }

    #[tokio::test]
    async fn missing_site_text_is_a_precondition_error() {
        let (retriever, _) = retriever_with_text(None, &config(10, 0, 1)).await;
        let err = retriever.retrieve("anything", &workspace(), 3).await.unwrap_err();
        assert!(matches!(err, OutreachError::MissingPrecondition(_)));
    }

    #[tokio::test]
    async fn duplicate_chunks_are_returned_once() {
        let text = format!("{}{}{}", "a".repeat(10), "b".repeat(10), "a".repeat(10));
        let (retriever, _) = retriever_with_text(Some(&text), &config(10, 0, 1)).await;

        let chunks = retriever.retrieve("aaaa", &workspace(), 5).await.unwrap();

        assert!(chunks.len() <= 2);
        assert_eq!(chunks[0], "a".repeat(10));
        let unique: std::collections::HashSet<_> = chunks.iter().collect();
        assert_eq!(unique.len(), chunks.len());
    }

    #[tokio::test]
    async fn index_is_built_once_and_persisted() {
        let text = "coffee roasting in small batches. ".repeat(5);
        let (retriever, embedder) = retriever_with_text(Some(&text), &config(40, 10, 5)).await;
        let ws = workspace();

        retriever.retrieve("coffee", &ws, 2).await.unwrap();
        retriever.retrieve("batches", &ws, 2).await.unwrap();

        // One build call plus one call per query.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert!(retriever.cache.exists(&ws, &SIMILARITY_INDEX).await.unwrap());
    }

    #[tokio::test]
    async fn lead_workspace_uses_entity_index() {
        let (retriever, _) =
            retriever_with_text(Some("espresso machines and grinders"), &config(100, 10, 1)).await;
        let lead = workspace().lead("jane-doe").unwrap();

        let chunks = retriever.retrieve("espresso", &lead, 1).await.unwrap();

        assert_eq!(chunks, vec!["espresso machines and grinders".to_string()]);
    }

    #[tokio::test]
    async fn short_chunks_are_filtered_from_results() {
        let (retriever, _) = retriever_with_text(Some("tiny"), &config(100, 10, 50)).await;
        let chunks = retriever.retrieve("tiny", &workspace(), 5).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn foreign_dimension_index_is_rejected() {
        let (retriever, _) = retriever_with_text(Some("placeholder"), &config(100, 10, 1)).await;
        let ws = workspace();
        let foreign = VectorIndex::build(
            "other-model",
            "hello",
            vec!["hello world".into()],
            vec![vec![1.0, 0.0, 0.0]],
        )
        .unwrap();
        retriever
            .cache
            .get_or_compute(&ws, &SIMILARITY_INDEX, move || async move { Ok(foreign) })
            .await
            .unwrap();

        let err = retriever.retrieve("hello", &ws, 1).await.unwrap_err();
        assert!(matches!(err, OutreachError::Validation { .. }));
    }
}
