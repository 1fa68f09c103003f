//! Persisted exact-search vector index over the chunks of one workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use outreach_shared::{OutreachError, Result};
use outreach_storage::{JsonArtifact, SIMILARITY_INDEX_NAME};

/// Artifact holding the serialized [`VectorIndex`] of an entity workspace.
pub const SIMILARITY_INDEX: JsonArtifact<VectorIndex> = JsonArtifact::new(SIMILARITY_INDEX_NAME);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub text: String,
    pub vector: Vec<f32>,
}

/// A chunk returned by a query together with its cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model that produced the vectors.
    pub model: String,
    pub dimension: usize,
    pub built_at: DateTime<Utc>,
    /// SHA-256 of the text the chunks were cut from.
    pub source_sha256: String,
    pub entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Pair chunks with their vectors. All vectors must share one dimension.
    pub fn build(
        model: &str,
        source_text: &str,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(OutreachError::validation(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(OutreachError::validation(format!(
                "mixed vector dimensions: {} and {}",
                dimension,
                bad.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| IndexEntry { text, vector })
            .collect();

        Ok(Self {
            model: model.to_string(),
            dimension,
            built_at: Utc::now(),
            source_sha256: sha256_hex(source_text),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` entries most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(OutreachError::validation(format!(
                "query has dimension {} but index '{}' has {}",
                query.len(),
                self.model,
                self.dimension
            )));
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                text: entry.text.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn sha256_hex(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
