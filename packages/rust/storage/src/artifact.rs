//! Named artifacts and their on-disk codecs.
//!
//! Every stage output has a stable file name inside a workspace. Link
//! collections are stored as a JSON object wrapping an array under one named
//! key; plain text artifacts are stored verbatim.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use outreach_shared::{OutreachError, Result, Workspace};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Location of one artifact: a workspace plus a `/`-separated artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub workspace: Workspace,
    pub name: String,
}

impl ArtifactKey {
    pub fn new(workspace: &Workspace, name: &str) -> Self {
        Self {
            workspace: workspace.clone(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workspace, self.name)
    }
}

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// A named artifact kind with a codec between its value and stored text.
pub trait Artifact: Send + Sync {
    type Value: Send;

    /// Artifact name within its workspace (may contain `/`).
    fn name(&self) -> &str;

    fn encode(&self, value: &Self::Value) -> Result<String>;

    fn decode(&self, raw: &str) -> Result<Self::Value>;
}

/// Raw UTF-8 text artifact.
#[derive(Debug, Clone, Copy)]
pub struct TextArtifact {
    name: &'static str,
}

impl TextArtifact {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Artifact for TextArtifact {
    type Value = String;

    fn name(&self) -> &str {
        self.name
    }

    fn encode(&self, value: &String) -> Result<String> {
        Ok(value.clone())
    }

    fn decode(&self, raw: &str) -> Result<String> {
        Ok(raw.to_string())
    }
}

/// Link collection stored as `{"<key>": [url, ...]}`.
#[derive(Debug, Clone, Copy)]
pub struct LinkArtifact {
    name: &'static str,
    key: &'static str,
}

impl LinkArtifact {
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self { name, key }
    }

    /// JSON key wrapping the array.
    pub fn key(&self) -> &str {
        self.key
    }
}

impl Artifact for LinkArtifact {
    type Value = Vec<String>;

    fn name(&self) -> &str {
        self.name
    }

    fn encode(&self, value: &Vec<String>) -> Result<String> {
        let mut doc = serde_json::Map::new();
        doc.insert(self.key.to_string(), serde_json::json!(value));
        serde_json::to_string_pretty(&doc).map_err(|e| {
            OutreachError::Storage(format!("failed to encode {}: {e}", self.name))
        })
    }

    fn decode(&self, raw: &str) -> Result<Vec<String>> {
        let mut doc: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)
            .map_err(|e| OutreachError::parse(format!("{}: {e}", self.name)))?;
        let links = doc
            .remove(self.key)
            .ok_or_else(|| OutreachError::parse(format!("{}: missing key '{}'", self.name, self.key)))?;
        serde_json::from_value(links)
            .map_err(|e| OutreachError::parse(format!("{}: '{}' is not a list of strings: {e}", self.name, self.key)))
    }
}

/// Arbitrary serde value stored as JSON.
pub struct JsonArtifact<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonArtifact<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }
}

impl<T> Artifact for JsonArtifact<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    type Value = T;

    fn name(&self) -> &str {
        self.name
    }

    fn encode(&self, value: &T) -> Result<String> {
        serde_json::to_string(value)
            .map_err(|e| OutreachError::Storage(format!("failed to encode {}: {e}", self.name)))
    }

    fn decode(&self, raw: &str) -> Result<T> {
        serde_json::from_str(raw).map_err(|e| OutreachError::parse(format!("{}: {e}", self.name)))
    }
}

// ---------------------------------------------------------------------------
// Canonical artifacts
// ---------------------------------------------------------------------------

/// Every same-site link found by the crawler (entity workspace).
pub const ALL_LINKS: LinkArtifact = LinkArtifact::new("all_links.json", "all_links");
/// Links chosen for the entity summary (entity workspace).
pub const SUMMARY_LINKS: LinkArtifact = LinkArtifact::new("summary_links.json", "summary_links");
/// Concatenated text of every crawled page.
pub const WEBSITE_INFO: TextArtifact = TextArtifact::new("website_info.txt");
/// Concatenated text of the curated pages.
pub const WEBSITE_SUMMARY_INFO: TextArtifact = TextArtifact::new("website_summary_info.txt");
pub const COMPANY_SUMMARY: TextArtifact = TextArtifact::new("company_summary_and_facts.txt");
/// Flattened profile text (lead workspace).
pub const LEAD_INFO: TextArtifact = TextArtifact::new("lead_info.txt");
pub const LEAD_SUMMARY: TextArtifact = TextArtifact::new("lead_summary_and_facts.txt");
pub const PERSONALIZED_MESSAGE: TextArtifact = TextArtifact::new("personalized_message.txt");

/// Name of the persisted similarity index inside an entity workspace.
pub const SIMILARITY_INDEX_NAME: &str = "RAG/faiss_index/index.json";
