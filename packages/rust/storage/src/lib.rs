//! Artifact persistence for the outreach pipeline.
//!
//! Stage outputs are named [`Artifact`]s stored per [`Workspace`] through an
//! [`ArtifactStore`]. The [`ArtifactCache`] adds compute-if-absent semantics
//! with per-key single-flight on top of any store.
//!
//! Stores:
//! - [`FsStore`]: one file per artifact, atomic temp-file-then-rename writes
//! - [`SqlStore`]: libSQL database file with schema migrations
//! - [`MemoryStore`]: in-process map for tests
//!
//! [`Workspace`]: outreach_shared::Workspace

pub mod artifact;
pub mod cache;
pub mod fs;
pub mod memory;
mod migrations;
pub mod sql;
pub mod store;

pub use artifact::{
    ALL_LINKS, Artifact, ArtifactKey, COMPANY_SUMMARY, JsonArtifact, LEAD_INFO, LEAD_SUMMARY,
    LinkArtifact, PERSONALIZED_MESSAGE, SIMILARITY_INDEX_NAME, SUMMARY_LINKS, TextArtifact,
    WEBSITE_INFO, WEBSITE_SUMMARY_INFO,
};
pub use cache::ArtifactCache;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use sql::SqlStore;
pub use store::ArtifactStore;
