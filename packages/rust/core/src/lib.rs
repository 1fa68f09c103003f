//! Core orchestration for the outreach pipeline.
//!
//! This crate wires the crawler, artifact cache and retrieval index to the
//! external generation and profile services:
//! - [`pipeline`]: the staged, resumable message pipeline
//! - [`curation`]: link ranking through the generation service
//! - [`content`]: full/curated page text collection
//! - [`generation`] / [`profile`]: collaborator seams and HTTP clients
//! - [`prompts`]: instruction texts

pub mod content;
pub mod curation;
pub mod generation;
pub mod pipeline;
pub mod profile;
pub mod prompts;

pub use content::{PAGE_SEPARATOR, PartitionedText, fetch_and_partition};
pub use curation::{clean_structured_output, parse_curated_links, select_curated_links};
pub use generation::{OpenAiCompatibleGenerator, TextGenerator};
pub use pipeline::{
    GenerationRequest, GenerationResult, Pipeline, ProgressReporter, ScrapeResult, SilentProgress,
};
pub use profile::{HttpProfileSource, ProfileSource, flatten_profile};
pub use prompts::SUGGESTED_STYLES;
