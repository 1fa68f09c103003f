//! Shared types, error model, and configuration for the outreach pipeline.
//!
//! This crate is the foundation depended on by all other outreach crates.
//! It provides:
//! - [`OutreachError`]: the unified error type
//! - [`Workspace`]: deterministic per-entity / per-lead artifact locations
//! - URL canonicalization ([`canonical_link`], [`same_site`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod links;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EmbeddingsConfig, LlmConfig, PipelineConfig, ProfileConfig,
    api_key_from_env, config_dir, config_file_path, init_config, load_config, load_config_from,
    validate_api_key,
};
pub use error::{OutreachError, Result};
pub use links::{canonical_link, canonicalize_str, parse_seed_url, same_site, site_identity};
pub use types::Workspace;
