//! Application configuration for the outreach pipeline.
//!
//! User config lives at `~/.outreach/outreach.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutreachError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "outreach.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".outreach";

// ---------------------------------------------------------------------------
// Config structs (matching outreach.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Pipeline tuning shared by every component.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Text generation service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Profile service settings.
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory holding one workspace per entity.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DefaultsConfig {
    /// Resolve `data_dir`, expanding a leading `~/`.
    pub fn data_dir_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

fn default_data_dir() -> String {
    "data".into()
}

/// `[pipeline]` section.
///
/// Passed by value into each component at construction; nothing reads these
/// values from globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model used for curation, summaries and the final message.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Model used to embed chunks and queries.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Chunk window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by neighbouring chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks whose trimmed length is below this are discarded.
    #[serde(default = "default_min_chunk_length")]
    pub min_chunk_length: usize,

    /// Upper bound on the curated link subset.
    #[serde(default = "default_max_curated_links")]
    pub max_curated_links: usize,

    /// Breadth-first crawl depth from the seed URL.
    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,

    /// Number of chunks retrieved as grounding context.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_length: default_min_chunk_length(),
            max_curated_links: default_max_curated_links(),
            crawl_depth: default_crawl_depth(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

impl PipelineConfig {
    /// Reject combinations the chunker and curator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(OutreachError::config("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(OutreachError::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.min_chunk_length > self.chunk_size {
            return Err(OutreachError::config(format!(
                "min_chunk_length ({}) must not exceed chunk_size ({})",
                self.min_chunk_length, self.chunk_size
            )));
        }
        if self.max_curated_links == 0 {
            return Err(OutreachError::config(
                "max_curated_links must be greater than 0",
            ));
        }
        if self.retrieval_k == 0 {
            return Err(OutreachError::config("retrieval_k must be greater than 0"));
        }
        Ok(())
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_min_chunk_length() -> usize {
    50
}
fn default_max_curated_links() -> usize {
    10
}
fn default_crawl_depth() -> u32 {
    2
}
fn default_retrieval_k() -> usize {
    5
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base (OpenAI, OpenRouter, local servers).
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// `[embeddings]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// OpenAI-compatible API base serving `/embeddings`.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum inputs per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_batch_size() -> usize {
    64
}

/// `[profile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Base URL of the profile service (`/profiles/<id>` and `/profiles/<id>/posts`).
    #[serde(default = "default_profile_base_url")]
    pub base_url: String,

    /// Name of the env var holding the profile service token.
    #[serde(default = "default_profile_key_env")]
    pub api_key_env: String,

    /// Number of recent posts appended to the profile text.
    #[serde(default = "default_post_count")]
    pub post_count: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            base_url: default_profile_base_url(),
            api_key_env: default_profile_key_env(),
            post_count: default_post_count(),
        }
    }
}

fn default_profile_base_url() -> String {
    "http://localhost:8090".into()
}
fn default_profile_key_env() -> String {
    "PROFILE_API_TOKEN".into()
}
fn default_post_count() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.outreach/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| OutreachError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.outreach/outreach.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OutreachError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        OutreachError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.pipeline.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OutreachError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OutreachError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OutreachError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty secret from the named env var.
pub fn api_key_from_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(OutreachError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that the generation and embedding API keys are available.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    api_key_from_env(&config.llm.api_key_env)?;
    api_key_from_env(&config.embeddings.api_key_env)?;
    Ok(())
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}
