//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use outreach_core::{
    GenerationRequest, GenerationResult, HttpProfileSource, OpenAiCompatibleGenerator, Pipeline,
    ProgressReporter, SUGGESTED_STYLES,
};
use outreach_crawler::PageFetcher;
use outreach_retrieval::OpenAiEmbedder;
use outreach_shared::{
    AppConfig, api_key_from_env, init_config, load_config, parse_seed_url, validate_api_key,
};
use outreach_storage::{ArtifactCache, ArtifactStore, FsStore, SqlStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Outreach: personalized sales messages from a company website and a lead profile.
#[derive(Parser)]
#[command(
    name = "outreach",
    version,
    about = "Generate personalized outreach messages from a company website and a lead profile.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Root directory for cached artifacts (overrides the config file).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Artifact backend: one file per artifact, or a single libSQL database.
    #[arg(long, default_value = "fs", global = true)]
    pub store: StoreKind,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Artifact storage backend.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum StoreKind {
    Fs,
    Sql,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate (or print the cached) message for one lead.
    Generate {
        /// Company website to research.
        #[arg(long)]
        url: String,

        /// Lead identifier understood by the profile service.
        #[arg(long)]
        lead: String,

        /// Message style, e.g. Professional, Friendly or Intriguing.
        #[arg(long, default_value = "Professional")]
        style: String,

        /// Additional notes for the message writer.
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Crawl a website and cache its links and text without generating anything.
    Scrape {
        /// Website to crawl.
        #[arg(long)]
        url: String,
    },

    /// Search a scraped website's text for passages similar to a query.
    Query {
        /// Website that was scraped.
        #[arg(long)]
        url: String,

        /// Query text.
        #[arg(long)]
        text: String,

        /// Number of passages (defaults to the configured retrieval_k).
        #[arg(short)]
        k: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "outreach=info",
        1 => "outreach=debug",
        _ => "outreach=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let Cli {
        data_dir,
        store,
        command,
        ..
    } = cli;
    let storage = StorageOptions { data_dir, store };

    match command {
        Command::Generate {
            url,
            lead,
            style,
            notes,
        } => cmd_generate(&storage, &url, &lead, &style, &notes).await,
        Command::Scrape { url } => cmd_scrape(&storage, &url).await,
        Command::Query { url, text, k } => cmd_query(&storage, &url, &text, k).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

struct StorageOptions {
    data_dir: Option<PathBuf>,
    store: StoreKind,
}

/// Build the pipeline from the config file, env-held keys and CLI overrides.
async fn build_pipeline(config: &AppConfig, storage: &StorageOptions) -> Result<Pipeline> {
    validate_api_key(config)?;

    let data_dir = storage
        .data_dir
        .clone()
        .unwrap_or_else(|| config.defaults.data_dir_path());

    let store: Arc<dyn ArtifactStore> = match storage.store {
        StoreKind::Fs => Arc::new(FsStore::new(&data_dir)),
        StoreKind::Sql => Arc::new(SqlStore::open(&data_dir.join("outreach.db")).await?),
    };
    info!(data_dir = %data_dir.display(), store = ?storage.store, "artifact store ready");

    let generator = OpenAiCompatibleGenerator::new(
        &api_key_from_env(&config.llm.api_key_env)?,
        &config.llm.base_url,
        &config.pipeline.generation_model,
    )?;
    let embedder = OpenAiEmbedder::new(
        &api_key_from_env(&config.embeddings.api_key_env)?,
        &config.embeddings.base_url,
        &config.pipeline.embedding_model,
        config.embeddings.batch_size,
    )?;
    let profile_token = std::env::var(&config.profile.api_key_env).ok();
    let profiles = HttpProfileSource::new(
        &config.profile.base_url,
        profile_token.as_deref(),
        config.profile.post_count,
    )?;

    let pipeline = Pipeline::new(
        Arc::new(ArtifactCache::new(store)),
        PageFetcher::new()?,
        Arc::new(generator),
        Arc::new(profiles),
        Arc::new(embedder),
        config.pipeline.clone(),
    )?;
    Ok(pipeline)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(
    storage: &StorageOptions,
    url: &str,
    lead: &str,
    style: &str,
    notes: &str,
) -> Result<()> {
    let config = load_config()?;
    let entity_url = parse_seed_url(url)?;

    if !SUGGESTED_STYLES.contains(&style) {
        info!(style, "using custom message style");
    }

    let pipeline = build_pipeline(&config, storage).await?;
    let request = GenerationRequest {
        entity_url,
        lead_id: lead.to_string(),
        style: style.to_string(),
        notes: notes.to_string(),
    };

    info!(url, lead, style, "generating message");

    let reporter = CliProgress::new();
    let result = pipeline.generate_message(&request, &reporter).await;
    reporter.finish();
    let result = result?;

    eprintln!();
    eprintln!("  Workspace: {}", result.workspace);
    eprintln!(
        "  Source:    {}",
        if result.from_cache { "cached" } else { "generated" }
    );
    eprintln!("  Model:     {}", result.model);
    eprintln!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    eprintln!();
    println!("{}", result.message);

    Ok(())
}

async fn cmd_scrape(storage: &StorageOptions, url: &str) -> Result<()> {
    let config = load_config()?;
    let seed = parse_seed_url(url)?;
    let pipeline = build_pipeline(&config, storage).await?;

    info!(url, "scraping website");

    let reporter = CliProgress::new();
    let result = pipeline.scrape(&seed, &reporter).await;
    reporter.finish();
    let result = result?;

    println!();
    println!("  Website scraped!");
    println!("  Workspace:     {}", result.workspace);
    println!("  Links:         {}", result.links.len());
    println!("  Curated links: {}", result.curated_links.len());
    println!("  Site text:     {} chars", result.full_text_chars);
    println!("  Curated text:  {} chars", result.curated_text_chars);
    println!("  Time:          {:.1}s", result.elapsed.as_secs_f64());
    println!();
    for link in &result.curated_links {
        println!("  * {link}");
    }

    Ok(())
}

async fn cmd_query(storage: &StorageOptions, url: &str, text: &str, k: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let site = parse_seed_url(url)?;
    let k = k.unwrap_or(config.pipeline.retrieval_k);
    if k == 0 {
        return Err(eyre!("-k must be at least 1"));
    }

    let pipeline = build_pipeline(&config, storage).await?;
    let chunks = pipeline.query(&site, text, k).await?;

    if chunks.is_empty() {
        println!("No matching passages.");
    }
    for (i, chunk) in chunks.iter().enumerate() {
        println!("--- [{}] ---", i + 1);
        println!("{}", chunk.trim());
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching [{current}/{total}] {url}"));
    }

    fn done(&self, _result: &GenerationResult) {
        self.spinner.finish_and_clear();
    }
}
