//! End-to-end message pipeline: URL + lead → crawl → curate → fetch → index →
//! summarize → retrieve → message.
//!
//! Every stage is wrapped by the artifact cache, so a rerun after a failure
//! resumes at the first stage whose artifact is missing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use outreach_crawler::{LinkCrawler, PageFetcher};
use outreach_retrieval::{Embedder, Retriever};
use outreach_shared::{PipelineConfig, Result, Workspace};
use outreach_storage::{
    ALL_LINKS, ArtifactCache, COMPANY_SUMMARY, LEAD_INFO, LEAD_SUMMARY, PERSONALIZED_MESSAGE,
    SUMMARY_LINKS, WEBSITE_INFO, WEBSITE_SUMMARY_INFO,
};

use crate::content::{PartitionedText, fetch_and_partition};
use crate::curation::select_curated_links;
use crate::generation::TextGenerator;
use crate::profile::ProfileSource;
use crate::prompts::{
    COMPANY_SUMMARY_SYSTEM_PROMPT, LEAD_SUMMARY_SYSTEM_PROMPT, message_system_prompt,
    message_user_prompt,
};

/// Input to [`Pipeline::generate_message`].
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Website of the organization doing the outreach.
    pub entity_url: Url,
    /// Identifier of the person the message is for.
    pub lead_id: String,
    /// Free-text style tag, e.g. "Professional".
    pub style: String,
    /// Extra guidance appended to the message prompt.
    pub notes: String,
}

/// Result of [`Pipeline::generate_message`].
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub message: String,
    pub workspace: Workspace,
    /// Generation model of this pipeline.
    pub model: String,
    /// True when the message artifact already existed and no stage ran.
    pub from_cache: bool,
    pub elapsed: Duration,
}

/// Result of [`Pipeline::scrape`].
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub workspace: Workspace,
    pub links: Vec<String>,
    pub curated_links: Vec<String>,
    pub full_text_chars: usize,
    pub curated_text_chars: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page is fetched for its text.
    fn page_fetched(&self, url: &str, current: usize, total: usize);
    /// Called when a message is available.
    fn done(&self, result: &GenerationResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &GenerationResult) {}
}

/// The staged pipeline with its collaborators.
pub struct Pipeline {
    cache: Arc<ArtifactCache>,
    fetcher: PageFetcher,
    crawler: LinkCrawler,
    generator: Arc<dyn TextGenerator>,
    profiles: Arc<dyn ProfileSource>,
    retriever: Retriever,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        cache: Arc<ArtifactCache>,
        fetcher: PageFetcher,
        generator: Arc<dyn TextGenerator>,
        profiles: Arc<dyn ProfileSource>,
        embedder: Arc<dyn Embedder>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            crawler: LinkCrawler::new(fetcher.clone()),
            retriever: Retriever::new(cache.clone(), embedder, &config),
            cache,
            fetcher,
            generator,
            profiles,
            config,
        })
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce (or return the stored) personalized message for one lead.
    #[instrument(skip_all, fields(url = %request.entity_url, lead = %request.lead_id))]
    pub async fn generate_message(
        &self,
        request: &GenerationRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<GenerationResult> {
        let start = Instant::now();
        let entity = Workspace::for_entity(&request.entity_url)?;
        let lead = entity.lead(&request.lead_id)?;

        if let Some(message) = self.cache.load(&lead, &PERSONALIZED_MESSAGE).await? {
            info!(workspace = %lead, "message already generated");
            let result = GenerationResult {
                message,
                workspace: lead,
                model: self.generator.model_name().to_string(),
                from_cache: true,
                elapsed: start.elapsed(),
            };
            progress.done(&result);
            return Ok(result);
        }

        let site = self
            .site_stages(&request.entity_url, &entity, progress)
            .await?;

        progress.phase("Building similarity index");
        self.retriever.ensure_index(&entity).await?;

        progress.phase("Summarizing company");
        let company_summary = self
            .cache
            .get_or_compute(&entity, &COMPANY_SUMMARY, || {
                self.generator
                    .generate(COMPANY_SUMMARY_SYSTEM_PROMPT, &site.curated_text)
            })
            .await?;

        progress.phase("Fetching lead profile");
        let lead_info = self
            .cache
            .get_or_compute(&lead, &LEAD_INFO, || {
                self.profiles.fetch_profile(&request.lead_id)
            })
            .await?;

        progress.phase("Summarizing lead");
        let lead_summary = self
            .cache
            .get_or_compute(&lead, &LEAD_SUMMARY, || {
                self.generator.generate(LEAD_SUMMARY_SYSTEM_PROMPT, &lead_info)
            })
            .await?;

        progress.phase("Retrieving company context");
        let context = self
            .retriever
            .retrieve(&lead_summary, &entity, self.config.retrieval_k)
            .await?;

        progress.phase("Writing message");
        let system = message_system_prompt(&request.style);
        let user = message_user_prompt(&lead_summary, &company_summary, &context, &request.notes);
        let message = self
            .cache
            .get_or_compute(&lead, &PERSONALIZED_MESSAGE, || {
                self.generator.generate(&system, &user)
            })
            .await?;

        let result = GenerationResult {
            message,
            workspace: lead,
            model: self.generator.model_name().to_string(),
            from_cache: false,
            elapsed: start.elapsed(),
        };
        info!(
            chars = result.message.len(),
            model = %result.model,
            elapsed_ms = result.elapsed.as_millis(),
            "message ready"
        );
        progress.done(&result);
        Ok(result)
    }

    /// Crawl, curate and fetch a site without generating anything downstream.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn scrape(&self, url: &Url, progress: &dyn ProgressReporter) -> Result<ScrapeResult> {
        let start = Instant::now();
        let entity = Workspace::for_entity(url)?;
        let site = self.site_stages(url, &entity, progress).await?;

        Ok(ScrapeResult {
            workspace: entity,
            links: site.links,
            curated_links: site.curated_links,
            full_text_chars: site.full_text.chars().count(),
            curated_text_chars: site.curated_text.chars().count(),
            elapsed: start.elapsed(),
        })
    }

    /// Chunks of the site's text most similar to `text`.
    ///
    /// Requires the site to have been scraped; builds the index on first use.
    pub async fn query(&self, url: &Url, text: &str, k: usize) -> Result<Vec<String>> {
        let entity = Workspace::for_entity(url)?;
        self.retriever.retrieve(text, &entity, k).await
    }

    /// CRAWL → CURATE → FETCH_PARTITION for one entity workspace.
    async fn site_stages(
        &self,
        url: &Url,
        entity: &Workspace,
        progress: &dyn ProgressReporter,
    ) -> Result<SiteContent> {
        progress.phase("Crawling site");
        let links = self
            .cache
            .get_or_compute(entity, &ALL_LINKS, || self.crawl_links(url))
            .await?;

        progress.phase("Selecting links");
        let curated_links = self
            .cache
            .get_or_compute(entity, &SUMMARY_LINKS, || {
                select_curated_links(
                    self.generator.as_ref(),
                    &links,
                    self.config.max_curated_links,
                )
            })
            .await?;

        progress.phase("Fetching pages");
        let (full_text, curated_text) = self
            .cache
            .get_or_compute_pair(entity, &WEBSITE_INFO, &WEBSITE_SUMMARY_INFO, || {
                self.fetch_site_text(&links, &curated_links, progress)
            })
            .await?;

        Ok(SiteContent {
            links,
            curated_links,
            full_text,
            curated_text,
        })
    }

    async fn crawl_links(&self, url: &Url) -> Result<Vec<String>> {
        let result = self.crawler.crawl(url, self.config.crawl_depth).await?;
        Ok(result.into_links())
    }

    async fn fetch_site_text(
        &self,
        links: &[String],
        curated_links: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<(String, String)> {
        let PartitionedText {
            full_text,
            curated_text,
        } = fetch_and_partition(&self.fetcher, links, curated_links, progress).await;
        Ok((full_text, curated_text))
    }
}

struct SiteContent {
    links: Vec<String>,
    curated_links: Vec<String>,
    full_text: String,
    curated_text: String,
}
