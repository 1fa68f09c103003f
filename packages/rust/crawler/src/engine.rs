//! Breadth-first, site-scoped link crawler.
//!
//! The crawler starts from a seed URL and expands the frontier one layer per
//! depth round. Pages are fetched sequentially; a page that fails to load
//! contributes no links and the crawl carries on.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use scraper::Html;
use tracing::{info, instrument, warn};
use url::Url;

use outreach_shared::{OutreachError, Result, canonical_link, same_site};

use crate::fetch::PageFetcher;
use crate::text::extract_links;

// ---------------------------------------------------------------------------
// CrawlResult
// ---------------------------------------------------------------------------

/// Summary of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Canonical same-site links discovered (seed included).
    pub links: BTreeSet<String>,
    /// Number of pages successfully fetched.
    pub pages_fetched: usize,
    /// Fetch failures encountered (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Total duration of the crawl.
    pub duration: Duration,
}

impl CrawlResult {
    /// Links as a sorted vector.
    pub fn into_links(self) -> Vec<String> {
        self.links.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// LinkCrawler
// ---------------------------------------------------------------------------

/// Site-scoped BFS crawler.
pub struct LinkCrawler {
    fetcher: PageFetcher,
}

impl LinkCrawler {
    /// Create a crawler that fetches pages through `fetcher`.
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Crawl from `seed` for `max_depth` rounds.
    ///
    /// Depth 0 returns just the canonical seed without fetching anything.
    /// The result is `visited ∪ frontier` after the last round.
    #[instrument(skip_all, fields(seed = %seed, max_depth))]
    pub async fn crawl(&self, seed: &Url, max_depth: u32) -> Result<CrawlResult> {
        if !matches!(seed.scheme(), "http" | "https") || seed.host_str().is_none() {
            return Err(OutreachError::validation(format!(
                "seed must be an absolute http(s) URL: {seed}"
            )));
        }

        let start_time = Instant::now();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        let mut frontier: BTreeSet<String> = BTreeSet::from([canonical_link(seed)]);
        let mut errors: Vec<(String, String)> = Vec::new();
        let mut pages_fetched: usize = 0;

        info!(max_depth, "starting crawl");

        for round in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let mut new_links: BTreeSet<String> = BTreeSet::new();
            for link in &frontier {
                match self.links_on_page(seed, link).await {
                    Ok(found) => {
                        pages_fetched += 1;
                        new_links.extend(found);
                    }
                    Err(e) => {
                        warn!(url = %link, error = %e, "failed to fetch page, treating as empty");
                        errors.push((link.clone(), e.to_string()));
                    }
                }
            }

            visited.append(&mut frontier);
            frontier = new_links.difference(&visited).cloned().collect();

            info!(
                round = round + 1,
                visited = visited.len(),
                frontier = frontier.len(),
                "crawl round complete"
            );
        }

        visited.append(&mut frontier);

        let result = CrawlResult {
            links: visited,
            pages_fetched,
            errors,
            duration: start_time.elapsed(),
        };

        info!(
            links = result.links.len(),
            pages_fetched = result.pages_fetched,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis(),
            "crawl completed"
        );

        Ok(result)
    }

    /// Fetch one page and return its canonical same-site links.
    async fn links_on_page(&self, seed: &Url, link: &str) -> Result<BTreeSet<String>> {
        let page_url = Url::parse(link)
            .map_err(|e| OutreachError::parse(format!("invalid frontier URL {link}: {e}")))?;
        let body = self.fetcher.fetch_html(&page_url).await?;
        Ok(site_links(&body, &page_url, seed))
    }
}

/// Links on a page that stay on the seed's site, canonicalized.
fn site_links(html: &str, page_url: &Url, seed: &Url) -> BTreeSet<String> {
    let doc = Html::parse_document(html);
    extract_links(&doc, page_url)
        .into_iter()
        .filter(|link| same_site(seed, link))
        .map(|link| canonical_link(&link))
        .collect()
}
