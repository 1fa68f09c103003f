//! Page text collection for the full link set and its curated subset.

use std::collections::HashSet;

use tracing::{info, instrument, warn};
use url::Url;

use outreach_crawler::PageFetcher;
use outreach_shared::canonicalize_str;

use crate::pipeline::ProgressReporter;

/// Inserted before each page's text.
pub const PAGE_SEPARATOR: &str = " \n ";

/// Text of every link, and of the curated links only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedText {
    pub full_text: String,
    pub curated_text: String,
}

/// Fetch every link once and split the extracted text into full and curated parts.
///
/// A page that cannot be fetched contributes empty text; this never fails.
#[instrument(skip_all, fields(links = links.len(), curated = curated_links.len()))]
pub async fn fetch_and_partition(
    fetcher: &PageFetcher,
    links: &[String],
    curated_links: &[String],
    progress: &dyn ProgressReporter,
) -> PartitionedText {
    let curated: HashSet<String> = curated_links
        .iter()
        .filter_map(|link| canonicalize_str(link))
        .collect();

    let mut out = PartitionedText::default();
    let mut failures = 0usize;

    for (i, link) in links.iter().enumerate() {
        let text = match fetch_page_text(fetcher, link).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %link, error = %e, "page fetch failed, using empty text");
                failures += 1;
                String::new()
            }
        };
        progress.page_fetched(link, i + 1, links.len());

        out.full_text.push_str(PAGE_SEPARATOR);
        out.full_text.push_str(&text);

        let is_curated = canonicalize_str(link).is_some_and(|c| curated.contains(&c));
        if is_curated {
            out.curated_text.push_str(PAGE_SEPARATOR);
            out.curated_text.push_str(&text);
        }
    }

    info!(
        full_chars = out.full_text.len(),
        curated_chars = out.curated_text.len(),
        failures,
        "fetched site content"
    );
    out
}

async fn fetch_page_text(fetcher: &PageFetcher, link: &str) -> outreach_shared::Result<String> {
    let url = Url::parse(link)
        .map_err(|e| outreach_shared::OutreachError::parse(format!("invalid link {link}: {e}")))?;
    fetcher.fetch_text(&url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn page(server: &MockServer, route: &str, body: &str) {
        Mock::given(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn curated_pages_go_to_both_texts() {
        let server = MockServer::start().await;
        page(&server, "/", "<p>Home page</p>").await;
        page(&server, "/pricing", "<p>Plans and prices</p>").await;

        let base = server.uri();
        let links = vec![base.clone(), format!("{base}/pricing")];
        let curated = vec![format!("{base}/pricing/")];
        let fetcher = PageFetcher::new().unwrap().allow_private_hosts(true);

        let out = fetch_and_partition(&fetcher, &links, &curated, &SilentProgress).await;

        assert_eq!(out.full_text, " \n Home page \n Plans and prices");
        assert_eq!(out.curated_text, " \n Plans and prices");
    }

    #[tokio::test]
    async fn failed_pages_contribute_empty_text() {
        let server = MockServer::start().await;
        page(&server, "/ok", "<p>Still here</p>").await;
        Mock::given(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let base = server.uri();
        let links = vec![format!("{base}/gone"), format!("{base}/ok")];
        let fetcher = PageFetcher::new().unwrap().allow_private_hosts(true);

        let out = fetch_and_partition(&fetcher, &links, &links, &SilentProgress).await;

        assert_eq!(out.full_text, " \n  \n Still here");
        assert_eq!(out.curated_text, out.full_text);
    }
}
