//! HTTP page fetching with SSRF protection.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use outreach_shared::{OutreachError, Result};

use crate::text::visible_text;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("outreach/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches single pages over HTTP. Cheap to clone.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl PageFetcher {
    /// Create a fetcher with the default client settings.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OutreachError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts: false,
        })
    }

    /// Allow fetching localhost/private IPs.
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Fetch the raw HTML body of `url`.
    ///
    /// Non-2xx statuses, transport failures and blocked hosts are all errors;
    /// callers decide whether to degrade them to empty content.
    pub async fn fetch_html(&self, url: &Url) -> Result<String> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            return Err(OutreachError::Network(format!(
                "{url}: blocked by SSRF protection"
            )));
        }

        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| OutreachError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OutreachError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| OutreachError::Network(format!("{url}: body read failed: {e}")))
    }

    /// Fetch `url` and return its visible text with markup stripped.
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        let html = self.fetch_html(url).await?;
        Ok(visible_text(&html))
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssrf_blocks_file_scheme() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn ssrf_blocks_private_ips() {
        for raw in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn ssrf_allows_public_hosts() {
        let url = Url::parse("https://www.example.com/about").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn blocked_host_is_an_error_by_default() {
        let fetcher = PageFetcher::new().unwrap();
        let url = Url::parse("http://localhost:3000/").unwrap();
        let err = fetcher.fetch_html(&url).await.unwrap_err();
        assert!(err.to_string().contains("SSRF"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/missing"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new().unwrap().allow_private_hosts(true);
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher.fetch_html(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_text_strips_markup() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                "<html><body><h1>Rocket Brew</h1><script>var x = 1;</script><p>Cold brew, fast.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new().unwrap().allow_private_hosts(true);
        let url = Url::parse(&server.uri()).unwrap();
        let text = fetcher.fetch_text(&url).await.unwrap();
        assert!(text.contains("Rocket Brew"));
        assert!(text.contains("Cold brew, fast."));
        assert!(!text.contains("var x"));
    }
}
