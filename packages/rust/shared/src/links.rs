//! URL canonicalization shared by the crawler and link curation.
//!
//! A canonical link has an `http`/`https` scheme, no fragment and no trailing
//! slash. Two URLs belong to the same site when their hosts match after a
//! leading `www.` is removed and their explicit ports match.

use url::Url;

use crate::error::{OutreachError, Result};

/// Parse a user-supplied seed URL, defaulting to `https://` when the scheme is missing.
pub fn parse_seed_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{raw}"))
            .map_err(|e| OutreachError::validation(format!("invalid URL '{raw}': {e}")))?,
        Err(e) => return Err(OutreachError::validation(format!("invalid URL '{raw}': {e}"))),
    };

    if !is_web_scheme(&parsed) {
        return Err(OutreachError::validation(format!(
            "unsupported scheme '{}' in {raw}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(OutreachError::validation(format!("URL has no host: {raw}")));
    }
    Ok(parsed)
}

/// Canonical string form: fragment removed, trailing slashes stripped.
pub fn canonical_link(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

/// Parse and canonicalize a link string; `None` when it is not an absolute web URL.
pub fn canonicalize_str(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    is_web_scheme(&url).then(|| canonical_link(&url))
}

/// Host (without a leading `www.`) plus explicit port.
pub fn site_identity(url: &Url) -> Option<(String, Option<u16>)> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    Some((host, url.port()))
}

/// True when `candidate` is an http(s) URL on the same site as `seed`.
pub fn same_site(seed: &Url, candidate: &Url) -> bool {
    is_web_scheme(candidate)
        && site_identity(seed).is_some()
        && site_identity(seed) == site_identity(candidate)
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
