//! Link curation through the text generation service.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{info, instrument, warn};

use outreach_shared::{OutreachError, Result, canonicalize_str};

use crate::generation::TextGenerator;
use crate::prompts::{CURATED_LINKS_KEY, curation_system_prompt};

/// Ask the generator for the most useful links and keep at most `limit` of them.
///
/// The result is an ordered subset of `all_links`: unknown links are dropped,
/// duplicates collapse to their first occurrence. A response that is not a
/// JSON object with a `useful_links` array fails with
/// [`OutreachError::MalformedResponse`].
#[instrument(skip_all, fields(links = all_links.len(), limit))]
pub async fn select_curated_links(
    generator: &dyn TextGenerator,
    all_links: &[String],
    limit: usize,
) -> Result<Vec<String>> {
    if all_links.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let input = serde_json::to_string(all_links)
        .map_err(|e| OutreachError::Generation(format!("failed to encode links: {e}")))?;
    let raw = generator
        .generate(&curation_system_prompt(limit), &input)
        .await?;

    let curated = parse_curated_links(&raw, all_links, limit)?;
    info!(curated = curated.len(), "selected links for summary");
    Ok(curated)
}

/// Strip everything before the first `{` and after the last `}`.
pub fn clean_structured_output(raw: &str) -> Option<&str> {
    static OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));
    OBJECT_RE.find(raw.trim()).map(|m| m.as_str())
}

/// Parse a curation response and restrict it to members of `all_links`.
pub fn parse_curated_links(raw: &str, all_links: &[String], limit: usize) -> Result<Vec<String>> {
    let object = clean_structured_output(raw).ok_or_else(|| {
        OutreachError::MalformedResponse(format!("no JSON object in curation response: {raw:?}"))
    })?;

    let parsed: Value = serde_json::from_str(object)
        .map_err(|e| OutreachError::MalformedResponse(format!("curation response is not JSON: {e}")))?;

    let suggested = parsed
        .get(CURATED_LINKS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            OutreachError::MalformedResponse(format!(
                "curation response has no '{CURATED_LINKS_KEY}' list"
            ))
        })?;

    // Canonical form -> link as stored in the link set.
    let known: HashMap<String, &String> = all_links
        .iter()
        .filter_map(|link| canonicalize_str(link).map(|canonical| (canonical, link)))
        .collect();

    let mut seen = HashSet::new();
    let mut curated = Vec::new();
    for item in suggested {
        let Some(canonical) = item.as_str().and_then(canonicalize_str) else {
            warn!(item = %item, "ignoring non-link entry in curation response");
            continue;
        };
        match known.get(&canonical) {
            Some(link) if seen.insert(canonical.clone()) => curated.push((*link).clone()),
            Some(_) => {}
            None => warn!(link = %canonical, "ignoring curated link outside the crawled set"),
        }
        if curated.len() == limit {
            break;
        }
    }

    Ok(curated)
}
