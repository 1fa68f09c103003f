//! Lead profile lookup and flattening to plain text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, instrument};

use outreach_shared::{OutreachError, Result};

/// Profile fields carried into the flattened lead text, in output order.
pub const PROFILE_KEYS: &[&str] = &[
    "summary",
    "industryName",
    "firstName",
    "lastName",
    "headline",
    "geoLocationName",
    "experience",
    "honors",
    "volunteer",
    "certifications",
    "publications",
];

/// Turns an individual's identifier into a biography-plus-posts text.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, lead_id: &str) -> Result<String>;
}

/// Reads profiles from a JSON HTTP service.
///
/// `GET <base>/profiles/<id>` returns the profile object and
/// `GET <base>/profiles/<id>/posts` a list of posts.
pub struct HttpProfileSource {
    client: Client,
    base_url: String,
    post_count: usize,
}

impl HttpProfileSource {
    pub fn new(base_url: &str, api_token: Option<&str>, post_count: usize) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token.filter(|t| !t.trim().is_empty()) {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                    .map_err(|_| OutreachError::config("invalid profile API token"))?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| OutreachError::Profile(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            post_count,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OutreachError::Profile(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OutreachError::Profile(format!("{url}: HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| OutreachError::Profile(format!("{url}: invalid JSON: {e}")))
    }
}

#[async_trait]
impl ProfileSource for HttpProfileSource {
    #[instrument(skip(self))]
    async fn fetch_profile(&self, lead_id: &str) -> Result<String> {
        let profile = self
            .get_json(&format!("{}/profiles/{lead_id}", self.base_url))
            .await?;
        let posts = self
            .get_json(&format!("{}/profiles/{lead_id}/posts", self.base_url))
            .await?;

        let posts = post_texts(&posts, self.post_count);
        let text = flatten_profile(&profile, &posts);
        info!(chars = text.len(), posts = posts.len(), "retrieved lead profile");
        Ok(text)
    }
}

/// `key:\nvalue\n` blocks for each present profile key, then the posts.
pub fn flatten_profile(profile: &Value, posts: &[String]) -> String {
    let info = PROFILE_KEYS
        .iter()
        .filter_map(|key| {
            let value = profile.get(*key).filter(|v| !v.is_null())?;
            Some(format!("{key}:\n{}\n", render_value(value)))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{info}Posts:\n{}", posts.join("\n\n"))
}

/// Post texts from a posts payload, newest first as served, at most `limit`.
///
/// Accepts a bare array or `{"posts": [...]}`; each post may be a string, an
/// object with `text`, or an object with `commentary.text.text`.
pub fn post_texts(payload: &Value, limit: usize) -> Vec<String> {
    let items = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("posts") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(|post| match post {
            Value::String(text) => Some(text.as_str()),
            _ => post
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| post.pointer("/commentary/text/text").and_then(Value::as_str)),
        })
        .filter(|text| !text.trim().is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
