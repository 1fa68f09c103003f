//! Core domain types: entity and lead workspaces.

use std::path::PathBuf;

use url::Url;

use crate::error::{OutreachError, Result};

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// A per-entity (and optionally per-lead) location holding cached artifacts.
///
/// The entity part is derived from the URL host: scheme dropped, dots replaced
/// by `_`, a non-default port appended as `__<port>`. Hosts and lead ids are
/// validated so that distinct inputs never map to the same workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Workspace {
    entity: String,
    lead: Option<String>,
}

impl Workspace {
    /// Workspace for the organization behind `url`.
    pub fn for_entity(url: &Url) -> Result<Self> {
        Ok(Self {
            entity: entity_dir_name(url)?,
            lead: None,
        })
    }

    /// Workspace for one lead nested under the organization behind `url`.
    pub fn for_lead(url: &Url, lead_id: &str) -> Result<Self> {
        Self::for_entity(url)?.lead(lead_id)
    }

    /// Nested lead workspace under this workspace's entity.
    pub fn lead(&self, lead_id: &str) -> Result<Self> {
        validate_lead_id(lead_id)?;
        Ok(Self {
            entity: self.entity.clone(),
            lead: Some(lead_id.to_string()),
        })
    }

    /// The entity-level workspace (drops any lead component).
    pub fn entity(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            lead: None,
        }
    }

    /// Normalized entity directory name, e.g. `www_example_com`.
    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    /// Lead identifier, if this is a lead workspace.
    pub fn lead_id(&self) -> Option<&str> {
        self.lead.as_deref()
    }

    /// Path relative to the data root: `<entity>` or `<entity>/<lead>`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.entity);
        if let Some(lead) = &self.lead {
            path.push(lead);
        }
        path
    }

    /// Stable string key, `/`-separated regardless of platform.
    pub fn key(&self) -> String {
        match &self.lead {
            Some(lead) => format!("{}/{lead}", self.entity),
            None => self.entity.clone(),
        }
    }
}

impl std::fmt::Display for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Derive the entity directory name from a URL host (and port).
fn entity_dir_name(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| OutreachError::validation(format!("URL has no host: {url}")))?
        .to_ascii_lowercase();

    let valid_chars = host
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    if !valid_chars || host.split('.').any(str::is_empty) {
        return Err(OutreachError::validation(format!(
            "host '{host}' cannot be mapped to a workspace"
        )));
    }

    let mut name = host.replace('.', "_");
    if let Some(port) = url.port() {
        name.push_str(&format!("__{port}"));
    }
    Ok(name)
}

fn validate_lead_id(lead_id: &str) -> Result<()> {
    let ok = !lead_id.is_empty()
        && lead_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(OutreachError::validation(format!(
            "lead id '{lead_id}' must be non-empty and contain only [A-Za-z0-9_-]"
        )))
    }
}
