//! Append-only manifest of every produced asset.
//!
//! The manifest is a pretty-printed JSON array at (by default)
//! `public/img/manifest.json`. Array order is append order and is the only
//! meaningful order; entries are never edited, removed or deduplicated.
//!
//! ```json
//! [
//!   {
//!     "preset": "slider_emotion",
//!     "prompt": "sunlit shop counter",
//!     "files": ["public/img/slider/slider_emotion-...-01-1600x900.jpg", "..."],
//!     "createdAt": "2026-03-01T10:15:00.000Z",
//!     "page": "/shop",
//!     "container": "slider",
//!     "alt": "Sunlit counter",
//!     "description": null,
//!     "keywords": ["glass", "counter"]
//!   }
//! ]
//! ```
//!
//! [`append`] reads the whole array, pushes the normalized new entries and
//! writes the whole array back (see [`crate::store`] for the concurrency
//! caveat: concurrent appenders can lose each other's entries). Existing
//! entries are carried over as raw JSON, so fields this crate does not know
//! and their exact formatting survive every append.

use crate::store::{self, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One recorded image (all encoded variants of one provider buffer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub preset: String,
    pub prompt: String,
    /// Written variant paths; the first is the primary (largest) variant.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(with = "crate::naming::iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub page: Option<String>,
    /// Container name as given by the producer. Kept as a string so entries
    /// recorded by other tooling still load.
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ManifestEntry {
    /// The representative file for linking: the first file, if any.
    pub fn primary_file(&self) -> Option<&str> {
        self.files.first().map(String::as_str).filter(|f| !f.is_empty())
    }
}

/// An entry as produced by a workflow, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub preset: String,
    pub prompt: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl NewEntry {
    /// Fill `created_at` with `now` when absent and turn empty optional
    /// strings into `None`.
    pub fn normalize(self, now: DateTime<Utc>) -> ManifestEntry {
        ManifestEntry {
            preset: self.preset,
            prompt: self.prompt,
            files: self.files,
            created_at: self.created_at.unwrap_or(now),
            page: non_empty(self.page),
            container: non_empty(self.container),
            alt: non_empty(self.alt),
            description: non_empty(self.description),
            keywords: self.keywords,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Where a batch of appended entries landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Index of the first appended entry (= manifest length before the append).
    pub first_index: usize,
    pub added: usize,
}

/// Load the manifest, or an empty one if the file does not exist.
pub fn load(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    Ok(store::read_json_or_default(path)?)
}

/// Append entries using the current time for missing timestamps.
pub fn append(path: &Path, entries: Vec<NewEntry>) -> Result<AppendReceipt, ManifestError> {
    append_at(path, entries, Utc::now())
}

/// Append entries, filling missing timestamps with `now`.
///
/// Entries land in call order after everything already in the manifest.
pub fn append_at(
    path: &Path,
    entries: Vec<NewEntry>,
    now: DateTime<Utc>,
) -> Result<AppendReceipt, ManifestError> {
    let mut manifest: Vec<Value> = store::read_json_or_default(path)?;
    let first_index = manifest.len();
    let added = entries.len();
    for entry in entries {
        let value = serde_json::to_value(entry.normalize(now)).map_err(|source| {
            StoreError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        manifest.push(value);
    }
    store::write_json(path, &manifest)?;
    info!(added, first_index, manifest = %path.display(), "manifest updated");
    Ok(AppendReceipt { first_index, added })
}
