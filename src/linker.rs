//! Binding manifest entries to page/container slots in the content database.
//!
//! The content database (by default `content/images.json`) maps a page key to
//! its container slots:
//!
//! ```json
//! {
//!   "/shop": {
//!     "hero": { "file": "...", "alt": "...", "description": null, "keywords": [], "generatedAt": "..." },
//!     "slider": [ { "file": "..." }, { "file": "..." } ]
//!   }
//! }
//! ```
//!
//! # Selection strategies
//!
//! Two strategies exist and are deliberately kept separate:
//!
//! - [`Selection::Windowed`] (default) looks only at the manifest suffix
//!   starting at `from_index` (or just the last entry when no index is given),
//!   filters by exact preset or by the preset-prefix container rule, and
//!   aggregates every survivor for `slider` or takes the last one otherwise.
//! - [`Selection::LatestMatch`] searches the whole manifest for the last entry
//!   recorded for exactly this page and container, falling back to the last
//!   entry of the container's default preset. It always selects one entry.
//!
//! # Failure semantics
//!
//! Selection runs entirely in memory before the content database is touched,
//! so [`LinkError::NoCandidate`] and [`LinkError::NoFile`] leave the file
//! byte-for-byte unchanged. A page whose value is not an object fails with
//! [`LinkError::MalformedPage`] before anything is written. Nothing here is
//! retried.

use crate::manifest::{self, ManifestEntry, ManifestError};
use crate::naming;
use crate::store::{self, StoreError};
use crate::types::Container;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("no manifest entries match page '{page}', container '{container}'{} ({strategy})", preset_note(.preset))]
    NoCandidate {
        page: String,
        container: Container,
        preset: Option<String>,
        strategy: String,
    },
    #[error("selected entry (preset '{preset}') for page '{page}', container '{container}' has no file")]
    NoFile {
        page: String,
        container: Container,
        preset: String,
    },
    #[error("page '{page_key}' in the content database is not an object")]
    MalformedPage { page_key: String },
    #[error("content database: {0}")]
    Store(#[from] StoreError),
    #[error("failed to serialize slot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
}

fn preset_note(preset: &Option<String>) -> String {
    match preset {
        Some(p) => format!(", preset '{p}'"),
        None => String::new(),
    }
}

/// One bound asset as the site build consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub file: String,
    pub alt: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(with = "naming::iso_millis")]
    pub generated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Build an item from a manifest entry. Returns `None` when the entry has
    /// no representative file.
    ///
    /// `alt` falls back to the prompt, then to an empty string.
    pub fn from_entry(entry: &ManifestEntry) -> Option<Self> {
        let file = entry.primary_file()?;
        let alt = entry
            .alt
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(entry.prompt.as_str());
        Some(Self {
            file: file.to_string(),
            alt: alt.to_string(),
            description: entry.description.clone(),
            keywords: entry.keywords.clone(),
            generated_at: entry.created_at,
        })
    }
}

/// Value of one container slot: a single item or an ordered list (slider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    List(Vec<ContentItem>),
    Single(ContentItem),
}

impl SlotValue {
    pub fn items(&self) -> &[ContentItem] {
        match self {
            SlotValue::List(items) => items,
            SlotValue::Single(item) => std::slice::from_ref(item),
        }
    }
}

/// The content database: page key → container name → slot value.
///
/// Held as raw JSON. Linking replaces exactly one `page → container` value
/// and writes every other page, slot and field back as it was read, whatever
/// its shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDb {
    pub pages: Map<String, Value>,
}

impl ContentDb {
    /// Load from disk; a missing file is an empty database.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        store::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        store::write_json(path, self)
    }

    /// Replace the slot for `(page, container)`. The page key is normalized
    /// by stripping one trailing slash; other slots are untouched.
    ///
    /// Fails without modifying anything when the page holds something other
    /// than an object.
    pub fn set_slot(&mut self, page: &str, container: Container, value: &SlotValue) -> Result<(), LinkError> {
        let key = naming::page_key(page);
        let value = serde_json::to_value(value)?;
        let slots = self
            .pages
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(slots) = slots else {
            return Err(LinkError::MalformedPage {
                page_key: key.to_string(),
            });
        };
        slots.insert(container.as_str().to_string(), value);
        Ok(())
    }

    /// The raw JSON stored for `(page, container)`.
    pub fn raw_slot(&self, page: &str, container: Container) -> Option<&Value> {
        self.pages
            .get(naming::page_key(page))
            .and_then(|slots| slots.get(container.as_str()))
    }

    /// The slot for `(page, container)` read as content items. `None` when
    /// absent or when it holds something else.
    pub fn slot(&self, page: &str, container: Container) -> Option<SlotValue> {
        self.raw_slot(page, container)
            .and_then(|v| SlotValue::deserialize(v).ok())
    }
}

/// How to pick manifest entries for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Windowed {
        /// Manifest length before the producing run. `None` = last entry only.
        from_index: Option<usize>,
        /// Exact preset filter. `None` = preset-prefix container rule.
        preset: Option<String>,
    },
    LatestMatch {
        /// Preset whose last entry is used when nothing was recorded for the
        /// exact page and container.
        default_preset: String,
    },
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Windowed { from_index, .. } => match from_index {
                Some(i) => write!(f, "windowed from index {i}"),
                None => f.write_str("windowed, last entry"),
            },
            Selection::LatestMatch { default_preset } => {
                write!(f, "latest match, default preset '{default_preset}'")
            }
        }
    }
}

/// A link request: which slot to fill and how to select.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub page: String,
    pub container: Container,
    pub selection: Selection,
}

/// What a successful link wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub page_key: String,
    pub container: Container,
    /// Number of entries that survived filtering.
    pub candidates: usize,
    pub value: SlotValue,
}

/// Select the slot value for a request without touching any file.
pub fn select(
    manifest: &[ManifestEntry],
    request: &LinkRequest,
) -> Result<(SlotValue, usize), LinkError> {
    match &request.selection {
        Selection::Windowed { from_index, preset } => {
            select_windowed(manifest, request, *from_index, preset.as_deref())
        }
        Selection::LatestMatch { default_preset } => {
            select_latest(manifest, request, default_preset)
        }
    }
}

fn select_windowed(
    manifest: &[ManifestEntry],
    request: &LinkRequest,
    from_index: Option<usize>,
    preset: Option<&str>,
) -> Result<(SlotValue, usize), LinkError> {
    let start = from_index.unwrap_or_else(|| manifest.len().saturating_sub(1));
    let window = manifest.get(start..).unwrap_or(&[]);

    let candidates: Vec<&ManifestEntry> = window
        .iter()
        .filter(|e| match preset {
            Some(p) => e.preset == p,
            None => Container::from_preset(&e.preset) == Some(request.container),
        })
        .collect();

    let Some(last) = candidates.last() else {
        return Err(LinkError::NoCandidate {
            page: request.page.clone(),
            container: request.container,
            preset: preset.map(str::to_string),
            strategy: request.selection.to_string(),
        });
    };

    let value = if request.container.is_list() {
        let items: Vec<ContentItem> = candidates
            .iter()
            .filter_map(|e| ContentItem::from_entry(e))
            .collect();
        if items.is_empty() {
            return Err(no_file(request, last));
        }
        SlotValue::List(items)
    } else {
        SlotValue::Single(ContentItem::from_entry(last).ok_or_else(|| no_file(request, last))?)
    };

    Ok((value, candidates.len()))
}

fn select_latest(
    manifest: &[ManifestEntry],
    request: &LinkRequest,
    default_preset: &str,
) -> Result<(SlotValue, usize), LinkError> {
    let container = request.container.as_str();
    let exact = manifest.iter().rev().find(|e| {
        e.page.as_deref() == Some(request.page.as_str()) && e.container.as_deref() == Some(container)
    });
    let chosen = exact.or_else(|| manifest.iter().rev().find(|e| e.preset == default_preset));

    let Some(entry) = chosen else {
        return Err(LinkError::NoCandidate {
            page: request.page.clone(),
            container: request.container,
            preset: Some(default_preset.to_string()),
            strategy: request.selection.to_string(),
        });
    };

    let item = ContentItem::from_entry(entry).ok_or_else(|| no_file(request, entry))?;
    // Slider slots stay lists so the database shape does not depend on the strategy.
    let value = if request.container.is_list() {
        SlotValue::List(vec![item])
    } else {
        SlotValue::Single(item)
    };
    Ok((value, 1))
}

fn no_file(request: &LinkRequest, entry: &ManifestEntry) -> LinkError {
    LinkError::NoFile {
        page: request.page.clone(),
        container: request.container,
        preset: entry.preset.clone(),
    }
}

/// Select from `manifest` and write the slot into the database at `db_path`.
///
/// The database is only read and written once selection has succeeded.
pub fn link(
    manifest: &[ManifestEntry],
    db_path: &Path,
    request: &LinkRequest,
) -> Result<LinkOutcome, LinkError> {
    let (value, candidates) = select(manifest, request)?;

    let mut db = ContentDb::load(db_path)?;
    db.set_slot(&request.page, request.container, &value)?;
    db.save(db_path)?;

    let page_key = naming::page_key(&request.page).to_string();
    info!(
        page = %request.page,
        container = %request.container,
        candidates,
        selection = %request.selection,
        "content linked"
    );
    Ok(LinkOutcome {
        page_key,
        container: request.container,
        candidates,
        value,
    })
}

/// Load the manifest from disk and [`link`].
pub fn link_files(
    manifest_path: &Path,
    db_path: &Path,
    request: &LinkRequest,
) -> Result<LinkOutcome, LinkError> {
    let manifest = manifest::load(manifest_path)?;
    link(&manifest, db_path, request)
}
