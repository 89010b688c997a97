use std::{fs, path::Path};

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// One entry of `ads_publications.json` or an `invited_*.json` file.
///
/// Fields the site does not know about are kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibcode: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// `YYYY-MM-DD`, with `00` for unknown parts.
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub month: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default)]
    pub journal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booktitle: Option<String>,
    #[serde(default)]
    pub publication_type: String,
    #[serde(default)]
    pub citations: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub invited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Publication {
    /// Venue for display: `booktitle` when set, then `journal`.
    pub fn venue(&self) -> Option<&str> {
        self.booktitle
            .as_deref()
            .filter(|b| !b.is_empty())
            .or_else(|| Some(self.journal.as_str()).filter(|j| !j.is_empty()))
    }
}

/// A JSON object that keeps its keys in insertion order.
pub type OrderedMap<V> = IndexMap<String, V>;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Pretty JSON with a trailing newline; parent directories are created as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut text = to_pretty_json(value)?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize JSON")
}

pub fn load_publications(path: &Path) -> anyhow::Result<Vec<Publication>> {
    load_json(path)
}
