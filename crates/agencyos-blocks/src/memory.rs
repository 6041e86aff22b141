//! In-memory content source, optionally loaded from fixture files.
//!
//! Fixture directories mirror the content source: one sub-directory per
//! collection and one `.json`, `.yaml` or `.yml` file per record, named after
//! the record identifier (`block_hero/12.yaml`). Records in `pages/` are
//! looked up by their `permalink` field instead.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use agencyos_core::ItemId;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::source::{ContentSource, Result, SourceError};

/// Collection holding pages.
pub const PAGES_COLLECTION: &str = "pages";

/// Content source serving records from memory.
///
/// Records are returned exactly as stored; the requested depth is ignored.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: HashMap<(String, ItemId), Value>,
    pages: Vec<Value>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to a collection.
    #[must_use]
    pub fn with_item(mut self, collection: &str, id: impl Into<ItemId>, record: Value) -> Self {
        self.insert_item(collection, id, record);
        self
    }

    /// Add a page record.
    #[must_use]
    pub fn with_page(mut self, page: Value) -> Self {
        self.pages.push(page);
        self
    }

    /// Insert a record, replacing any previous record with the same key.
    pub fn insert_item(&mut self, collection: &str, id: impl Into<ItemId>, record: Value) {
        self.items.insert((collection.to_string(), id.into()), record);
    }

    /// Number of stored records, pages included.
    pub fn len(&self) -> usize {
        self.items.len() + self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permalinks of the stored pages, in insertion order.
    pub fn permalinks(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .filter_map(|page| page.get("permalink").and_then(Value::as_str))
    }

    /// Load every fixture file below `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        info!(dir = %dir.display(), "loading content fixtures");
        let mut source = Self::new();

        for entry in WalkDir::new(dir).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| SourceError::Fixture {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(format) = FixtureFormat::from_path(path) else {
                debug!(path = %path.display(), "skipping non-fixture file");
                continue;
            };
            let (Some(collection), Some(stem)) = (
                path.parent()
                    .and_then(Path::file_name)
                    .and_then(|n| n.to_str()),
                path.file_stem().and_then(|s| s.to_str()),
            ) else {
                continue;
            };

            let record = format.read(path)?;
            if collection == PAGES_COLLECTION {
                source.pages.push(record);
            } else {
                source.insert_item(collection, parse_item_id(stem), record);
            }
        }

        info!(records = source.len(), "fixtures loaded");
        Ok(source)
    }
}

/// Integer stems become integer keys, anything else a string key.
fn parse_item_id(stem: &str) -> ItemId {
    stem.parse::<i64>()
        .map(ItemId::Int)
        .unwrap_or_else(|_| ItemId::Str(stem.to_string()))
}

#[derive(Debug, Clone, Copy)]
enum FixtureFormat {
    Json,
    Yaml,
}

impl FixtureFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    fn read(self, path: &Path) -> Result<Value> {
        let text = fs::read_to_string(path)?;
        let fixture_error = |message: String| SourceError::Fixture {
            path: PathBuf::from(path),
            message,
        };
        match self {
            Self::Json => serde_json::from_str(&text).map_err(|e| fixture_error(e.to_string())),
            Self::Yaml => serde_yaml::from_str(&text).map_err(|e| fixture_error(e.to_string())),
        }
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch_item(&self, collection: &str, id: &ItemId, _depth: u8) -> Result<Option<Value>> {
        Ok(self.items.get(&(collection.to_string(), id.clone())).cloned())
    }

    async fn fetch_page(&self, permalink: &str, _depth: u8) -> Result<Option<Value>> {
        Ok(self
            .pages
            .iter()
            .find(|page| page.get("permalink").and_then(Value::as_str) == Some(permalink))
            .cloned())
    }
}
