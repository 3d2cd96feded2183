use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::bse::screener::error::{Result, ScreenerError};
use crate::bse::screener::model::EntityId;

/// Per-company records as persisted between runs: one JSON object keyed by
/// scrip code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordCache {
    entries: BTreeMap<EntityId, Value>,
}

impl RecordCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache at `path`. A missing or empty file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let source = fs::read_to_string(path)?;
        if source.trim().is_empty() {
            return Ok(Self::new());
        }

        let document: Value = serde_json::from_str(&source)?;
        let Value::Object(object) = document else {
            return Err(ScreenerError::InvalidCache(format!(
                "{} does not hold a JSON object",
                path.display()
            )));
        };

        let entries = object
            .into_iter()
            .map(|(code, record)| (EntityId::new(code), record))
            .collect();
        Ok(Self { entries })
    }

    /// Writes the cache to a sibling temporary file and renames it over
    /// `path`, so a failed write leaves the previous checkpoint in place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let staging = staging_path(path);
        let json = serde_json::to_string(&self.entries)?;
        if let Err(error) = fs::write(&staging, json) {
            let _ = fs::remove_file(&staging);
            return Err(error.into());
        }
        fs::rename(&staging, path)?;
        debug!(entity_count = self.entries.len(), path = %path.display(), "cache checkpoint written");
        Ok(())
    }

    /// `true` when a record for `entity` is already cached.
    pub fn contains(&self, entity: &EntityId) -> bool {
        self.entries.contains_key(entity)
    }

    /// Stores the record for `entity`, replacing any earlier one.
    pub fn insert(&mut self, entity: EntityId, record: Value) {
        self.entries.insert(entity, record);
    }

    /// Number of cached companies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no company is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Value)> {
        self.entries.iter()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("cache.json"));
    name.push(".tmp");
    path.with_file_name(name)
}
