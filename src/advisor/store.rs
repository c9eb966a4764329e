//! Backing stores for interruption-rate tables
//!
//! A store is advisory: losing its contents only costs a refetch. Stores do
//! no freshness checks of their own; they report the age of what they hold.

use super::RegionRanks;
use crate::error::{OptimizerError, Result};
use crate::utils::ensure_dir;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Minimal key/value cache interface keyed by region
pub trait RankStore: Send + Sync {
    /// Stored table for `region` and its age
    fn get(&self, region: &str) -> Result<Option<(RegionRanks, Duration)>>;

    fn set(&self, region: &str, ranks: &RegionRanks) -> Result<()>;

    /// Drop every stored table
    fn clear(&self) -> Result<()>;
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, RegionRanks>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> OptimizerError {
    OptimizerError::Io(std::io::Error::other("rank store lock poisoned"))
}

impl RankStore for MemoryStore {
    fn get(&self, region: &str) -> Result<Option<(RegionRanks, Duration)>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(region).map(|r| (r.clone(), r.age())))
    }

    fn set(&self, region: &str, ranks: &RegionRanks) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(region.to_string(), ranks.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

/// One JSON file per region under a cache directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform cache location, e.g. `~/.cache/spot-optimizer/interruption-rates`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("spot-optimizer").join("interruption-rates"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, region: &str) -> PathBuf {
        self.dir.join(format!("{}.json", region))
    }
}

impl RankStore for FileStore {
    fn get(&self, region: &str) -> Result<Option<(RegionRanks, Duration)>> {
        let path = self.path_for(region);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let ranks: RegionRanks = serde_json::from_str(&content)?;
        let age = ranks.age();
        Ok(Some((ranks, age)))
    }

    fn set(&self, region: &str, ranks: &RegionRanks) -> Result<()> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(region);
        // Write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string(ranks)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!("Stored interruption ranks at {}", path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn ranks(region: &str, hours_old: i64) -> RegionRanks {
        RegionRanks::new(
            region,
            Utc::now() - chrono::Duration::hours(hours_old),
            Vec::new(),
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("us-west-2").unwrap().is_none());

        store.set("us-west-2", &ranks("us-west-2", 2)).unwrap();
        let (stored, age) = store.get("us-west-2").unwrap().unwrap();
        assert_eq!(stored.region(), "us-west-2");
        assert!(age >= Duration::from_secs(2 * 3600 - 5));

        store.clear().unwrap();
        assert!(store.get("us-west-2").unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("rates");

        FileStore::new(&dir)
            .set("eu-west-1", &ranks("eu-west-1", 0))
            .unwrap();
        assert!(dir.join("eu-west-1.json").exists());

        let reopened = FileStore::new(&dir);
        let (stored, age) = reopened.get("eu-west-1").unwrap().unwrap();
        assert_eq!(stored.region(), "eu-west-1");
        assert!(age < Duration::from_secs(60));
        assert!(reopened.get("us-east-1").unwrap().is_none());
    }

    #[test]
    fn test_file_store_clear_removes_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.set("us-west-2", &ranks("us-west-2", 0)).unwrap();
        store.set("us-east-1", &ranks("us-east-1", 0)).unwrap();

        store.clear().unwrap();
        assert!(store.get("us-west-2").unwrap().is_none());
        assert!(store.get("us-east-1").unwrap().is_none());
    }

    #[test]
    fn test_file_store_corrupt_entry_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("us-west-2.json"), "not json").unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(store.get("us-west-2").is_err());
    }

    #[test]
    fn test_clear_missing_dir_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("never-created"));
        assert!(store.clear().is_ok());
    }
}
