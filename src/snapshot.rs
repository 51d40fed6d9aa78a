//! Last-known-rate snapshot, persisted as a single JSON file and
//! replaced atomically on every update.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::CurrencyPair;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub rate: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Pair code -> last successfully resolved rate. Reference data only;
/// the resolver never reads this.
pub struct RateSnapshot {
    path: PathBuf,
    entries: HashMap<String, SnapshotEntry>,
}

impl RateSnapshot {
    /// Load the snapshot file. A missing or unreadable file yields an
    /// empty snapshot.
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn get(&self, pair: &CurrencyPair) -> Option<&SnapshotEntry> {
        self.entries.get(&pair.code())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a freshly resolved rate and persist the whole snapshot
    /// via a temp file and rename.
    pub fn record(&mut self, pair: &CurrencyPair, rate: Decimal) -> Result<()> {
        self.entries.insert(
            pair.code(),
            SnapshotEntry {
                rate,
                recorded_at: Utc::now(),
            },
        );
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
        }

        let text = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize snapshot")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn pair(base: &str, quote: &str) -> CurrencyPair {
        CurrencyPair::new(base, quote).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        let snapshot = RateSnapshot::load(&tmp.path().join("nope.json"));
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_record_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("previous_rates.json");

        let mut snapshot = RateSnapshot::load(&path);
        snapshot.record(&pair("EUR", "USD"), dec!(1.08)).unwrap();
        snapshot.record(&pair("GBP", "JPY"), dec!(190.5)).unwrap();
        snapshot.record(&pair("EUR", "USD"), dec!(1.09)).unwrap();

        let reloaded = RateSnapshot::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(&pair("EUR", "USD")).unwrap().rate, dec!(1.09));
        assert_eq!(reloaded.get(&pair("GBP", "JPY")).unwrap().rate, dec!(190.5));

        // No stray temp file after an atomic save
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("previous_rates.json");
        fs::write(&path, "{not json").unwrap();

        let snapshot = RateSnapshot::load(&path);
        assert!(snapshot.is_empty());
    }
}
