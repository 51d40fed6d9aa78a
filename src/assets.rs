//! Static asset catalog: valid currencies, the standard/other pair
//! split, and non-currency instrument display names.
//!
//! The catalog is collaborator-owned configuration; the rate engine
//! only reads the standard-pair set for its tie-break rule.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::CurrencyPair;

const CURRENCIES_FILE: &str = "currencies.json";
const PAIRS_SPLIT_FILE: &str = "pairs_split.json";
const INSTRUMENTS_FILE: &str = "instruments.json";
const VERSION_FILE: &str = "asset_version.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PairsSplitFile {
    standard: Vec<String>,
    other: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstrumentsFile {
    instruments: Vec<Instrument>,
}

/// One tradeable instrument from the instruments file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    #[serde(rename = "type")]
    pub kind: String,
    pub display_name: String,
}

/// Version marker for the asset files, `{"version": "1.2.0"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVersion {
    pub version: String,
}

/// In-memory view of the asset JSON files.
pub struct AssetCatalog {
    dir: PathBuf,
    currencies: Vec<String>,
    standard_pairs: HashSet<CurrencyPair>,
    other_pairs: HashSet<CurrencyPair>,
    other_instruments: Vec<String>,
}

impl AssetCatalog {
    /// Read every asset JSON into memory.
    pub fn load(dir: &Path) -> Result<Self> {
        let currencies: Vec<String> = read_json(&dir.join(CURRENCIES_FILE))
            .context("Failed to load currency list")?;

        let split: PairsSplitFile = read_json(&dir.join(PAIRS_SPLIT_FILE))
            .context("Failed to load pair split")?;
        let standard_pairs = parse_pairs(&split.standard);
        let other_pairs = parse_pairs(&split.other);

        // Instruments are optional display data; a missing file just
        // means no non-currency instruments to show.
        let other_instruments = match read_json::<InstrumentsFile>(&dir.join(INSTRUMENTS_FILE)) {
            Ok(file) => file
                .instruments
                .into_iter()
                .filter(|i| !i.kind.eq_ignore_ascii_case("CURRENCY"))
                .map(|i| i.display_name)
                .collect(),
            Err(e) => {
                warn!(error = %e, "No instruments file; continuing without");
                Vec::new()
            }
        };

        info!(
            currencies = currencies.len(),
            standard = standard_pairs.len(),
            other = other_pairs.len(),
            "Loaded asset catalog"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            currencies,
            standard_pairs,
            other_pairs,
            other_instruments,
        })
    }

    /// A catalog with no data, still pointed at `dir` so a later
    /// refresh can pick up synced files.
    pub fn empty(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            currencies: Vec::new(),
            standard_pairs: HashSet::new(),
            other_pairs: HashSet::new(),
            other_instruments: Vec::new(),
        }
    }

    /// Drop the in-memory view and reload from disk.
    pub fn refresh(&mut self) -> Result<()> {
        *self = Self::load(&self.dir)?;
        Ok(())
    }

    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    pub fn standard_pairs(&self) -> &HashSet<CurrencyPair> {
        &self.standard_pairs
    }

    pub fn other_pairs(&self) -> &HashSet<CurrencyPair> {
        &self.other_pairs
    }

    pub fn other_instruments(&self) -> &[String] {
        &self.other_instruments
    }

    pub fn is_known_currency(&self, code: &str) -> bool {
        self.currencies.iter().any(|c| c == code)
    }
}

/// Rebuild the asset files from a provider currency map and the local
/// instruments file: write the sorted currency list, the full
/// cross-pair list split into standard (quoted as a CURRENCY
/// instrument) and other.
pub fn sync_catalog(dir: &Path, currency_names: &HashMap<String, String>) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create assets directory")?;

    let mut currencies: Vec<String> = currency_names.keys().cloned().collect();
    currencies.sort();
    write_json(&dir.join(CURRENCIES_FILE), &currencies)?;
    info!(count = currencies.len(), "Wrote currency list");

    let tradeable = currency_instrument_codes(dir);

    let mut standard = Vec::new();
    let mut other = Vec::new();
    for base in &currencies {
        for quote in &currencies {
            if base == quote {
                continue;
            }
            let code = format!("{}{}", base, quote);
            if tradeable.contains(&code) {
                standard.push(code);
            } else {
                other.push(code);
            }
        }
    }
    standard.sort();
    other.sort();
    info!(
        standard = standard.len(),
        other = other.len(),
        "Wrote pair split"
    );
    write_json(&dir.join(PAIRS_SPLIT_FILE), &PairsSplitFile { standard, other })?;

    Ok(())
}

/// Concatenated codes of instruments typed CURRENCY, e.g. "USD/THB" ->
/// "USDTHB". Empty when the instruments file is absent.
fn currency_instrument_codes(dir: &Path) -> HashSet<String> {
    match read_json::<InstrumentsFile>(&dir.join(INSTRUMENTS_FILE)) {
        Ok(file) => file
            .instruments
            .iter()
            .filter(|i| i.kind.eq_ignore_ascii_case("CURRENCY"))
            .map(|i| i.display_name.replace('/', "").to_ascii_uppercase())
            .collect(),
        Err(e) => {
            warn!(error = %e, "No instruments file; every pair lands in 'other'");
            HashSet::new()
        }
    }
}

/// Read the local asset version marker.
pub fn read_local_version(dir: &Path) -> Result<AssetVersion> {
    read_json(&dir.join(VERSION_FILE)).context("Failed to read local asset version")
}

/// Download and parse a remote version marker.
pub async fn fetch_remote_version(
    url: &str,
    timeout: std::time::Duration,
) -> Result<AssetVersion> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch remote asset version")?;

    if !response.status().is_success() {
        anyhow::bail!("Version request failed: {}", response.status());
    }

    response
        .json()
        .await
        .context("Failed to parse remote asset version")
}

/// True when `remote` is strictly newer than `local`, comparing dotted
/// numeric components; missing components read as zero.
pub fn is_update_available(local: &str, remote: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let local = parse(local);
    let remote = parse(remote);
    let len = local.len().max(remote.len());
    for i in 0..len {
        let l = local.get(i).copied().unwrap_or(0);
        let r = remote.get(i).copied().unwrap_or(0);
        if r != l {
            return r > l;
        }
    }
    false
}

fn parse_pairs(codes: &[String]) -> HashSet<CurrencyPair> {
    codes
        .iter()
        .filter_map(|code| match code.parse::<CurrencyPair>() {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!(code = %code, error = %e, "Skipping malformed pair");
                None
            }
        })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize asset file")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, text).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
