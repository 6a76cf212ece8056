//! Persistence for the long-lived history file and atomic JSON output.

pub mod merge;

use crate::core::series::Point;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const HISTORY_FILE: &str = "history.json";

/// The append-only historical store: daily-collapsed series per instrument
/// key, read fully at run start and written fully at run end.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HistoryStore {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub series: BTreeMap<String, Vec<Point>>,
}

/// Loose mirror of the on-disk shape so one malformed per-key series does
/// not take down every other instrument.
#[derive(Deserialize)]
struct RawHistory {
    #[serde(default)]
    generated_at: String,
    #[serde(default)]
    series: BTreeMap<String, serde_json::Value>,
}

impl HistoryStore {
    /// Reads the store from disk. A missing or corrupt file yields an empty
    /// store; a malformed series for one key yields an empty series for that
    /// key only.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No readable history at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let raw: RawHistory = match serde_json::from_str(&contents) {
            Ok(r) => r,
            Err(e) => {
                warn!("Discarding corrupt history file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        let series = raw
            .series
            .into_iter()
            .map(|(key, value)| {
                let points = serde_json::from_value::<Vec<Point>>(value).unwrap_or_else(|e| {
                    warn!("Discarding malformed stored series for {}: {}", key, e);
                    Vec::new()
                });
                (key, points)
            })
            .collect();

        HistoryStore {
            generated_at: raw.generated_at,
            series,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }
}

/// Serializes `value` next to `path` and renames it into place, so a crash
/// mid-write never truncates the previous good file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().context("Output path has no parent directory")?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}
