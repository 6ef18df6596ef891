//! Static reports over a results tree.
//!
//! A results directory holds one folder per test batch, each with the
//! sub-folders listed in [`DEFAULT_DIRS`] and optional `overview.json` and
//! `source.json` summaries.

pub mod html;
pub mod tex;

use chrono::Local;
use log::warn;
use serde_json::Value;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::BatchSummary;
use crate::utils::{file_name, list_subdirs, require_directory};

pub use html::generate_html;
pub use tex::generate_tex;

pub const DEFAULT_DIRS: [&str; 5] = ["Analyzer", "Config", "Grid", "Images", "Log"];

/// Sorted batch directories of a results tree
pub fn batch_dirs(results: &Path) -> Result<Vec<PathBuf>> {
    require_directory(results)?;
    Ok(list_subdirs(results)?)
}

/// Timestamp printed in report headers
pub fn timestamp() -> String {
    Local::now().format("%m/%d/%Y, %H:%M:%S").to_string()
}

/// Lowest/highest MCC and training-data source of one batch
pub fn summarize_batch(dir: &Path) -> BatchSummary {
    let name = file_name(dir);
    let (lowest, highest) = read_json(&dir.join("overview.json"))
        .map(|overview| mcc_range(&overview))
        .unwrap_or((0.0, 0.0));
    let source = read_json(&dir.join("source.json"))
        .and_then(|src| {
            src.get(0)
                .and_then(|first| first.get("trainingDataDirectory"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| name.clone());

    BatchSummary {
        name,
        source,
        lowest,
        highest,
    }
}

/// Min and max of the non-null `Fitness.MCC` values, `(0.0, 0.0)` when there are none
pub fn mcc_range(overview: &Value) -> (f64, f64) {
    let values: Vec<f64> = overview
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("Fitness")?.get("MCC")?.as_f64())
                .collect()
        })
        .unwrap_or_default();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lowest, highest)
}

/// Parse a JSON file, `None` (with a warning) when it is missing or malformed
pub fn read_json(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    match parse_json_file(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to read JSON ({}): {}", path.display(), e);
            None
        }
    }
}

fn parse_json_file(path: &Path) -> Result<Value> {
    let file = fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
