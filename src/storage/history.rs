//! Rolling JSON history.
//!
//! The log is a JSON array of `{scan_time, data}` entries. Existing
//! entries are kept as opaque values so older record shapes survive.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

use super::ensure_parent;
use crate::types::SnapshotRecord;

/// Entries kept when no limit is configured.
pub const DEFAULT_LIMIT: usize = 100;

/// Load the history log. A missing file is an empty log.
pub fn load(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse history from {}", path.display()))
}

/// Append one scan and keep the most recent `limit` entries. Returns the
/// resulting length.
pub fn append(
    path: &Path,
    scan_time: DateTime<FixedOffset>,
    records: &[SnapshotRecord],
    limit: usize,
) -> Result<usize> {
    let mut history = load(path)?;
    let data = serde_json::to_value(records).context("Failed to serialise records")?;
    history.push(json!({
        "scan_time": scan_time.to_rfc3339(),
        "data": data,
    }));
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }

    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(&history).context("Failed to serialise history")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write history to {}", path.display()))?;

    debug!(path = %path.display(), entries = history.len(), "History saved");
    Ok(history.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
