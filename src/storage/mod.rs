//! Persistence layer.
//!
//! Three artifacts per variant, all relative to the storage root:
//! a bounded JSON history log, a bounded `.xlsx` table and one Markdown
//! report per scan.

pub mod history;
pub mod report;
pub mod table;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::types::Variant;

/// Where a variant's artifacts live.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub data_dir: PathBuf,
    pub history_file: PathBuf,
    pub report_dir: PathBuf,
    pub report_prefix: &'static str,
    pub workbook: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: impl AsRef<Path>, variant: Variant) -> Self {
        let root = root.as_ref();
        let (data, history, reports, prefix, workbook) = match variant {
            Variant::Surge => (
                "market_data/buy_signals",
                "buy_signals_history.json",
                "analysis_reports/buy_reports",
                "buy_report",
                "buy_signals_database.xlsx",
            ),
            Variant::Composite => (
                "market_data/realtime_monitor",
                "realtime_history.json",
                "analysis_reports/realtime_reports",
                "realtime_report",
                "realtime_monitor_database.xlsx",
            ),
        };
        let data_dir = root.join(data);
        Self {
            history_file: data_dir.join(history),
            data_dir,
            report_dir: root.join(reports),
            report_prefix: prefix,
            workbook: root.join(workbook),
        }
    }

    /// Paths handed to the publisher.
    pub fn publish_targets(&self) -> Vec<PathBuf> {
        vec![
            self.data_dir.clone(),
            self.report_dir.clone(),
            self.workbook.clone(),
        ]
    }
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
