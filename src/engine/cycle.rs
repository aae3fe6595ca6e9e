//! Cycle runner.
//!
//! One cycle: collect a batch, then history → table → report → publish →
//! notify. Each persistence step is attempted even when an earlier one
//! failed; only a failed collection aborts the cycle.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::aggregator::SnapshotAggregator;
use crate::alerts::telegram::TelegramNotifier;
use crate::alerts::{NotifyOutcome, ScanSummary};
use crate::config::AppConfig;
use crate::publish::{PublishOutcome, Publisher};
use crate::storage::report::{self, ReportOptions};
use crate::storage::table::{self, Table, TableSchema};
use crate::storage::{history, ArtifactPaths};
use crate::types::{ScanBatch, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Skipped,
    Failed,
}

/// Per-step results of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleOutcomes {
    pub history: StepStatus,
    pub table: StepStatus,
    pub report: StepStatus,
    /// `None` when publishing is disabled or the batch was empty.
    pub publish: Option<PublishOutcome>,
    pub publish_status: StepStatus,
    pub notify: NotifyOutcome,
}

impl CycleOutcomes {
    fn skipped() -> Self {
        Self {
            history: StepStatus::Skipped,
            table: StepStatus::Skipped,
            report: StepStatus::Skipped,
            publish: None,
            publish_status: StepStatus::Skipped,
            notify: NotifyOutcome::Skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub variant: Variant,
    pub scan_time: DateTime<FixedOffset>,
    pub pairs_scanned: usize,
    pub records: usize,
    /// Records at or above the report threshold.
    pub signals: usize,
    pub early_or_critical: usize,
    pub report_path: Option<PathBuf>,
    pub outcomes: CycleOutcomes,
}

/// Owns everything a cycle touches. Built once in `main`.
pub struct CycleRunner {
    aggregator: SnapshotAggregator,
    cfg: AppConfig,
    offset: FixedOffset,
    notifier: TelegramNotifier,
    publisher: Option<Publisher>,
}

impl CycleRunner {
    /// `publisher` is only used when `cfg.publish.enabled` is set.
    pub fn new(
        aggregator: SnapshotAggregator,
        cfg: AppConfig,
        notifier: TelegramNotifier,
        publisher: Option<Publisher>,
    ) -> Result<Self> {
        let offset = cfg.scanner.offset()?;
        let publisher = publisher.filter(|_| cfg.publish.enabled);
        Ok(Self {
            aggregator,
            cfg,
            offset,
            notifier,
            publisher,
        })
    }

    pub async fn run_cycle(&self, variant: Variant) -> Result<CycleReport> {
        let scan_time = Utc::now().with_timezone(&self.offset);
        self.run_cycle_at(variant, scan_time).await
    }

    /// Run a cycle stamped with `scan_time`.
    pub async fn run_cycle_at(
        &self,
        variant: Variant,
        scan_time: DateTime<FixedOffset>,
    ) -> Result<CycleReport> {
        info!(variant = %variant, scan_time = %scan_time, "Starting cycle");

        let batch = self
            .aggregator
            .collect(variant, scan_time)
            .await
            .with_context(|| format!("{variant} collection failed"))?;

        if batch.records.is_empty() {
            warn!(variant = %variant, pairs = batch.universe_size, "No records collected");
            return Ok(CycleReport {
                variant,
                scan_time,
                pairs_scanned: batch.universe_size,
                records: 0,
                signals: 0,
                early_or_critical: 0,
                report_path: None,
                outcomes: CycleOutcomes::skipped(),
            });
        }

        let paths = ArtifactPaths::new(&self.cfg.storage.root, variant);
        let mut outcomes = CycleOutcomes::skipped();

        // -- History ---------------------------------------------------------

        outcomes.history = match history::append(
            &paths.history_file,
            scan_time,
            &batch.records,
            self.cfg.storage.history_limit,
        ) {
            Ok(_) => StepStatus::Done,
            Err(e) => {
                error!(error = %format!("{e:#}"), "History update failed");
                StepStatus::Failed
            }
        };

        // -- Table -----------------------------------------------------------

        outcomes.table = match save_table(&paths.workbook, &batch, self.cfg.storage.table_limit) {
            Ok(()) => StepStatus::Done,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Table update failed");
                StepStatus::Failed
            }
        };

        // -- Report ----------------------------------------------------------

        let opts = ReportOptions {
            threshold: self.cfg.report_threshold(variant),
            top_n: self.cfg.storage.report_top_n,
            thresholds: self.cfg.thresholds.clone(),
        };
        let rendered = report::render(&batch, &opts);
        let report_path = match report::write_new(
            &paths.report_dir,
            paths.report_prefix,
            scan_time,
            &rendered.body,
        ) {
            Ok(path) => {
                outcomes.report = StepStatus::Done;
                Some(path)
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Report write failed");
                outcomes.report = StepStatus::Failed;
                None
            }
        };

        // -- Publish ---------------------------------------------------------

        if let Some(publisher) = &self.publisher {
            let message = Publisher::commit_message(variant, scan_time);
            match publisher.publish(&paths.publish_targets(), &message).await {
                Ok(outcome) => {
                    outcomes.publish = Some(outcome);
                    outcomes.publish_status = StepStatus::Done;
                }
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "Publish failed");
                    outcomes.publish_status = StepStatus::Failed;
                }
            }
        }

        // -- Notify ----------------------------------------------------------

        let summary = scan_summary(&batch, rendered.signal_count, report_path.as_deref());
        outcomes.notify = self.notifier.notify(&summary).await;

        Ok(CycleReport {
            variant,
            scan_time,
            pairs_scanned: batch.universe_size,
            records: batch.records.len(),
            signals: rendered.signal_count,
            early_or_critical: batch.escalated_count(),
            report_path,
            outcomes,
        })
    }
}

/// Log a cycle summary as one structured line.
pub fn log_cycle_report(report: &CycleReport) {
    info!(
        variant = %report.variant,
        scan_time = %report.scan_time,
        scanned = report.pairs_scanned,
        records = report.records,
        signals = report.signals,
        early_or_critical = report.early_or_critical,
        report = ?report.report_path,
        history = ?report.outcomes.history,
        table = ?report.outcomes.table,
        publish = ?report.outcomes.publish_status,
        notify = ?report.outcomes.notify,
        "Cycle complete"
    );
}

fn save_table(path: &Path, batch: &ScanBatch, limit: usize) -> Result<()> {
    let mut table = Table::open_or_init(path, TableSchema::for_variant(batch.variant))?;
    for record in &batch.records {
        table.append(table::row_for(record));
    }
    let dropped = table.truncate_oldest(limit);
    if dropped > 0 {
        info!(dropped, limit, "Table truncated");
    }
    table.save(path)
}

/// Signals are counted against the report threshold; escalations across
/// the whole batch.
fn scan_summary(batch: &ScanBatch, signal_count: usize, report_path: Option<&Path>) -> ScanSummary {
    ScanSummary {
        variant: batch.variant,
        scan_time: batch.scan_time,
        signal_count,
        escalated_count: batch.escalated_count(),
        report_file: report_path.and_then(file_name),
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
