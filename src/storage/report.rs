//! Markdown scan report.
//!
//! Rendering is pure; [`write_new`] never overwrites an existing report.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ensure_parent;
use crate::config::ThresholdConfig;
use crate::indicators::mean;
use crate::types::{AlertLevel, ScanBatch, SnapshotRecord, Variant};

/// Detail blocks rendered when no limit is configured.
pub const DEFAULT_TOP_N: usize = 20;

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M";
const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Knobs for one render.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub threshold: u8,
    pub top_n: usize,
    pub thresholds: ThresholdConfig,
}

/// A rendered report plus the counts the notifier needs.
#[derive(Debug, Clone)]
pub struct Report {
    pub body: String,
    /// Records at or above the threshold.
    pub signal_count: usize,
    /// Of those, how many reached the variant's top alert tier.
    pub escalated_count: usize,
}

/// Records at or above `threshold`, highest score first. Ties keep batch
/// order.
pub fn select(records: &[SnapshotRecord], threshold: u8) -> Vec<&SnapshotRecord> {
    let mut selected: Vec<_> = records.iter().filter(|r| r.score >= threshold).collect();
    selected.sort_by(|a, b| b.score.cmp(&a.score));
    selected
}

pub fn render(batch: &ScanBatch, opts: &ReportOptions) -> Report {
    let selected = select(&batch.records, opts.threshold);
    let top = batch.variant.top_alert();
    let escalated_count = selected.iter().filter(|r| r.alert_level == top).count();

    let mut out = String::new();
    let title = match batch.variant {
        Variant::Surge => "Surge Buy Signal Report",
        Variant::Composite => "Realtime Monitor Report",
    };
    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "Generated: {}\n", batch.scan_time.format(GENERATED_FORMAT));

    let _ = writeln!(out, "## 📊 Scan Summary\n");
    let _ = writeln!(out, "- Pairs listed: {}", batch.universe_size);
    let _ = writeln!(out, "- Pairs analysed: {}", batch.records.len());
    let _ = writeln!(out, "- Signals detected: {}", selected.len());
    let _ = writeln!(out, "- {} alerts: {escalated_count}", title_case(top));
    out.push('\n');

    let _ = writeln!(out, "## 🎯 Top Signals\n");
    if selected.is_empty() {
        let _ = writeln!(out, "No pair reached a score of {}.\n", opts.threshold);
    }
    for r in selected.iter().take(opts.top_n) {
        detail_block(&mut out, r);
    }

    let _ = writeln!(out, "## 📈 Market Statistics\n");
    match batch.variant {
        Variant::Surge => surge_stats(&mut out, &batch.records, &opts.thresholds),
        Variant::Composite => composite_stats(&mut out, &batch.records, &opts.thresholds),
    }

    out.push_str("\n---\n*This report was generated automatically.*\n");

    Report {
        body: out,
        signal_count: selected.len(),
        escalated_count,
    }
}

/// Write `{prefix}_{YYYYMMDD_HHMM}.md` under `dir`, adding `_2`, `_3`, …
/// when the name is taken.
pub fn write_new(
    dir: &Path,
    prefix: &str,
    scan_time: DateTime<FixedOffset>,
    body: &str,
) -> Result<PathBuf> {
    let stamp = scan_time.format(FILE_STAMP_FORMAT);
    let base = dir.join(format!("{prefix}_{stamp}.md"));
    ensure_parent(&base)?;

    let mut n = 1u32;
    loop {
        let path = if n == 1 {
            base.clone()
        } else {
            dir.join(format!("{prefix}_{stamp}_{n}.md"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body.as_bytes())
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                info!(path = %path.display(), "Report written");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create report {}", path.display()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn title_case(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Normal => "Normal",
        AlertLevel::Early => "Early",
        AlertLevel::High => "High",
        AlertLevel::Critical => "Critical",
    }
}

fn detail_block(out: &mut String, r: &SnapshotRecord) {
    let _ = writeln!(
        out,
        "### {} (score {}/{}, {})\n",
        r.symbol(),
        r.score,
        r.max_score,
        r.alert_level
    );
    let _ = writeln!(out, "- Price: {}", format_price(r.price));

    if let Some(m) = r.surge() {
        let _ = writeln!(out, "- Volume ratio: {}x", opt(m.volume_ratio, 2));
        let _ = writeln!(out, "- 5m change: {}%", signed(m.price_change_5m));
        let _ = writeln!(out, "- 15m change: {}%", signed(m.price_change_15m));
        let _ = writeln!(out, "- Consecutive green: {}", m.consecutive_green);
        let _ = writeln!(out, "- Buying pressure: {}%", opt(m.buying_pressure.map(|p| p * 100.0), 0));
    }
    if let Some(c) = r.composite() {
        let s = &c.short_term;
        let _ = writeln!(out, "- 5m volume: {}x", opt(s.volume_5m_ratio, 2));
        let _ = writeln!(out, "- 5m price change: {}%", signed(s.price_change_5m));
        let _ = writeln!(out, "- Consecutive increase: {}", s.consecutive_increase);
        let _ = writeln!(out, "- Daily volume: {}x", opt(c.daily.volume_ratio, 2));
        if let Some(t) = &c.technicals {
            let _ = writeln!(out, "- RSI: {:.1}", t.rsi);
        }
    }
    if !r.signals.is_empty() {
        let _ = writeln!(out, "- Signals: {}", r.signals.join(", "));
    }
    out.push('\n');
}

fn surge_stats(out: &mut String, records: &[SnapshotRecord], t: &ThresholdConfig) {
    let metrics: Vec<_> = records.iter().filter_map(|r| r.surge()).collect();
    let ratios: Vec<f64> = metrics.iter().filter_map(|m| m.volume_ratio).collect();
    let changes: Vec<f64> = metrics.iter().filter_map(|m| m.price_change_5m).collect();

    let breakouts = metrics.iter().filter(|m| m.breaking_high).count();
    let spikes = ratios.iter().filter(|&&v| v >= t.volume_spike).count();
    let movers = changes.iter().filter(|&&v| v >= t.price_change).count();
    let runs = metrics
        .iter()
        .filter(|m| m.consecutive_green >= t.consecutive)
        .count();

    let _ = writeln!(out, "- Mean volume ratio: {:.2}", mean(&ratios));
    let _ = writeln!(out, "- Mean 5m change: {:+.2}%", mean(&changes));
    let _ = writeln!(out, "- 20-candle breakouts: {breakouts}");
    let _ = writeln!(out, "- Volume ratio ≥ {}: {spikes}", t.volume_spike);
    let _ = writeln!(out, "- 5m change ≥ {}%: {movers}", t.price_change);
    let _ = writeln!(out, "- Green runs ≥ {}: {runs}", t.consecutive);
}

fn composite_stats(out: &mut String, records: &[SnapshotRecord], t: &ThresholdConfig) {
    let shorts: Vec<_> = records
        .iter()
        .filter_map(|r| r.composite())
        .map(|c| &c.short_term)
        .collect();
    let ratios: Vec<f64> = shorts.iter().filter_map(|s| s.volume_5m_ratio).collect();
    let changes: Vec<f64> = shorts.iter().filter_map(|s| s.price_change_5m).collect();

    let watch = ratios.iter().filter(|&&v| v >= t.volume_watch).count();
    let strong = ratios.iter().filter(|&&v| v >= t.volume_strong).count();

    let _ = writeln!(out, "- Mean 5m volume ratio: {:.2}", mean(&ratios));
    let _ = writeln!(out, "- Mean 5m price change: {:+.2}%", mean(&changes));
    let _ = writeln!(out, "- 5m volume ≥ {} (watch): {watch}", t.volume_watch);
    let _ = writeln!(out, "- 5m volume ≥ {} (strong): {strong}", t.volume_strong);
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn opt(v: Option<f64>, precision: usize) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{:.*}", precision, x))
}

fn signed(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:+.2}"))
}

/// Whole units with thousands separators; sub-100 prices keep decimals.
fn format_price(price: f64) -> String {
    if price.abs() < 100.0 {
        return format!("{price:.4}");
    }
    let whole = format!("{:.0}", price.abs());
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
