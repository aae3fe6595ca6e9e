//! Scan notifications.
//!
//! Delivery is best-effort: a missing credential skips the send and a
//! failed send is logged, never propagated.

pub mod telegram;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt::Write as _;

use crate::types::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOutcome {
    Sent,
    /// No credentials configured.
    Skipped,
    Failed,
}

/// What a notification says about one cycle.
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub variant: Variant,
    pub scan_time: DateTime<FixedOffset>,
    pub signal_count: usize,
    /// Pairs at the variant's top alert tier.
    pub escalated_count: usize,
    pub report_file: Option<String>,
}

impl ScanSummary {
    pub fn message(&self) -> String {
        let heading = match self.variant {
            Variant::Surge => "Surge signal analysis complete",
            Variant::Composite => "Realtime monitoring analysis complete",
        };
        let mut text = format!("📊 {heading}\n\n");
        let _ = writeln!(text, "⏰ {}", self.scan_time.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(text, "🎯 Signals: {}", self.signal_count);
        if self.variant == Variant::Composite {
            let _ = writeln!(text, "⚡ Early detections: {}", self.escalated_count);
        }
        let _ = writeln!(
            text,
            "📈 Report: {}",
            self.report_file.as_deref().unwrap_or("N/A")
        );
        text.push_str("\nData has been saved to the repository.");
        text
    }
}
