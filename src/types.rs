//! Shared types for the TICKWATCH scanner.
//!
//! These types form the data model used across all modules.
//! Exchange, indicator, scoring and storage modules depend on them
//! without depending on each other.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::composite::CompositeMetrics;
use crate::indicators::surge::SurgeMetrics;

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

/// Candle bucket size requested from the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    Minute5,
    Minute15,
    Day,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute5 => "minute5",
            Interval::Minute15 => "minute15",
            Interval::Day => "day",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One OHLCV bucket. Series are always ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Closed above its open.
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }
}

// ---------------------------------------------------------------------------
// Order book
// ---------------------------------------------------------------------------

/// One price level of an order book snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_price: f64,
    pub ask_size: f64,
}

/// Point-in-time order book, best level first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub pair: String,
    pub levels: Vec<OrderBookLevel>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Categorical urgency of a scored pair.
///
/// Surge scans use `Normal < High < Critical`; composite scans use
/// `Normal < Early`. The two ladders never mix within one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Normal,
    Early,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "NORMAL",
            AlertLevel::Early => "EARLY",
            AlertLevel::High => "HIGH",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scan pipeline produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// 5-minute surge detector, scored 0–10.
    Surge,
    /// Short-term + daily multi-indicator monitor, scored 0–14.
    Composite,
}

impl Variant {
    pub const ALL: &'static [Variant] = &[Variant::Surge, Variant::Composite];

    /// Upper bound of the variant's score.
    pub fn max_score(&self) -> u8 {
        match self {
            Variant::Surge => 10,
            Variant::Composite => 14,
        }
    }

    /// Highest alert level the variant's rubric can raise.
    pub fn top_alert(&self) -> AlertLevel {
        match self {
            Variant::Surge => AlertLevel::Critical,
            Variant::Composite => AlertLevel::Early,
        }
    }

    /// Human title used in commit messages and notifications.
    pub fn title(&self) -> &'static str {
        match self {
            Variant::Surge => "Update buy signals",
            Variant::Composite => "Update realtime monitor",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Surge => write!(f, "surge"),
            Variant::Composite => write!(f, "composite"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "surge" | "fast" | "buy" => Ok(Variant::Surge),
            "composite" | "realtime" | "monitor" => Ok(Variant::Composite),
            _ => Err(anyhow::anyhow!("Unknown scan variant: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

/// Variant-specific indicator bundle attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum PairMetrics {
    Surge(SurgeMetrics),
    Composite(CompositeMetrics),
}

/// One scored pair from one scan cycle. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub pair: String,
    pub price: f64,
    pub score: u8,
    pub max_score: u8,
    pub alert_level: AlertLevel,
    pub signals: Vec<String>,
    pub metrics: PairMetrics,
}

impl SnapshotRecord {
    /// The base asset symbol (`KRW-BTC` → `BTC`).
    pub fn symbol(&self) -> &str {
        display_symbol(&self.pair)
    }

    pub fn surge(&self) -> Option<&SurgeMetrics> {
        match &self.metrics {
            PairMetrics::Surge(m) => Some(m),
            PairMetrics::Composite(_) => None,
        }
    }

    pub fn composite(&self) -> Option<&CompositeMetrics> {
        match &self.metrics {
            PairMetrics::Composite(m) => Some(m),
            PairMetrics::Surge(_) => None,
        }
    }
}

impl fmt::Display for SnapshotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} {} price={} [{}]",
            self.pair,
            self.score,
            self.max_score,
            self.alert_level,
            self.price,
            self.signals.join(", "),
        )
    }
}

/// Strip the quote-currency prefix from an exchange market code.
pub fn display_symbol(pair: &str) -> &str {
    pair.split_once('-').map(|(_, base)| base).unwrap_or(pair)
}

/// Output of one pass over the pair universe.
#[derive(Debug, Clone)]
pub struct ScanBatch {
    pub variant: Variant,
    pub scan_time: DateTime<FixedOffset>,
    /// Number of pairs listed by the exchange (scanned or skipped).
    pub universe_size: usize,
    pub records: Vec<SnapshotRecord>,
}

impl ScanBatch {
    /// Records at the variant's top alert tier.
    pub fn escalated_count(&self) -> usize {
        let top = self.variant.top_alert();
        self.records.iter().filter(|r| r.alert_level == top).count()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reasons a scan step yields no data.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Fetch failed ({pair} {what}): {message}")]
    Fetch {
        pair: String,
        what: String,
        message: String,
    },

    #[error("Insufficient history for {pair} {interval}: need {needed}, have {available}")]
    InsufficientData {
        pair: String,
        interval: Interval,
        needed: usize,
        available: usize,
    },

    #[error("Pair universe unavailable for {quote}: {message}")]
    NoUniverse { quote: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
