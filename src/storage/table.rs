//! Bounded spreadsheet database.
//!
//! One worksheet per variant with a fixed, styled header row. Rows are
//! appended per scan and the oldest are dropped once the table exceeds
//! its bound. Existing workbooks are read with `calamine` and rewritten
//! in full with `rust_xlsxwriter`.

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use std::path::Path;
use tracing::{debug, warn};

use super::ensure_parent;
use crate::types::{AlertLevel, SnapshotRecord, Variant};

/// Data rows kept when no limit is configured (header excluded).
pub const DEFAULT_LIMIT: usize = 1000;

const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const STRONG_BUY_SCORE: u8 = 7;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Sheet name, header and header fill for one variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSchema {
    pub sheet_name: &'static str,
    pub headers: &'static [&'static str],
    /// `0xRRGGBB`.
    pub header_color: u32,
}

pub const SURGE_SCHEMA: TableSchema = TableSchema {
    sheet_name: "Surge Signals",
    headers: &[
        "Scan Time",
        "Pair",
        "Level",
        "Score",
        "Price",
        "Volume Ratio",
        "5m Change %",
        "15m Change %",
        "Consecutive Green",
        "Buying Pressure %",
    ],
    header_color: 0xFF6B6B,
};

pub const COMPOSITE_SCHEMA: TableSchema = TableSchema {
    sheet_name: "Realtime Monitor",
    headers: &[
        "Scan Time",
        "Pair",
        "Signal Type",
        "Score",
        "Price",
        "5m Volume Ratio",
        "5m Change",
        "Consecutive Increase",
        "Daily Volume Ratio",
        "RSI",
        "Verdict",
    ],
    header_color: 0x366092,
};

impl TableSchema {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Surge => SURGE_SCHEMA,
            Variant::Composite => COMPOSITE_SCHEMA,
        }
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Empty => Cell::Text(String::new()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Number(f64::from(v))
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// In-memory copy of one worksheet (header excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: TableSchema,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Load the workbook at `path`, or start an empty table when it does
    /// not exist. An unreadable workbook is an error so it is never
    /// silently replaced.
    pub fn open_or_init(path: &Path, schema: TableSchema) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Initialising new table");
            return Ok(Self::new(schema));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open workbook {}", path.display()))?;
        let range = workbook
            .worksheet_range_at(0)
            .with_context(|| format!("Workbook {} has no sheets", path.display()))?
            .with_context(|| format!("Failed to read sheet in {}", path.display()))?;

        let mut rows = range.rows();
        if let Some(header) = rows.next() {
            let found: Vec<String> = header.iter().map(|d| d.to_string()).collect();
            if found != schema.headers {
                warn!(path = %path.display(), ?found, "Workbook header differs, rewriting with current header");
            }
        }
        let rows = rows
            .map(|r| r.iter().map(Cell::from_data).collect())
            .collect();

        Ok(Self { schema, rows })
    }

    pub fn append(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Drop the oldest rows beyond `limit`. Returns how many were removed.
    pub fn truncate_oldest(&mut self, limit: usize) -> usize {
        let excess = self.rows.len().saturating_sub(limit);
        self.rows.drain(..excess);
        excess
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the whole table with a bold, filled, centred header.
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(self.schema.sheet_name)
            .context("Invalid sheet name")?;

        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(self.schema.header_color))
            .set_align(FormatAlign::Center);

        for (col, title) in self.schema.headers.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *title, &header)
                .context("Failed to write header")?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Text(s) => sheet.write_string(r, c, s),
                    Cell::Number(n) => sheet.write_number(r, c, *n),
                }
                .with_context(|| format!("Failed to write row {r}"))?;
            }
        }

        workbook
            .save(path)
            .with_context(|| format!("Failed to save workbook {}", path.display()))?;
        debug!(path = %path.display(), rows = self.rows.len(), "Table saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Record → row
// ---------------------------------------------------------------------------

/// Table row for a record, shaped by its variant.
pub fn row_for(record: &SnapshotRecord) -> Vec<Cell> {
    let time = record.timestamp.format(SCAN_TIME_FORMAT).to_string();
    let score = format!("{}/{}", record.score, record.max_score);

    if let Some(m) = record.surge() {
        return vec![
            time.into(),
            record.symbol().into(),
            record.alert_level.as_str().into(),
            score.into(),
            record.price.into(),
            fixed(m.volume_ratio, 2).into(),
            signed(m.price_change_5m).into(),
            signed(m.price_change_15m).into(),
            m.consecutive_green.into(),
            fixed(m.buying_pressure.map(|p| p * 100.0), 0).into(),
        ];
    }

    let composite = record.composite();
    let short = composite.map(|c| &c.short_term);
    let rsi = composite.and_then(|c| c.technicals.as_ref()).map(|t| t.rsi);
    vec![
        time.into(),
        record.symbol().into(),
        record.alert_level.as_str().into(),
        score.into(),
        record.price.into(),
        fixed(short.and_then(|s| s.volume_5m_ratio), 2).into(),
        format!("{}%", signed(short.and_then(|s| s.price_change_5m))).into(),
        short.map_or(0, |s| s.consecutive_increase).into(),
        fixed(composite.and_then(|c| c.daily.volume_ratio), 2).into(),
        fixed(rsi, 1).into(),
        verdict(record).into(),
    ]
}

/// Composite verdict column.
pub fn verdict(record: &SnapshotRecord) -> &'static str {
    if record.alert_level == AlertLevel::Early {
        "🔥 Early detection"
    } else if record.score >= STRONG_BUY_SCORE {
        "Strong buy"
    } else {
        "Buy watch"
    }
}

/// Missing values render as `0` with the requested precision.
fn fixed(v: Option<f64>, precision: usize) -> String {
    format!("{:.*}", precision, v.unwrap_or(0.0))
}

fn signed(v: Option<f64>) -> String {
    format!("{:+.2}", v.unwrap_or(0.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::composite::{CompositeMetrics, DailyVolumeMetrics, ShortTermMetrics};
    use crate::indicators::fixtures::flat;
    use crate::indicators::surge::SurgeMetrics;
    use crate::types::PairMetrics;
    use chrono::{FixedOffset, TimeZone};

    fn surge_record(pair: &str, score: u8, alert: AlertLevel) -> SnapshotRecord {
        let mut s = flat(50, 100.0);
        s[49].close = 106.0;
        s[49].volume = 320.0;
        SnapshotRecord {
            timestamp: FixedOffset::east_opt(9 * 3600)
                .unwrap()
                .with_ymd_and_hms(2026, 3, 4, 15, 7, 0)
                .unwrap(),
            pair: pair.to_string(),
            price: 106.0,
            score,
            max_score: 10,
            alert_level: alert,
            signals: Vec::new(),
            metrics: PairMetrics::Surge(SurgeMetrics::compute(&s, None).unwrap()),
        }
    }

    fn composite_record(score: u8, alert: AlertLevel) -> SnapshotRecord {
        let m5 = flat(30, 100.0);
        let metrics = CompositeMetrics {
            short_term: ShortTermMetrics::compute(&m5, &m5).unwrap(),
            daily: DailyVolumeMetrics::compute(&flat(30, 100.0)).unwrap(),
            orderbook: None,
            technicals: None,
        };
        SnapshotRecord {
            max_score: 14,
            metrics: PairMetrics::Composite(metrics),
            ..surge_record("KRW-ETH", score, alert)
        }
    }

    #[test]
    fn test_surge_row() {
        let row = row_for(&surge_record("KRW-BTC", 7, AlertLevel::Critical));
        assert_eq!(row.len(), SURGE_SCHEMA.headers.len());
        assert_eq!(row[0].as_text(), Some("2026-03-04 15:07"));
        assert_eq!(row[1].as_text(), Some("BTC"));
        assert_eq!(row[2].as_text(), Some("CRITICAL"));
        assert_eq!(row[3].as_text(), Some("7/10"));
        assert_eq!(row[4], Cell::Number(106.0));
        assert_eq!(row[5].as_text(), Some("3.20"));
        assert_eq!(row[6].as_text(), Some("+6.00"));
        assert_eq!(row[8], Cell::Number(1.0));
        assert_eq!(row[9].as_text(), Some("20"));
    }

    #[test]
    fn test_composite_row_and_verdicts() {
        let row = row_for(&composite_record(8, AlertLevel::Early));
        assert_eq!(row.len(), COMPOSITE_SCHEMA.headers.len());
        assert_eq!(row[3].as_text(), Some("8/14"));
        assert_eq!(row[6].as_text(), Some("+0.00%"));
        assert_eq!(row[9].as_text(), Some("0.0"));
        assert_eq!(row[10].as_text(), Some("🔥 Early detection"));

        assert_eq!(verdict(&composite_record(7, AlertLevel::Normal)), "Strong buy");
        assert_eq!(verdict(&composite_record(6, AlertLevel::Normal)), "Buy watch");
    }

    #[test]
    fn test_truncate_oldest() {
        let mut t = Table::new(SURGE_SCHEMA);
        for i in 0..12 {
            t.append(vec![Cell::Number(i as f64)]);
        }
        assert_eq!(t.truncate_oldest(10), 2);
        assert_eq!(t.len(), 10);
        assert_eq!(t.rows()[0], vec![Cell::Number(2.0)]);
        assert_eq!(t.truncate_oldest(10), 0);
    }

    #[test]
    fn test_open_missing_initialises_empty() {
        let dir = tempfile::tempdir().unwrap();
        let t = Table::open_or_init(&dir.path().join("db.xlsx"), COMPOSITE_SCHEMA).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.xlsx");

        let mut t = Table::new(SURGE_SCHEMA);
        t.append(row_for(&surge_record("KRW-BTC", 7, AlertLevel::Critical)));
        t.append(row_for(&surge_record("KRW-ETH", 0, AlertLevel::Normal)));
        t.save(&path).unwrap();

        let mut reopened = Table::open_or_init(&path, SURGE_SCHEMA).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.rows()[0][1].as_text(), Some("BTC"));
        assert_eq!(reopened.rows()[1][1].as_text(), Some("ETH"));
        assert_eq!(reopened.rows()[0][4], Cell::Number(106.0));

        reopened.append(row_for(&surge_record("KRW-XRP", 1, AlertLevel::Normal)));
        assert_eq!(reopened.truncate_oldest(2), 1);
        reopened.save(&path).unwrap();

        let again = Table::open_or_init(&path, SURGE_SCHEMA).unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(again.rows()[0][1].as_text(), Some("ETH"));
    }

    #[test]
    fn test_corrupt_workbook_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.xlsx");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(Table::open_or_init(&path, SURGE_SCHEMA).is_err());
    }
}
