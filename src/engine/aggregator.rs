//! Snapshot aggregator.
//!
//! Walks the pair universe, fetches the series each variant needs,
//! computes metrics, scores them and assembles one `SnapshotRecord` per
//! pair. A pair whose data is missing or too short is skipped; only a
//! failing universe listing aborts the batch.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::exchange::MarketDataSource;
use crate::indicators::composite::{
    CompositeMetrics, DailyVolumeMetrics, ShortTermMetrics, TechnicalIndicators,
    DAILY_FETCH_COUNT, MIN_DAILY_CANDLES, MIN_SHORT_CANDLES, SHORT_FETCH_COUNT,
};
use crate::indicators::orderbook::OrderBookMetrics;
use crate::indicators::surge::{self, SurgeMetrics};
use crate::scoring::{self, ScoreCard};
use crate::types::{
    Candle, Interval, PairMetrics, ScanBatch, ScanError, SnapshotRecord, Variant,
};

/// Builds scan batches from a market data source.
pub struct SnapshotAggregator {
    source: Box<dyn MarketDataSource>,
    quote: String,
    surge_delay: Duration,
    composite_delay: Duration,
}

impl SnapshotAggregator {
    pub fn new(source: Box<dyn MarketDataSource>, cfg: &AppConfig) -> Self {
        Self {
            source,
            quote: cfg.scanner.quote.clone(),
            surge_delay: cfg.pair_delay(Variant::Surge),
            composite_delay: cfg.pair_delay(Variant::Composite),
        }
    }

    /// Scan every pair once, stamping records with `scan_time`.
    pub async fn collect(
        &self,
        variant: Variant,
        scan_time: DateTime<FixedOffset>,
    ) -> Result<ScanBatch> {
        let pairs = self
            .source
            .list_pairs(&self.quote)
            .await
            .map_err(|e| ScanError::NoUniverse {
                quote: self.quote.clone(),
                message: format!("{e:#}"),
            })?;

        info!(
            variant = %variant,
            source = self.source.name(),
            pairs = pairs.len(),
            "Collecting market data"
        );

        let delay = match variant {
            Variant::Surge => self.surge_delay,
            Variant::Composite => self.composite_delay,
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = match variant {
                Variant::Surge => self.analyze_surge(pair, scan_time).await,
                Variant::Composite => self.analyze_composite(pair, scan_time).await,
            };
            match result {
                Ok(record) => {
                    debug!(pair = %pair, score = record.score, alert = %record.alert_level, "Scored");
                    records.push(record);
                }
                Err(e) => {
                    debug!(pair = %pair, error = %e, "Skipping pair");
                    skipped += 1;
                }
            }
        }

        info!(
            variant = %variant,
            records = records.len(),
            skipped,
            "Collection complete"
        );

        Ok(ScanBatch {
            variant,
            scan_time,
            universe_size: pairs.len(),
            records,
        })
    }

    /// Score one pair from its 5-minute series.
    pub async fn analyze_surge(
        &self,
        pair: &str,
        scan_time: DateTime<FixedOffset>,
    ) -> Result<SnapshotRecord, ScanError> {
        let series = self
            .candles(pair, Interval::Minute5, surge::FETCH_COUNT, surge::MIN_CANDLES)
            .await?;
        let orderbook = self.order_book(pair).await;

        let metrics =
            SurgeMetrics::compute(&series, orderbook).ok_or_else(|| ScanError::InsufficientData {
                pair: pair.to_string(),
                interval: Interval::Minute5,
                needed: surge::MIN_CANDLES,
                available: series.len(),
            })?;
        let card = scoring::surge::evaluate(&metrics);
        Ok(record(pair, scan_time, metrics.price, card, PairMetrics::Surge(metrics)))
    }

    /// Score one pair from its 5m, 15m and daily series.
    pub async fn analyze_composite(
        &self,
        pair: &str,
        scan_time: DateTime<FixedOffset>,
    ) -> Result<SnapshotRecord, ScanError> {
        let m5 = self
            .candles(pair, Interval::Minute5, SHORT_FETCH_COUNT, MIN_SHORT_CANDLES)
            .await?;
        let m15 = self
            .candles(pair, Interval::Minute15, SHORT_FETCH_COUNT, MIN_SHORT_CANDLES)
            .await?;
        let daily = self
            .candles(pair, Interval::Day, DAILY_FETCH_COUNT, MIN_DAILY_CANDLES)
            .await?;
        let orderbook = self.order_book(pair).await;

        let insufficient = |interval: Interval, series: &[Candle]| ScanError::InsufficientData {
            pair: pair.to_string(),
            interval,
            needed: MIN_SHORT_CANDLES,
            available: series.len(),
        };
        let short_term = ShortTermMetrics::compute(&m5, &m15)
            .ok_or_else(|| insufficient(Interval::Minute5, &m5[..]))?;
        let daily_volume =
            DailyVolumeMetrics::compute(&daily).ok_or_else(|| insufficient(Interval::Day, &daily[..]))?;
        let technicals = TechnicalIndicators::compute(&daily);

        let metrics = CompositeMetrics {
            short_term,
            daily: daily_volume,
            orderbook,
            technicals,
        };
        let card = scoring::composite::evaluate(&metrics);
        let price = metrics.short_term.current_price;
        Ok(record(pair, scan_time, price, card, PairMetrics::Composite(metrics)))
    }

    // -- Internal helpers ------------------------------------------------

    async fn candles(
        &self,
        pair: &str,
        interval: Interval,
        count: u32,
        min: usize,
    ) -> Result<Vec<Candle>, ScanError> {
        let series = self
            .source
            .get_candles(pair, interval, count)
            .await
            .map_err(|e| ScanError::Fetch {
                pair: pair.to_string(),
                what: format!("{interval} candles"),
                message: format!("{e:#}"),
            })?;
        if series.len() < min {
            return Err(ScanError::InsufficientData {
                pair: pair.to_string(),
                interval,
                needed: min,
                available: series.len(),
            });
        }
        Ok(series)
    }

    /// Order-book metrics, or `None` when the snapshot is unavailable.
    async fn order_book(&self, pair: &str) -> Option<OrderBookMetrics> {
        match self.source.get_order_book(pair).await {
            Ok(book) => Some(OrderBookMetrics::from_book(&book)),
            Err(e) => {
                debug!(pair = %pair, error = %e, "No order book");
                None
            }
        }
    }
}

fn record(
    pair: &str,
    scan_time: DateTime<FixedOffset>,
    price: f64,
    card: ScoreCard,
    metrics: PairMetrics,
) -> SnapshotRecord {
    SnapshotRecord {
        timestamp: scan_time,
        pair: pair.to_string(),
        price,
        score: card.score,
        max_score: card.max,
        alert_level: card.alert,
        signals: card.signals,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
