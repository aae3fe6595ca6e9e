//! Mock exchange for integration testing.
//!
//! Provides a deterministic `MarketDataSource` whose pairs, candle series
//! and order books are fully controllable from test code, with no network
//! access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tickwatch::exchange::MarketDataSource;
use tickwatch::types::{Candle, Interval, OrderBook, OrderBookLevel};

/// In-memory exchange. Every interval of a pair serves the same series,
/// truncated to the most recent `count` candles.
#[derive(Default)]
pub struct MockExchange {
    pairs: Vec<String>,
    series: HashMap<String, Vec<Candle>>,
    books: HashMap<String, OrderBook>,
    /// Every `get_candles` call, in order.
    calls: Arc<Mutex<Vec<(String, Interval)>>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair with its candle series.
    pub fn with_pair(mut self, pair: &str, candles: Vec<Candle>) -> Self {
        self.pairs.push(pair.to_string());
        self.series.insert(pair.to_string(), candles);
        self
    }

    /// Register a pair that is listed but has no data.
    pub fn with_dead_pair(mut self, pair: &str) -> Self {
        self.pairs.push(pair.to_string());
        self
    }

    pub fn with_book(mut self, pair: &str, bid_size: f64, ask_size: f64) -> Self {
        let level = OrderBookLevel {
            bid_price: 99.0,
            bid_size,
            ask_price: 101.0,
            ask_size,
        };
        self.books.insert(
            pair.to_string(),
            OrderBook {
                pair: pair.to_string(),
                levels: vec![level; 5],
            },
        );
        self
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<(String, Interval)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MarketDataSource for MockExchange {
    async fn list_pairs(&self, quote: &str) -> Result<Vec<String>> {
        let prefix = format!("{quote}-");
        Ok(self
            .pairs
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn get_candles(&self, pair: &str, interval: Interval, count: u32) -> Result<Vec<Candle>> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("call log poisoned"))?
            .push((pair.to_string(), interval));
        let series = self
            .series
            .get(pair)
            .ok_or_else(|| anyhow!("Mock: no candles for {pair}"))?;
        let skip = series.len().saturating_sub(count as usize);
        Ok(series[skip..].to_vec())
    }

    async fn get_order_book(&self, pair: &str) -> Result<OrderBook> {
        self.books
            .get(pair)
            .cloned()
            .ok_or_else(|| anyhow!("Mock: no order book for {pair}"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Series builders
// ---------------------------------------------------------------------------

/// `n` flat candles at price 100 and volume 100.
pub fn flat(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| Candle {
            time: start + Duration::minutes(5 * i as i64),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 100.0,
        })
        .collect()
}

/// Flat series whose last candle closes 6 % higher on 3.2x volume.
pub fn spike(n: usize) -> Vec<Candle> {
    let mut s = flat(n);
    if let Some(last) = s.last_mut() {
        last.close = 106.0;
        last.high = 106.0;
        last.volume = 320.0;
    }
    s
}
