//! Exchange integrations.
//!
//! Defines the `MarketDataSource` trait consumed by the aggregator and
//! the Upbit REST implementation.

pub mod upbit;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Candle, Interval, OrderBook};

/// Read-only market data.
///
/// An `Err` means "no data for this request"; callers skip the pair
/// rather than abort the scan.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Market codes quoted in `quote` (e.g. `KRW-BTC`), in exchange order.
    async fn list_pairs(&self, quote: &str) -> Result<Vec<String>>;

    /// At most `count` candles, oldest first.
    async fn get_candles(&self, pair: &str, interval: Interval, count: u32) -> Result<Vec<Candle>>;

    async fn get_order_book(&self, pair: &str) -> Result<OrderBook>;

    /// Source name for logging.
    fn name(&self) -> &str;
}
