//! Fast-surge metrics from a 5-minute series.

use serde::{Deserialize, Serialize};

use super::orderbook::OrderBookMetrics;
use super::{
    breaks_high, buying_pressure, candle_change, consecutive_green, consecutive_volume_increase,
    price_change, volume_acceleration, volume_ratio,
};
use crate::types::Candle;

/// 5-minute candles requested per pair.
pub const FETCH_COUNT: u32 = 50;

/// Pairs with fewer candles are skipped.
pub const MIN_CANDLES: usize = 20;

const VOLUME_WINDOW: usize = 10;
const ACCEL_RECENT: usize = 3;
const ACCEL_PRIOR: usize = 10;
const GREEN_LOOKBACK: usize = 5;
const VOLUME_RUN_LOOKBACK: usize = 4;
const PRESSURE_WINDOW: usize = 5;
const BREAKOUT_WINDOW: usize = 20;

/// Everything the surge scorer looks at for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgeMetrics {
    pub price: f64,
    pub volume: f64,
    pub volume_ratio: Option<f64>,
    pub volume_acceleration: Option<f64>,
    pub candle_change: Option<f64>,
    /// Change over one 5-minute candle, percent.
    pub price_change_5m: Option<f64>,
    /// Change over three 5-minute candles, percent.
    pub price_change_15m: Option<f64>,
    pub consecutive_green: u32,
    pub consecutive_volume: u32,
    pub buying_pressure: Option<f64>,
    pub breaking_high: bool,
    pub orderbook: Option<OrderBookMetrics>,
}

impl SurgeMetrics {
    /// Compute from a 5-minute series. `None` when the series is shorter
    /// than [`MIN_CANDLES`].
    pub fn compute(series: &[Candle], orderbook: Option<OrderBookMetrics>) -> Option<Self> {
        if series.len() < MIN_CANDLES {
            return None;
        }
        let last = series.last()?;

        Some(Self {
            price: last.close,
            volume: last.volume,
            volume_ratio: volume_ratio(series, VOLUME_WINDOW),
            volume_acceleration: volume_acceleration(series, ACCEL_RECENT, ACCEL_PRIOR),
            candle_change: candle_change(series),
            price_change_5m: price_change(series, 1),
            price_change_15m: price_change(series, 3),
            consecutive_green: consecutive_green(series, GREEN_LOOKBACK),
            consecutive_volume: consecutive_volume_increase(series, VOLUME_RUN_LOOKBACK),
            buying_pressure: buying_pressure(series, PRESSURE_WINDOW),
            breaking_high: breaks_high(series, BREAKOUT_WINDOW).unwrap_or(false),
            orderbook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::fixtures::*;

    #[test]
    fn test_compute_requires_min_candles() {
        assert!(SurgeMetrics::compute(&flat(19, 100.0), None).is_none());
        assert!(SurgeMetrics::compute(&flat(20, 100.0), None).is_some());
    }

    #[test]
    fn test_compute_spike() {
        let mut s = flat(50, 100.0);
        let last = s.last_mut().unwrap();
        last.close = 106.0;
        last.high = 106.0;
        last.volume = 320.0;

        let m = SurgeMetrics::compute(&s, None).unwrap();
        assert_eq!(m.price, 106.0);
        assert!((m.volume_ratio.unwrap() - 3.2).abs() < 1e-10);
        assert!((m.price_change_5m.unwrap() - 6.0).abs() < 1e-9);
        assert_eq!(m.consecutive_green, 1);
        assert_eq!(m.consecutive_volume, 1);
        assert!((m.buying_pressure.unwrap() - 0.2).abs() < 1e-10);
        assert!(m.breaking_high);
        assert!(m.orderbook.is_none());
    }

    #[test]
    fn test_compute_twenty_candles_has_no_breakout_window() {
        // 20 candles leave only 19 behind the current one.
        let m = SurgeMetrics::compute(&flat(20, 100.0), None).unwrap();
        assert!(!m.breaking_high);
        assert!(m.volume_ratio.is_some());
    }
}
