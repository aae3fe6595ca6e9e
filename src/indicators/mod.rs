//! Indicator engine.
//!
//! Pure, deterministic statistics over a candle series (oldest first).
//! Every primitive returns `None` when the series is too short for its
//! window; callers treat `None` as "no contribution" rather than an error.
//!
//! Variant-specific bundles live in [`surge`] and [`composite`]; the
//! daily oscillators in [`rsi`], [`macd`] and [`bollinger`]; order-book
//! statistics in [`orderbook`].

pub mod bollinger;
pub mod composite;
pub mod ema;
pub mod macd;
pub mod orderbook;
pub mod rsi;
pub mod surge;

use crate::types::Candle;

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

/// Current volume divided by the mean volume of the `window` candles
/// before it. `Some(0.0)` when that mean is zero.
pub fn volume_ratio(series: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || series.len() < window + 1 {
        return None;
    }
    let (current, prior) = series.split_last()?;
    let trailing = &prior[prior.len() - window..];
    let avg = trailing.iter().map(|c| c.volume).sum::<f64>() / window as f64;
    Some(if avg > 0.0 { current.volume / avg } else { 0.0 })
}

/// Sum of the last `recent` volumes divided by the sum of the `prior`
/// volumes immediately before them.
pub fn volume_acceleration(series: &[Candle], recent: usize, prior: usize) -> Option<f64> {
    if recent == 0 || prior == 0 || series.len() < recent + prior {
        return None;
    }
    let n = series.len();
    let recent_sum: f64 = series[n - recent..].iter().map(|c| c.volume).sum();
    let prior_sum: f64 = series[n - recent - prior..n - recent]
        .iter()
        .map(|c| c.volume)
        .sum();
    Some(if prior_sum > 0.0 { recent_sum / prior_sum } else { 0.0 })
}

/// Mean of the last `recent` volumes divided by the mean of the `prior`
/// volumes before them.
pub fn volume_mean_acceleration(series: &[Candle], recent: usize, prior: usize) -> Option<f64> {
    volume_acceleration(series, recent, prior).map(|r| r * prior as f64 / recent as f64)
}

/// Trailing run of candles whose volume beat the candle before, capped
/// at `lookback`.
pub fn consecutive_volume_increase(series: &[Candle], lookback: usize) -> u32 {
    series
        .windows(2)
        .rev()
        .take(lookback)
        .take_while(|w| w[1].volume > w[0].volume)
        .count() as u32
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// Percent change of the last close versus the close `k` candles earlier.
pub fn price_change(series: &[Candle], k: usize) -> Option<f64> {
    if k == 0 || series.len() < k + 1 {
        return None;
    }
    let last = series.last()?.close;
    let base = series[series.len() - 1 - k].close;
    if base == 0.0 {
        return None;
    }
    Some((last - base) / base * 100.0)
}

/// Body change of the last candle, in percent of its open.
pub fn candle_change(series: &[Candle]) -> Option<f64> {
    let last = series.last()?;
    if last.open == 0.0 {
        return None;
    }
    Some((last.close - last.open) / last.open * 100.0)
}

/// Trailing run of green candles, capped at `lookback`.
pub fn consecutive_green(series: &[Candle], lookback: usize) -> u32 {
    series
        .iter()
        .rev()
        .take(lookback)
        .take_while(|c| c.is_green())
        .count() as u32
}

/// Fraction of the last `n` candles that closed above their open.
pub fn buying_pressure(series: &[Candle], n: usize) -> Option<f64> {
    if n == 0 || series.len() < n {
        return None;
    }
    let green = series[series.len() - n..]
        .iter()
        .filter(|c| c.is_green())
        .count();
    Some(green as f64 / n as f64)
}

/// Whether the last close clears the highest high of the `window`
/// candles before it.
pub fn breaks_high(series: &[Candle], window: usize) -> Option<bool> {
    if window == 0 || series.len() < window + 1 {
        return None;
    }
    let (current, prior) = series.split_last()?;
    let high = prior[prior.len() - window..]
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    Some(current.close > high)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mean of the trailing `window` values.
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    Some(values[values.len() - window..].iter().sum::<f64>() / window as f64)
}

pub fn closes(series: &[Candle]) -> Vec<f64> {
    series.iter().map(|c| c.close).collect()
}

pub fn volumes(series: &[Candle]) -> Vec<f64> {
    series.iter().map(|c| c.volume).collect()
}

/// Mean of a list, `0.0` when empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_volume_ratio_spike() {
        let mut s = flat(11, 100.0);
        s[10].volume = 320.0;
        let r = volume_ratio(&s, 10).unwrap();
        assert!((r - 3.2).abs() < 1e-10);
    }

    #[test]
    fn test_volume_ratio_excludes_current() {
        // Current candle is huge but must not inflate its own baseline.
        let mut s = flat(6, 10.0);
        s[5].volume = 1000.0;
        assert!((volume_ratio(&s, 5).unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_volume_ratio_short_series() {
        assert!(volume_ratio(&flat(10, 100.0), 10).is_none());
        assert!(volume_ratio(&[], 10).is_none());
    }

    #[test]
    fn test_volume_ratio_zero_baseline() {
        let mut s = flat(11, 0.0);
        s[10].volume = 50.0;
        assert_eq!(volume_ratio(&s, 10), Some(0.0));
    }

    #[test]
    fn test_volume_acceleration() {
        let mut s = flat(13, 10.0);
        for c in s.iter_mut().skip(10) {
            c.volume = 40.0;
        }
        // 120 / 100
        assert!((volume_acceleration(&s, 3, 10).unwrap() - 1.2).abs() < 1e-10);
        assert!(volume_acceleration(&s[..12], 3, 10).is_none());
    }

    #[test]
    fn test_volume_mean_acceleration() {
        let mut s = flat(13, 10.0);
        for c in s.iter_mut().skip(10) {
            c.volume = 40.0;
        }
        // 40 / 10
        assert!((volume_mean_acceleration(&s, 3, 10).unwrap() - 4.0).abs() < 1e-10);
        assert!(volume_mean_acceleration(&s[..12], 3, 10).is_none());
    }

    #[test]
    fn test_volume_acceleration_zero_prior() {
        let mut s = flat(13, 0.0);
        s[12].volume = 5.0;
        assert_eq!(volume_acceleration(&s, 3, 10), Some(0.0));
    }

    #[test]
    fn test_price_change() {
        let s = from_closes(&[100.0, 101.0, 102.0, 110.0]);
        assert!((price_change(&s, 3).unwrap() - 10.0).abs() < 1e-10);
        assert!((price_change(&s, 1).unwrap() - (8.0 / 102.0 * 100.0)).abs() < 1e-10);
        assert!(price_change(&s, 4).is_none());
    }

    #[test]
    fn test_price_change_zero_base() {
        let s = from_closes(&[0.0, 10.0]);
        assert!(price_change(&s, 1).is_none());
    }

    #[test]
    fn test_candle_change() {
        let s = series(&[(100.0, 103.0, 1.0)]);
        assert!((candle_change(&s).unwrap() - 3.0).abs() < 1e-10);
        assert!(candle_change(&[]).is_none());
    }

    #[test]
    fn test_consecutive_green_stops_at_break() {
        let s = series(&[
            (100.0, 101.0, 1.0),
            (101.0, 100.0, 1.0), // red breaks the run
            (100.0, 101.0, 1.0),
            (101.0, 102.0, 1.0),
            (102.0, 103.0, 1.0),
        ]);
        assert_eq!(consecutive_green(&s, 5), 3);
    }

    #[test]
    fn test_consecutive_green_capped() {
        let bars: Vec<_> = (0..10).map(|i| (i as f64, i as f64 + 1.0, 1.0)).collect();
        assert_eq!(consecutive_green(&series(&bars), 5), 5);
        assert_eq!(consecutive_green(&[], 5), 0);
    }

    #[test]
    fn test_consecutive_volume_increase() {
        let s = series(&[
            (1.0, 1.0, 50.0),
            (1.0, 1.0, 10.0),
            (1.0, 1.0, 20.0),
            (1.0, 1.0, 30.0),
            (1.0, 1.0, 40.0),
        ]);
        assert_eq!(consecutive_volume_increase(&s, 4), 3);
        assert_eq!(consecutive_volume_increase(&s, 2), 2);
        assert_eq!(consecutive_volume_increase(&s[..1], 4), 0);
    }

    #[test]
    fn test_buying_pressure() {
        let s = series(&[
            (1.0, 2.0, 1.0),
            (2.0, 1.0, 1.0),
            (1.0, 2.0, 1.0),
            (2.0, 3.0, 1.0),
            (3.0, 3.0, 1.0),
        ]);
        assert!((buying_pressure(&s, 5).unwrap() - 0.6).abs() < 1e-10);
        assert!(buying_pressure(&s, 6).is_none());
    }

    #[test]
    fn test_breaks_high() {
        let mut s = flat(21, 1.0);
        assert_eq!(breaks_high(&s, 20), Some(false));
        s[20].close = 101.0;
        assert_eq!(breaks_high(&s, 20), Some(true));
        assert!(breaks_high(&s[..20], 20).is_none());
    }

    #[test]
    fn test_sma_and_mean() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert!(sma(&[1.0], 2).is_none());
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn test_primitives_never_panic_on_short_series() {
        for n in 0..25 {
            let s = flat(n, 1.0);
            let _ = volume_ratio(&s, 10);
            let _ = volume_acceleration(&s, 3, 10);
            let _ = price_change(&s, 3);
            let _ = candle_change(&s);
            let _ = consecutive_green(&s, 5);
            let _ = consecutive_volume_increase(&s, 4);
            let _ = buying_pressure(&s, 5);
            let _ = breaks_high(&s, 20);
        }
    }
}
