//! Composite monitor metrics: short-term (5m/15m) volume and momentum,
//! daily volume structure, and daily technical indicators.

use serde::{Deserialize, Serialize};

use super::bollinger::bollinger;
use super::macd::macd;
use super::orderbook::OrderBookMetrics;
use super::rsi::rsi;
use super::{
    buying_pressure, closes, consecutive_volume_increase, price_change, sma,
    volume_mean_acceleration, volume_ratio, volumes,
};
use crate::types::Candle;

/// 5m and 15m candles requested per pair.
pub const SHORT_FETCH_COUNT: u32 = 100;
/// Daily candles requested per pair (feeds both daily bundles).
pub const DAILY_FETCH_COUNT: u32 = 100;

pub const MIN_SHORT_CANDLES: usize = 20;
pub const MIN_DAILY_CANDLES: usize = 20;
/// Below this the technical bundle is absent; the pair is still scored.
pub const MIN_TECHNICAL_CANDLES: usize = 50;

const RSI_PERIOD: usize = 14;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_WINDOW: usize = 20;
const BB_STD: f64 = 2.0;
const VOLUME_SURGE_PERCENT: f64 = 150.0;

// ---------------------------------------------------------------------------
// Short-term
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermMetrics {
    pub volume_5m_ratio: Option<f64>,
    pub volume_15m_ratio: Option<f64>,
    /// Mean of the last three 5m volumes over the mean of the ten before
    /// them.
    pub volume_surge_ratio: Option<f64>,
    /// Change over three 5m candles, percent.
    pub price_change_5m: Option<f64>,
    /// Change over three 15m candles, percent.
    pub price_change_15m: Option<f64>,
    pub consecutive_increase: u32,
    /// Share of the last ten 5m candles that closed green.
    pub bullish_ratio: Option<f64>,
    pub current_price: f64,
}

impl ShortTermMetrics {
    pub fn compute(m5: &[Candle], m15: &[Candle]) -> Option<Self> {
        if m5.len() < MIN_SHORT_CANDLES || m15.len() < MIN_SHORT_CANDLES {
            return None;
        }
        Some(Self {
            volume_5m_ratio: volume_ratio(m5, 10),
            volume_15m_ratio: volume_ratio(m15, 10),
            volume_surge_ratio: volume_mean_acceleration(m5, 3, 10),
            price_change_5m: price_change(m5, 3),
            price_change_15m: price_change(m15, 3),
            consecutive_increase: consecutive_volume_increase(m5, 4),
            bullish_ratio: buying_pressure(m5, 10),
            current_price: m5.last()?.close,
        })
    }
}

// ---------------------------------------------------------------------------
// Daily volume
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVolumeMetrics {
    pub volume_ratio: Option<f64>,
    /// `(MA7 − MA14) / MA14 · 100` of daily volume.
    pub accumulation_index: Option<f64>,
    /// Absolute 7-day price change, percent.
    pub price_change_7d: Option<f64>,
    /// 1-day volume change per unit of absolute 1-day price change.
    pub divergence: Option<f64>,
    pub current_volume: f64,
    pub current_price: f64,
}

impl DailyVolumeMetrics {
    pub fn compute(daily: &[Candle]) -> Option<Self> {
        if daily.len() < MIN_DAILY_CANDLES {
            return None;
        }
        let vols = volumes(daily);
        let last = daily.last()?;

        let accumulation_index = match (sma(&vols, 7), sma(&vols, 14)) {
            (Some(ma7), Some(ma14)) if ma14 > 0.0 => Some((ma7 - ma14) / ma14 * 100.0),
            _ => None,
        };

        let prev_volume = vols[vols.len() - 2];
        let volume_change_1d = if prev_volume > 0.0 {
            Some((last.volume - prev_volume) / prev_volume * 100.0)
        } else {
            None
        };
        let divergence = match (volume_change_1d, price_change(daily, 1).map(f64::abs)) {
            (Some(v), Some(p)) if p > 0.0 => Some(v / p),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        };

        Some(Self {
            volume_ratio: volume_ratio(daily, 20),
            accumulation_index,
            price_change_7d: price_change(daily, 7).map(f64::abs),
            divergence,
            current_volume: last.volume,
            current_price: last.close,
        })
    }
}

// ---------------------------------------------------------------------------
// Technical indicators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdCross {
    Golden,
    Dead,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandTouch {
    Upper,
    Lower,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaTrend {
    /// MA5 above MA20.
    Golden,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub rsi_zone: RsiZone,
    pub macd: MacdCross,
    pub bollinger: BandTouch,
    pub ma_trend: MaTrend,
    /// Current daily volume as a percentage of the 20-day mean before it.
    pub volume_percent: Option<f64>,
    pub volume_surge: bool,
    pub current_price: f64,
}

impl TechnicalIndicators {
    /// `None` below [`MIN_TECHNICAL_CANDLES`] daily candles.
    pub fn compute(daily: &[Candle]) -> Option<Self> {
        if daily.len() < MIN_TECHNICAL_CANDLES {
            return None;
        }
        let closes = closes(daily);
        let price = *closes.last()?;

        let rsi = rsi(&closes, RSI_PERIOD)?;
        let rsi_zone = if rsi < RSI_OVERSOLD {
            RsiZone::Oversold
        } else if rsi > RSI_OVERBOUGHT {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        };

        let m = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)?;
        let macd = if m.line > m.signal && m.histogram > 0.0 {
            MacdCross::Golden
        } else if m.line < m.signal && m.histogram < 0.0 {
            MacdCross::Dead
        } else {
            MacdCross::Neutral
        };

        let bands = bollinger(&closes, BB_WINDOW, BB_STD)?;
        let bollinger = if price >= bands.upper {
            BandTouch::Upper
        } else if price <= bands.lower {
            BandTouch::Lower
        } else {
            BandTouch::Inside
        };

        let ma_trend = if sma(&closes, 5)? > sma(&closes, 20)? {
            MaTrend::Golden
        } else {
            MaTrend::Dead
        };

        let volume_percent = volume_ratio(daily, 20).map(|r| r * 100.0);

        Some(Self {
            rsi,
            rsi_zone,
            macd,
            bollinger,
            ma_trend,
            volume_percent,
            volume_surge: volume_percent.is_some_and(|p| p > VOLUME_SURGE_PERCENT),
            current_price: price,
        })
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Everything the composite scorer looks at for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetrics {
    pub short_term: ShortTermMetrics,
    pub daily: DailyVolumeMetrics,
    pub orderbook: Option<OrderBookMetrics>,
    pub technicals: Option<TechnicalIndicators>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
