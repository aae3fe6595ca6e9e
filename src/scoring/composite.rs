//! Composite rubric, scored 0–14 with `NORMAL < EARLY`.
//!
//! Short-term rules carry the early-detection tiers; daily volume,
//! order-book and technical rules add one point each.

use super::{Bound, ScoreCard, Tier};
use crate::indicators::composite::{
    BandTouch, CompositeMetrics, DailyVolumeMetrics, MacdCross, MaTrend, ShortTermMetrics,
    TechnicalIndicators,
};
use crate::types::{AlertLevel, Variant};

const ACCUMULATION_INDEX: f64 = 20.0;
const ACCUMULATION_MAX_7D_CHANGE: f64 = 5.0;

const VOLUME_5M: &[Tier] = &[
    Tier::new(Bound::AtLeast(2.0), 2, "🔥 5m volume explosion").raising(AlertLevel::Early),
    Tier::new(Bound::AtLeast(1.5), 1, "⚡ 5m volume rising"),
];

const CONSECUTIVE_INCREASE: &[Tier] =
    &[Tier::new(Bound::AtLeast(3.0), 2, "🔥 Consecutive volume increase").raising(AlertLevel::Early)];

const PRICE_CHANGE_5M: &[Tier] = &[
    Tier::new(Bound::Above(5.0), 2, "🚀 5m surge in progress").raising(AlertLevel::Early),
    Tier::new(Bound::Above(3.0), 1, "📈 5m rising"),
];

const VOLUME_15M: &[Tier] = &[Tier::new(Bound::AtLeast(2.0), 1, "✅ 15m volume breakout")];

const BULLISH_RATIO: &[Tier] = &[Tier::new(Bound::AtLeast(0.7), 1, "✅ Strong buying")];

const DAILY_VOLUME: &[Tier] = &[Tier::new(Bound::AtLeast(2.0), 1, "✅ Daily volume above MA")];

const DIVERGENCE: &[Tier] = &[Tier::new(Bound::Above(10.0), 1, "✅ High volume/price divergence")];

const ORDERBOOK_RATIO: &[Tier] = &[Tier::new(Bound::Above(1.5), 1, "✅ Bid wall dominant")];

const RSI_OVERSOLD: &[Tier] = &[Tier::new(Bound::Below(30.0), 1, "✅ RSI oversold")];

pub fn evaluate(m: &CompositeMetrics) -> ScoreCard {
    let mut card = ScoreCard::new(Variant::Composite.max_score());

    short_term(&mut card, &m.short_term);
    daily(&mut card, &m.daily);
    card.apply_tiers(m.orderbook.map(|ob| ob.bid_ask_ratio), ORDERBOOK_RATIO);
    if let Some(t) = &m.technicals {
        technicals(&mut card, t);
    }

    card.finish()
}

fn short_term(card: &mut ScoreCard, s: &ShortTermMetrics) {
    card.apply_tiers(s.volume_5m_ratio, VOLUME_5M);
    card.apply_tiers(Some(f64::from(s.consecutive_increase)), CONSECUTIVE_INCREASE);
    card.apply_tiers(s.price_change_5m, PRICE_CHANGE_5M);
    card.apply_tiers(s.volume_15m_ratio, VOLUME_15M);
    card.apply_tiers(s.bullish_ratio, BULLISH_RATIO);
}

fn daily(card: &mut ScoreCard, d: &DailyVolumeMetrics) {
    card.apply_tiers(d.volume_ratio, DAILY_VOLUME);

    let accumulating = matches!(
        (d.accumulation_index, d.price_change_7d),
        (Some(idx), Some(chg)) if idx > ACCUMULATION_INDEX && chg < ACCUMULATION_MAX_7D_CHANGE
    );
    card.apply_flag(accumulating, 1, "✅ Accumulation pattern");

    card.apply_tiers(d.divergence, DIVERGENCE);
}

fn technicals(card: &mut ScoreCard, t: &TechnicalIndicators) {
    card.apply_tiers(Some(t.rsi), RSI_OVERSOLD);
    card.apply_flag(t.macd == MacdCross::Golden, 1, "✅ MACD golden cross");
    card.apply_flag(t.bollinger == BandTouch::Lower, 1, "✅ Bollinger lower band");
    card.apply_flag(t.ma_trend == MaTrend::Golden, 1, "✅ MA5 above MA20");
}
