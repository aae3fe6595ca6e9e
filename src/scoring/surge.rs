//! Surge rubric, scored 0–10 with `NORMAL < HIGH < CRITICAL`.

use super::{Bound, ScoreCard, Tier};
use crate::indicators::surge::SurgeMetrics;
use crate::types::{AlertLevel, Variant};

const VOLUME_RATIO: &[Tier] = &[
    Tier::new(Bound::AtLeast(3.0), 3, "🔥🔥 Volume 3x explosion").raising(AlertLevel::Critical),
    Tier::new(Bound::AtLeast(2.0), 2, "🔥 Volume 2x surge").raising(AlertLevel::High),
    Tier::new(Bound::AtLeast(1.5), 1, "⚡ Volume 1.5x rise"),
];

const PRICE_CHANGE_5M: &[Tier] = &[
    Tier::new(Bound::AtLeast(5.0), 3, "🚀🚀 +5% in 5m").raising(AlertLevel::Critical),
    Tier::new(Bound::AtLeast(3.0), 2, "🚀 +3% in 5m").raising(AlertLevel::High),
    Tier::new(Bound::AtLeast(2.0), 1, "📈 +2% in 5m"),
];

const CONSECUTIVE_GREEN: &[Tier] = &[
    Tier::new(Bound::AtLeast(4.0), 2, "✅ 4 green candles in a row"),
    Tier::new(Bound::AtLeast(3.0), 1, "✅ 3 green candles in a row"),
];

const VOLUME_ACCELERATION: &[Tier] = &[Tier::new(Bound::AtLeast(2.0), 1, "⚡ Volume accelerating")];

const BUYING_PRESSURE: &[Tier] = &[Tier::new(Bound::AtLeast(0.8), 1, "💪 Strong buying pressure")];

const ORDERBOOK_RATIO: &[Tier] = &[Tier::new(Bound::AtLeast(1.8), 1, "💰 Bid wall in order book")];

pub fn evaluate(m: &SurgeMetrics) -> ScoreCard {
    let mut card = ScoreCard::new(Variant::Surge.max_score());

    card.apply_tiers(m.volume_ratio, VOLUME_RATIO);
    card.apply_tiers(m.price_change_5m, PRICE_CHANGE_5M);
    card.apply_tiers(Some(f64::from(m.consecutive_green)), CONSECUTIVE_GREEN);
    card.apply_tiers(m.volume_acceleration, VOLUME_ACCELERATION);
    card.apply_tiers(m.buying_pressure, BUYING_PRESSURE);
    card.apply_flag(m.breaking_high, 1, "🎯 20-candle high breakout");
    card.apply_tiers(m.orderbook.map(|ob| ob.bid_ask_ratio), ORDERBOOK_RATIO);

    card.finish()
}
