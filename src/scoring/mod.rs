//! Signal scorer.
//!
//! Each rule is an ordered list of [`Tier`]s; the first tier whose bound
//! admits the value fires and later tiers are ignored. Rules add up, the
//! alert level only ever rises, and the final score is clamped to the
//! variant maximum.

pub mod composite;
pub mod surge;

use serde::{Deserialize, Serialize};

use crate::types::AlertLevel;

// ---------------------------------------------------------------------------
// Rule tiers
// ---------------------------------------------------------------------------

/// Comparison a tier applies to its input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    AtLeast(f64),
    Above(f64),
    Below(f64),
}

impl Bound {
    pub fn admits(&self, value: f64) -> bool {
        match *self {
            Bound::AtLeast(t) => value >= t,
            Bound::Above(t) => value > t,
            Bound::Below(t) => value < t,
        }
    }
}

/// One row of a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub bound: Bound,
    pub points: u8,
    pub tag: &'static str,
    /// Alert level raised when this tier fires.
    pub alert: Option<AlertLevel>,
}

impl Tier {
    pub const fn new(bound: Bound, points: u8, tag: &'static str) -> Self {
        Self {
            bound,
            points,
            tag,
            alert: None,
        }
    }

    pub const fn raising(mut self, level: AlertLevel) -> Self {
        self.alert = Some(level);
        self
    }
}

// ---------------------------------------------------------------------------
// Score card
// ---------------------------------------------------------------------------

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: u8,
    pub max: u8,
    pub alert: AlertLevel,
    pub signals: Vec<String>,
}

impl ScoreCard {
    pub fn new(max: u8) -> Self {
        Self {
            score: 0,
            max,
            alert: AlertLevel::Normal,
            signals: Vec::new(),
        }
    }

    /// Fire the first admitting tier. An absent value contributes nothing.
    pub fn apply_tiers(&mut self, value: Option<f64>, tiers: &[Tier]) {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return;
        };
        if let Some(tier) = tiers.iter().find(|t| t.bound.admits(v)) {
            self.fire(tier.points, tier.tag, tier.alert);
        }
    }

    /// Boolean rule.
    pub fn apply_flag(&mut self, fired: bool, points: u8, tag: &str) {
        if fired {
            self.fire(points, tag, None);
        }
    }

    fn fire(&mut self, points: u8, tag: &str, alert: Option<AlertLevel>) {
        self.score = self.score.saturating_add(points);
        self.signals.push(tag.to_string());
        if let Some(level) = alert {
            self.alert = self.alert.max(level);
        }
    }

    /// Clamp to the maximum.
    pub fn finish(mut self) -> Self {
        self.score = self.score.min(self.max);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
