//! Order book analyzer.
//!
//! Depth totals, bid/ask ratios and normalized imbalance from a single
//! order book snapshot.

use serde::{Deserialize, Serialize};

use crate::types::OrderBook;

/// Levels counted as "top of book".
const TOP_LEVELS: usize = 3;

/// Depth statistics for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub total_bid: f64,
    pub total_ask: f64,
    pub top3_bid: f64,
    pub top3_ask: f64,
    /// Size at the best bid level.
    pub top_bid: f64,
    /// Size at the best ask level.
    pub top_ask: f64,
    /// `total_bid / total_ask`, 0 when the ask side is empty.
    pub bid_ask_ratio: f64,
    /// `top3_bid / top3_ask`, 0 when the top ask side is empty.
    pub top3_ratio: f64,
    /// `(bid − ask) / (bid + ask)` in `[-1, 1]`, 0 when both sides are empty.
    pub imbalance: f64,
}

impl OrderBookMetrics {
    pub fn from_book(book: &OrderBook) -> Self {
        let total_bid: f64 = book.levels.iter().map(|l| l.bid_size).sum();
        let total_ask: f64 = book.levels.iter().map(|l| l.ask_size).sum();
        let top3_bid: f64 = book.levels.iter().take(TOP_LEVELS).map(|l| l.bid_size).sum();
        let top3_ask: f64 = book.levels.iter().take(TOP_LEVELS).map(|l| l.ask_size).sum();
        let (top_bid, top_ask) = book
            .levels
            .first()
            .map(|l| (l.bid_size, l.ask_size))
            .unwrap_or((0.0, 0.0));

        Self {
            total_bid,
            total_ask,
            top3_bid,
            top3_ask,
            top_bid,
            top_ask,
            bid_ask_ratio: ratio(total_bid, total_ask),
            top3_ratio: ratio(top3_bid, top3_ask),
            imbalance: imbalance(total_bid, total_ask),
        }
    }
}

fn ratio(bid: f64, ask: f64) -> f64 {
    if ask > 0.0 {
        bid / ask
    } else {
        0.0
    }
}

/// Normalized depth imbalance. Defined as 0 when there is no depth.
pub fn imbalance(bid: f64, ask: f64) -> f64 {
    let total = bid + ask;
    if total > 0.0 {
        ((bid - ask) / total).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
