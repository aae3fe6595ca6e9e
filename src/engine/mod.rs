//! Scan engine: batch collection and the per-variant cycle.

pub mod aggregator;
pub mod cycle;
