//! TICKWATCH: exchange-wide crypto volume surge scanner.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod indicators;
pub mod scoring;
pub mod exchange;
pub mod engine;
pub mod storage;
pub mod alerts;
pub mod publish;
