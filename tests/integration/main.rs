//! End-to-end scan cycles against a deterministic in-memory exchange.

mod mock_exchange;
mod scan_cycle;
