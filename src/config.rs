//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` (every section optional, every field defaulted)
//! and deserializes into strongly-typed structs. Secrets (bot token) are
//! referenced by env-var name in the config and resolved at runtime.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::storage::{history, report, table};
use crate::types::Variant;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub exchange: ExchangeConfig,
    pub surge: VariantConfig,
    pub composite: VariantConfig,
    pub thresholds: ThresholdConfig,
    pub storage: StorageConfig,
    pub alerts: AlertsConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    /// Quote currency whose markets make up the universe.
    pub quote: String,
    /// Pause between cycles in `--watch` mode.
    pub scan_interval_secs: u64,
    /// Offset used for scan timestamps, file names and commit messages.
    pub utc_offset_hours: i32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            quote: "KRW".to_string(),
            scan_interval_secs: 300,
            utc_offset_hours: 9,
        }
    }
}

impl ScannerConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .with_context(|| format!("Invalid UTC offset: {} hours", self.utc_offset_hours))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upbit.com/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Per-variant knobs. Unset fields fall back to the variant's default.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct VariantConfig {
    /// Minimum score for a record to appear in the report.
    pub report_threshold: Option<u8>,
    /// Delay between pairs, throttling request rate.
    pub pair_delay_ms: Option<u64>,
}

/// Thresholds only used for flagged-pair counts in report statistics.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub volume_spike: f64,
    pub price_change: f64,
    pub consecutive: u32,
    pub volume_watch: f64,
    pub volume_strong: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            volume_spike: 1.8,
            price_change: 2.5,
            consecutive: 2,
            volume_watch: 1.3,
            volume_strong: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory all artifact paths are relative to.
    pub root: String,
    pub history_limit: usize,
    pub table_limit: usize,
    pub report_top_n: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            history_limit: history::DEFAULT_LIMIT,
            table_limit: table::DEFAULT_LIMIT,
            report_top_n: report::DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: String,
    pub telegram_chat_id_env: String,
    pub telegram_api_base: String,
    pub timeout_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token_env: "BOT_TOKEN".to_string(),
            telegram_chat_id_env: "CHAT_ID".to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub author_name: String,
    pub author_email: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            author_name: "GitHub Actions Bot".to_string(),
            author_email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn section(&self, variant: Variant) -> &VariantConfig {
        match variant {
            Variant::Surge => &self.surge,
            Variant::Composite => &self.composite,
        }
    }

    /// Minimum score for the report (surge 6, composite 4).
    pub fn report_threshold(&self, variant: Variant) -> u8 {
        self.section(variant)
            .report_threshold
            .unwrap_or(match variant {
                Variant::Surge => 6,
                Variant::Composite => 4,
            })
    }

    /// Pause between pairs (surge 50 ms, composite 100 ms).
    pub fn pair_delay(&self, variant: Variant) -> Duration {
        let ms = self.section(variant).pair_delay_ms.unwrap_or(match variant {
            Variant::Surge => 50,
            Variant::Composite => 100,
        });
        Duration::from_millis(ms)
    }

    /// Apply process environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "SCAN_INTERVAL", &mut self.scanner.scan_interval_secs);
        let t = &mut self.thresholds;
        override_from(&lookup, "VOLUME_SPIKE_THRESHOLD", &mut t.volume_spike);
        override_from(&lookup, "PRICE_CHANGE_THRESHOLD", &mut t.price_change);
        override_from(&lookup, "CONSECUTIVE_THRESHOLD", &mut t.consecutive);
        override_from(&lookup, "VOLUME_THRESHOLD_WATCH", &mut t.volume_watch);
        override_from(&lookup, "VOLUME_THRESHOLD_STRONG", &mut t.volume_strong);
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

fn override_from<F, T>(lookup: &F, name: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!(var = name, value = %raw, "Ignoring unparseable environment override"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
