//! TICKWATCH: exchange-wide crypto volume surge scanner.
//!
//! Entry point. Parses the command line, loads configuration, initialises
//! structured logging and runs one scan cycle per requested variant, either
//! once (scheduled-job mode) or repeatedly until Ctrl+C (`--watch`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info};

use tickwatch::alerts::telegram::TelegramNotifier;
use tickwatch::config::{self, AppConfig};
use tickwatch::engine::aggregator::SnapshotAggregator;
use tickwatch::engine::cycle::{log_cycle_report, CycleRunner};
use tickwatch::exchange::upbit::UpbitClient;
use tickwatch::publish::Publisher;
use tickwatch::types::Variant;

const VERSION: &str = "0.1.0";

const BANNER: &str = r#"
 _____ ___ ____ _  ____        ___  _____ ____ _   _
|_   _|_ _/ ___| |/ /\ \      / / \|_   _/ ___| | | |
  | |  | | |   | ' /  \ \ /\ / / _ \ | || |   | |_| |
  | |  | | |___| . \   \ V  V / ___ \| || |___|  _  |
  |_| |___\____|_|\_\   \_/\_/_/   \_\_| \____|_| |_|

  Exchange-wide volume surge scanner
  v0.1.0
"#;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "tickwatch",
    version = VERSION,
    about = "Scan every KRW pair, score surges and publish the results",
    propagate_version = true,
)]
struct Cli {
    /// Path to the TOML config (missing file means defaults)
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    /// Repeat every `scanner.scan_interval_secs` until Ctrl+C
    #[arg(long, global = true, default_value_t = false)]
    watch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 5-minute surge scan (score out of 10)
    Surge,
    /// Multi-timeframe composite scan (score out of 14)
    Composite,
    /// Surge then composite
    All,
}

impl Commands {
    fn variants(&self) -> &'static [Variant] {
        match self {
            Commands::Surge => &[Variant::Surge],
            Commands::Composite => &[Variant::Composite],
            Commands::All => Variant::ALL,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();
    println!("{BANNER}");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "TICKWATCH failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = config::AppConfig::load(&cli.config)?;
    cfg.apply_env();

    info!(
        quote = %cfg.scanner.quote,
        scan_interval_secs = cfg.scanner.scan_interval_secs,
        storage_root = %cfg.storage.root,
        publish = cfg.publish.enabled,
        watch = cli.watch,
        "TICKWATCH starting up"
    );

    // -- Initialise components -------------------------------------------

    let exchange = UpbitClient::new(&cfg.exchange)?;
    let aggregator = SnapshotAggregator::new(Box::new(exchange), &cfg);
    let notifier =
        TelegramNotifier::from_config(&cfg.alerts, |name| AppConfig::resolve_env(name).ok())?;
    let publisher = Publisher::new(&cfg.publish, &cfg.storage.root);
    let scan_interval_secs = cfg.scanner.scan_interval_secs.max(1);
    let runner = CycleRunner::new(aggregator, cfg, notifier, Some(publisher))?;
    let variants = cli.command.variants();

    if !cli.watch {
        return run_variants(&runner, variants).await;
    }

    // -- Watch loop ------------------------------------------------------

    let mut interval = watch_interval(scan_interval_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = scan_interval_secs,
        "Entering watch loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_variants(&runner, variants).await {
                    error!(error = %format!("{e:#}"), "Cycle failed, continuing to next");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("TICKWATCH shut down cleanly.");
    Ok(())
}

/// Ticks every `secs`. A cycle that overruns pushes the next tick back
/// instead of firing the missed ones back to back.
fn watch_interval(secs: u64) -> Interval {
    let mut interval = tokio::time::interval(Duration::from_secs(secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run each variant in turn. A failed variant does not stop the next one.
async fn run_variants(runner: &CycleRunner, variants: &[Variant]) -> Result<()> {
    let mut failed = 0usize;
    for &variant in variants {
        match runner.run_cycle(variant).await {
            Ok(report) => log_cycle_report(&report),
            Err(e) => {
                error!(variant = %variant, error = %format!("{e:#}"), "Cycle failed");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} cycle(s) failed", variants.len());
    }
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tickwatch=info"));

    let json_logging = std::env::var("TICKWATCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
