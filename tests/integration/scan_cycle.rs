//! Full cycles: collect, score, persist and report.

use chrono::{DateTime, FixedOffset, TimeZone};
use std::path::Path;

use tickwatch::alerts::telegram::TelegramNotifier;
use tickwatch::alerts::NotifyOutcome;
use tickwatch::config::AppConfig;
use tickwatch::engine::aggregator::SnapshotAggregator;
use tickwatch::engine::cycle::{CycleRunner, StepStatus};
use tickwatch::storage::table::{Table, TableSchema};
use tickwatch::storage::{history, ArtifactPaths};
use tickwatch::types::{AlertLevel, Interval, Variant};

use crate::mock_exchange::{flat, spike, MockExchange};

fn scan_time(minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 6, 1, 14, minute, 0)
        .unwrap()
}

fn config(root: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.root = root.to_string_lossy().into_owned();
    cfg.surge.report_threshold = Some(0);
    cfg.composite.report_threshold = Some(0);
    cfg.surge.pair_delay_ms = Some(0);
    cfg.composite.pair_delay_ms = Some(0);
    cfg
}

fn runner(exchange: MockExchange, cfg: AppConfig) -> CycleRunner {
    let aggregator = SnapshotAggregator::new(Box::new(exchange), &cfg);
    let notifier = TelegramNotifier::from_config(&cfg.alerts, |_| None).unwrap();
    CycleRunner::new(aggregator, cfg, notifier, None).unwrap()
}

fn three_pairs() -> MockExchange {
    MockExchange::new()
        .with_pair("KRW-AAA", spike(50))
        .with_pair("KRW-BBB", flat(10))
        .with_pair("KRW-CCC", flat(50))
}

#[tokio::test]
async fn test_surge_cycle_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), Variant::Surge);
    let r = runner(three_pairs(), config(dir.path()));

    let report = r.run_cycle_at(Variant::Surge, scan_time(0)).await.unwrap();

    assert_eq!(report.pairs_scanned, 3);
    assert_eq!(report.records, 2);
    assert_eq!(report.signals, 2);
    assert_eq!(report.early_or_critical, 1);
    assert_eq!(report.outcomes.history, StepStatus::Done);
    assert_eq!(report.outcomes.table, StepStatus::Done);
    assert_eq!(report.outcomes.report, StepStatus::Done);
    assert_eq!(report.outcomes.publish, None);
    assert_eq!(report.outcomes.notify, NotifyOutcome::Skipped);

    // History holds one scan with both records, A first.
    let log = history::load(&paths.history_file).unwrap();
    assert_eq!(log.len(), 1);
    let data = log[0]["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["pair"], "KRW-AAA");
    assert_eq!(data[0]["score"], 7);
    assert_eq!(data[0]["alert_level"], "CRITICAL");
    assert_eq!(data[1]["pair"], "KRW-CCC");

    // Table carries one row per record, pair without the quote prefix.
    let table = Table::open_or_init(&paths.workbook, TableSchema::for_variant(Variant::Surge)).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0][1].as_text(), Some("AAA"));
    assert_eq!(table.rows()[0][3].as_text(), Some("7/10"));

    // Report lists A before C.
    let path = report.report_path.unwrap();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "buy_report_20260601_1400.md"
    );
    let body = std::fs::read_to_string(&path).unwrap();
    let a = body.find("### AAA (score 7/10, CRITICAL)").unwrap();
    let c = body.find("### CCC").unwrap();
    assert!(a < c);
    assert!(!body.contains("### BBB"));
}

#[tokio::test]
async fn test_repeated_cycles_accumulate_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), Variant::Surge);
    let r = runner(three_pairs(), config(dir.path()));

    let first = r.run_cycle_at(Variant::Surge, scan_time(5)).await.unwrap();
    let second = r.run_cycle_at(Variant::Surge, scan_time(5)).await.unwrap();

    let first = first.report_path.unwrap();
    let second = second.report_path.unwrap();
    assert_ne!(first, second);
    assert_eq!(
        second.file_name().unwrap().to_string_lossy(),
        "buy_report_20260601_1405_2.md"
    );

    assert_eq!(history::load(&paths.history_file).unwrap().len(), 2);
    let table = Table::open_or_init(&paths.workbook, TableSchema::for_variant(Variant::Surge)).unwrap();
    assert_eq!(table.len(), 4);
}

#[tokio::test]
async fn test_bounded_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), Variant::Surge);
    let mut cfg = config(dir.path());
    cfg.storage.history_limit = 2;
    cfg.storage.table_limit = 3;
    let r = runner(three_pairs(), cfg);

    for minute in 0..4 {
        r.run_cycle_at(Variant::Surge, scan_time(minute)).await.unwrap();
    }

    let log = history::load(&paths.history_file).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1]["scan_time"], scan_time(3).to_rfc3339());

    let table = Table::open_or_init(&paths.workbook, TableSchema::for_variant(Variant::Surge)).unwrap();
    assert_eq!(table.len(), 3);
}

#[tokio::test]
async fn test_composite_cycle_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path(), Variant::Composite);
    let exchange = three_pairs()
        .with_book("KRW-AAA", 300.0, 100.0)
        .with_dead_pair("KRW-DDD")
        .with_dead_pair("BTC-ETH");
    let calls = exchange.call_log();
    let r = runner(exchange, config(dir.path()));

    let report = r.run_cycle_at(Variant::Composite, scan_time(30)).await.unwrap();

    assert_eq!(report.pairs_scanned, 4);
    assert_eq!(report.records, 2);
    assert_eq!(report.early_or_critical, 1);

    let log = history::load(&paths.history_file).unwrap();
    let data = log[0]["data"].as_array().unwrap();
    assert_eq!(data[0]["pair"], "KRW-AAA");
    assert_eq!(data[0]["alert_level"], AlertLevel::Early.as_str());
    assert_eq!(data[0]["max_score"], 14);
    let score = data[0]["score"].as_u64().unwrap();
    assert!((6..=14).contains(&score));

    // Every analysed pair is read on all three intervals.
    let calls = calls.lock().unwrap();
    for interval in [Interval::Minute5, Interval::Minute15, Interval::Day] {
        assert!(calls.iter().any(|(p, i)| p == "KRW-AAA" && *i == interval));
    }
    assert!(!calls.iter().any(|(p, _)| p == "BTC-ETH"));

    let table =
        Table::open_or_init(&paths.workbook, TableSchema::for_variant(Variant::Composite)).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0][3].as_text(), Some(format!("{score}/14").as_str()));

    let path = report.report_path.unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("realtime_report_20260601_1430"));
    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("# Realtime Monitor Report"));
    assert!(body.find("### AAA").unwrap() < body.find("### CCC").unwrap());
}
