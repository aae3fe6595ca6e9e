//! Upbit quotation API client.
//!
//! Public endpoints only; no authentication.
//!
//! API docs: https://docs.upbit.com/reference
//! Base URL: https://api.upbit.com/v1
//! Candle endpoints return newest first and cap `count` at 200.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::MarketDataSource;
use crate::config::ExchangeConfig;
use crate::types::{Candle, Interval, OrderBook, OrderBookLevel};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SOURCE_NAME: &str = "upbit";
const USER_AGENT: &str = "TICKWATCH/0.1.0 (market-scanner)";
const MAX_CANDLES_PER_REQUEST: u32 = 200;
const CANDLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// API response types (Upbit JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UpbitMarket {
    market: String,
}

#[derive(Debug, Deserialize)]
struct UpbitCandle {
    /// `2026-01-01T00:00:00`, UTC without an offset.
    candle_date_time_utc: String,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    #[serde(default)]
    candle_acc_trade_volume: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitOrderBook {
    market: String,
    #[serde(default)]
    orderbook_units: Vec<UpbitOrderBookUnit>,
}

#[derive(Debug, Deserialize)]
struct UpbitOrderBookUnit {
    #[serde(default)]
    ask_price: f64,
    #[serde(default)]
    bid_price: f64,
    #[serde(default)]
    ask_size: f64,
    #[serde(default)]
    bid_size: f64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Upbit market-data client.
pub struct UpbitClient {
    http: Client,
    base_url: String,
}

impl UpbitClient {
    pub fn new(cfg: &ExchangeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for Upbit")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    // -- Internal helpers ------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        debug!(url = %url, "Fetching Upbit {what}");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Upbit {what} request failed"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Upbit API error {status}: {body}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse Upbit {what} response"))
    }

    fn candles_url(&self, pair: &str, interval: Interval, count: u32) -> String {
        let path = match interval {
            Interval::Minute5 => "candles/minutes/5",
            Interval::Minute15 => "candles/minutes/15",
            Interval::Day => "candles/days",
        };
        format!(
            "{}/{path}?market={}&count={}",
            self.base_url,
            urlencoding::encode(pair),
            count.min(MAX_CANDLES_PER_REQUEST),
        )
    }

    /// Newest-first API candles to an oldest-first series.
    fn to_series(raw: Vec<UpbitCandle>) -> Result<Vec<Candle>> {
        let mut series = raw
            .into_iter()
            .map(|c| {
                let time = NaiveDateTime::parse_from_str(&c.candle_date_time_utc, CANDLE_TIME_FORMAT)
                    .with_context(|| format!("Bad candle timestamp: {}", c.candle_date_time_utc))?
                    .and_utc();
                Ok(Candle {
                    time,
                    open: c.opening_price,
                    high: c.high_price,
                    low: c.low_price,
                    close: c.trade_price,
                    volume: c.candle_acc_trade_volume,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        series.sort_by_key(|c| c.time);
        Ok(series)
    }

    fn to_order_book(raw: UpbitOrderBook) -> OrderBook {
        OrderBook {
            pair: raw.market,
            levels: raw
                .orderbook_units
                .into_iter()
                .map(|u| OrderBookLevel {
                    bid_price: u.bid_price,
                    bid_size: u.bid_size,
                    ask_price: u.ask_price,
                    ask_size: u.ask_size,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// MarketDataSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketDataSource for UpbitClient {
    async fn list_pairs(&self, quote: &str) -> Result<Vec<String>> {
        let url = format!("{}/market/all?isDetails=false", self.base_url);
        let markets: Vec<UpbitMarket> = self.get_json(&url, "market list").await?;
        let prefix = format!("{quote}-");
        Ok(markets
            .into_iter()
            .map(|m| m.market)
            .filter(|m| m.starts_with(&prefix))
            .collect())
    }

    async fn get_candles(&self, pair: &str, interval: Interval, count: u32) -> Result<Vec<Candle>> {
        let url = self.candles_url(pair, interval, count);
        let raw: Vec<UpbitCandle> = self.get_json(&url, "candles").await?;
        Self::to_series(raw).with_context(|| format!("Malformed {interval} candles for {pair}"))
    }

    async fn get_order_book(&self, pair: &str) -> Result<OrderBook> {
        let url = format!(
            "{}/orderbook?markets={}",
            self.base_url,
            urlencoding::encode(pair)
        );
        let books: Vec<UpbitOrderBook> = self.get_json(&url, "order book").await?;
        books
            .into_iter()
            .find(|b| b.market == pair)
            .map(Self::to_order_book)
            .with_context(|| format!("No order book returned for {pair}"))
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> UpbitClient {
        UpbitClient::new(&ExchangeConfig::default()).unwrap()
    }

    #[test]
    fn test_candles_url() {
        let c = client();
        assert_eq!(
            c.candles_url("KRW-BTC", Interval::Minute5, 50),
            "https://api.upbit.com/v1/candles/minutes/5?market=KRW-BTC&count=50"
        );
        assert_eq!(
            c.candles_url("KRW-BTC", Interval::Minute15, 100),
            "https://api.upbit.com/v1/candles/minutes/15?market=KRW-BTC&count=100"
        );
        assert_eq!(
            c.candles_url("KRW-ETH", Interval::Day, 500),
            "https://api.upbit.com/v1/candles/days?market=KRW-ETH&count=200"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let c = UpbitClient::new(&ExchangeConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(c.base_url, "http://localhost:9000/v1");
        assert_eq!(c.name(), "upbit");
    }

    #[test]
    fn test_parse_candles_newest_first() {
        let body = r#"[
            {"market":"KRW-BTC","candle_date_time_utc":"2026-01-01T00:10:00","candle_date_time_kst":"2026-01-01T09:10:00",
             "opening_price":101.0,"high_price":103.0,"low_price":100.0,"trade_price":102.0,
             "timestamp":0,"candle_acc_trade_price":0.0,"candle_acc_trade_volume":7.5,"unit":5},
            {"market":"KRW-BTC","candle_date_time_utc":"2026-01-01T00:05:00",
             "opening_price":100.0,"high_price":101.5,"low_price":99.0,"trade_price":101.0,
             "candle_acc_trade_volume":3.0}
        ]"#;
        let raw: Vec<UpbitCandle> = serde_json::from_str(body).unwrap();
        let series = UpbitClient::to_series(raw).unwrap();

        assert_eq!(series.len(), 2);
        assert!(series[0].time < series[1].time);
        assert_eq!(series[0].close, 101.0);
        assert_eq!(series[1].close, 102.0);
        assert_eq!(series[1].volume, 7.5);
    }

    #[test]
    fn test_parse_candles_bad_timestamp() {
        let raw = vec![UpbitCandle {
            candle_date_time_utc: "yesterday".to_string(),
            opening_price: 1.0,
            high_price: 1.0,
            low_price: 1.0,
            trade_price: 1.0,
            candle_acc_trade_volume: 1.0,
        }];
        assert!(UpbitClient::to_series(raw).is_err());
    }

    #[test]
    fn test_parse_order_book() {
        let body = r#"[{"market":"KRW-BTC","timestamp":0,"total_ask_size":3.0,"total_bid_size":5.0,
            "orderbook_units":[
              {"ask_price":101.0,"bid_price":100.0,"ask_size":1.0,"bid_size":2.0},
              {"ask_price":102.0,"bid_price":99.0,"ask_size":2.0,"bid_size":3.0}
            ]}]"#;
        let books: Vec<UpbitOrderBook> = serde_json::from_str(body).unwrap();
        let book = UpbitClient::to_order_book(books.into_iter().next().unwrap());
        assert_eq!(book.pair, "KRW-BTC");
        assert_eq!(book.levels.len(), 2);
        assert_eq!(book.levels[0].bid_price, 100.0);
        assert_eq!(book.levels[1].ask_size, 2.0);
    }

    #[test]
    fn test_parse_market_list() {
        let body = r#"[{"market":"KRW-BTC","korean_name":"비트코인","english_name":"Bitcoin"},
                       {"market":"BTC-ETH","korean_name":"이더리움","english_name":"Ethereum"}]"#;
        let markets: Vec<UpbitMarket> = serde_json::from_str(body).unwrap();
        let krw: Vec<_> = markets
            .into_iter()
            .map(|m| m.market)
            .filter(|m| m.starts_with("KRW-"))
            .collect();
        assert_eq!(krw, vec!["KRW-BTC"]);
    }
}
