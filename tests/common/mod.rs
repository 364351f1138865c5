#![allow(dead_code)]

use chrono::NaiveDate;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use riskboard::domain::error::RiskboardError;
use riskboard::domain::security::{SecurityRecord, Thermostat};
pub use riskboard::domain::time_series::TimeSeriesPoint;
use riskboard::ports::market_data_port::MarketDataPort;
use std::collections::HashMap;

pub struct MockMarketData {
    pub summaries: Vec<SecurityRecord>,
    pub histories: HashMap<String, Vec<TimeSeriesPoint>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            summaries: Vec::new(),
            histories: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_record(mut self, record: SecurityRecord) -> Self {
        self.summaries.push(record);
        self
    }

    pub fn with_history(mut self, symbol: &str, points: Vec<TimeSeriesPoint>) -> Self {
        self.histories.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_summaries(&self) -> Result<Vec<SecurityRecord>, RiskboardError> {
        Ok(self.summaries.clone())
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<TimeSeriesPoint>, RiskboardError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RiskboardError::FetchFailure {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.histories.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_record(symbol: &str, score: Option<f64>, prior_score: Option<f64>, cvi: f64) -> SecurityRecord {
    SecurityRecord {
        symbol: symbol.to_string(),
        name: format!("{} Fund", symbol),
        category: "Equity".to_string(),
        close_price: 100.0,
        volume: 1000,
        cvi,
        sec_state: 0,
        thermostat: Thermostat::Neutral,
        score,
        prior_score,
    }
}

/// One point per calendar day starting 2023-01-02.
pub fn history_from(closes: &[f64], cvi: f64) -> Vec<TimeSeriesPoint> {
    let start = date(2023, 1, 2);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| TimeSeriesPoint {
            date: start + chrono::Duration::days(i as i64),
            close,
            volume: 1000,
            cvi,
        })
        .collect()
}

pub fn flat_history(days: usize, close: f64, cvi: f64) -> Vec<TimeSeriesPoint> {
    history_from(&vec![close; days], cvi)
}

/// Price path from `start` with daily moves of 0.1% to 2% in either direction.
pub fn price_path(start: f64, days: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((any::<bool>(), 0.001f64..0.02), days).prop_map(move |steps| {
        let mut price = start;
        steps
            .into_iter()
            .map(|(up, step)| {
                price *= if up { 1.0 + step } else { 1.0 - step };
                price
            })
            .collect()
    })
}

/// One `price_path` drawn from a fixed seed, for scenario tests.
pub fn wiggly_closes(days: usize, start: f64, seed: u64) -> Vec<f64> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..8].copy_from_slice(&seed.to_le_bytes());
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &seed_bytes);
    let mut runner = TestRunner::new_with_rng(Config::default(), rng);
    price_path(start, days)
        .new_tree(&mut runner)
        .unwrap()
        .current()
}
