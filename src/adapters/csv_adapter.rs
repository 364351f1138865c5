//! CSV file market data adapter.
//!
//! Layout under the base directory:
//! - `summary.csv`: symbol,name,category,close,volume,cvi,sec_state,thermostat,vwrs,vwrs_1wk
//! - `history/<SYMBOL>.csv`: date,close,volume,cvi

use crate::domain::error::RiskboardError;
use crate::domain::security::{SecurityRecord, Thermostat};
use crate::domain::time_series::TimeSeriesPoint;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvMarketData {
    base_path: PathBuf,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn summary_path(&self) -> PathBuf {
        self.base_path.join("summary.csv")
    }

    fn history_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join("history").join(format!("{}.csv", symbol))
    }
}

/// Field access with file/line context for error messages.
struct Row<'a> {
    path: &'a Path,
    line: u64,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn invalid(&self, reason: String) -> RiskboardError {
        RiskboardError::invalid(format!(
            "{} line {}: {}",
            self.path.display(),
            self.line,
            reason
        ))
    }

    fn text(&self, idx: usize, name: &str) -> Result<&str, RiskboardError> {
        self.record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| self.invalid(format!("missing {} column", name)))
    }

    fn float(&self, idx: usize, name: &str) -> Result<f64, RiskboardError> {
        let raw = self.text(idx, name)?;
        let value: f64 = raw
            .parse()
            .map_err(|e| self.invalid(format!("invalid {} value {:?}: {}", name, raw, e)))?;
        if !value.is_finite() {
            return Err(self.invalid(format!("{} must be finite, got {}", name, raw)));
        }
        Ok(value)
    }

    fn unsigned(&self, idx: usize, name: &str) -> Result<u64, RiskboardError> {
        let raw = self.text(idx, name)?;
        raw.parse()
            .map_err(|e| self.invalid(format!("invalid {} value {:?}: {}", name, raw, e)))
    }

    fn int(&self, idx: usize, name: &str) -> Result<i64, RiskboardError> {
        let raw = self.text(idx, name)?;
        raw.parse()
            .map_err(|e| self.invalid(format!("invalid {} value {:?}: {}", name, raw, e)))
    }

    /// Missing, blank or non-numeric scores become `None`.
    fn score(&self, idx: usize) -> Option<f64> {
        self.record
            .get(idx)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    fn thermostat(&self, idx: usize) -> Thermostat {
        self.record
            .get(idx)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(Thermostat::from_code)
            .unwrap_or(Thermostat::Unknown)
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, RiskboardError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| RiskboardError::FetchFailure {
            symbol: path.display().to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_summary_row(row: &Row<'_>) -> Result<SecurityRecord, RiskboardError> {
    let record = SecurityRecord {
        symbol: row.text(0, "symbol")?.to_uppercase(),
        name: row.text(1, "name")?.to_string(),
        category: row.text(2, "category")?.to_string(),
        close_price: row.float(3, "close")?,
        volume: row.unsigned(4, "volume")?,
        cvi: row.float(5, "cvi")?,
        sec_state: row.int(6, "sec_state")?,
        thermostat: row.thermostat(7),
        score: row.score(8),
        prior_score: row.score(9),
    };
    record.validate().map_err(|reason| row.invalid(reason))?;
    Ok(record)
}

fn parse_history_row(row: &Row<'_>) -> Result<TimeSeriesPoint, RiskboardError> {
    let date_str = row.text(0, "date")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| row.invalid(format!("invalid date {:?}: {}", date_str, e)))?;

    let point = TimeSeriesPoint {
        date,
        close: row.float(1, "close")?,
        volume: row.unsigned(2, "volume")?,
        cvi: row.float(3, "cvi")?,
    };
    point.validate().map_err(|reason| row.invalid(reason))?;
    Ok(point)
}

impl MarketDataPort for CsvMarketData {
    fn fetch_summaries(&self) -> Result<Vec<SecurityRecord>, RiskboardError> {
        let path = self.summary_path();
        let mut rdr = open_reader(&path)?;
        let mut records: Vec<SecurityRecord> = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| RiskboardError::invalid(format!("CSV parse error: {}", e)))?;
            let row = Row {
                path: &path,
                line: record_line(&record),
                record: &record,
            };
            let parsed = parse_summary_row(&row)?;
            if records.iter().any(|r| r.symbol == parsed.symbol) {
                return Err(row.invalid(format!("duplicate symbol {}", parsed.symbol)));
            }
            records.push(parsed);
        }

        debug!("loaded {} summaries from {}", records.len(), path.display());
        Ok(records)
    }

    fn fetch_history(&self, symbol: &str) -> Result<Vec<TimeSeriesPoint>, RiskboardError> {
        let path = self.history_path(symbol);
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| RiskboardError::FetchFailure {
                symbol: symbol.to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| RiskboardError::FetchFailure {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;
            let row = Row {
                path: &path,
                line: record_line(&record),
                record: &record,
            };
            points.push(parse_history_row(&row)?);
        }

        points.sort_by_key(|p| p.date);
        if let Some(dup) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(RiskboardError::invalid(format!(
                "{}: duplicate date {}",
                path.display(),
                dup[0].date
            )));
        }
        debug!("loaded {} points for {}", points.len(), symbol);
        Ok(points)
    }
}
