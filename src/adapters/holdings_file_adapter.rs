//! Holdings persisted as a two-column CSV file: `symbol,allocation`.
//!
//! A missing file is an empty portfolio. An empty allocation cell means the
//! user has not entered a value yet.

use crate::domain::error::RiskboardError;
use crate::domain::portfolio::Portfolio;
use crate::ports::holdings_store::HoldingsStore;
use log::debug;
use std::path::PathBuf;

pub struct CsvHoldingsStore {
    path: PathBuf,
}

impl CsvHoldingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn invalid(&self, reason: String) -> RiskboardError {
        RiskboardError::invalid(format!("{}: {}", self.path.display(), reason))
    }
}

impl HoldingsStore for CsvHoldingsStore {
    fn load(&self) -> Result<Portfolio, RiskboardError> {
        if !self.path.exists() {
            debug!("no holdings file at {}, starting empty", self.path.display());
            return Ok(Portfolio::new());
        }

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.invalid(e.to_string()))?;
        let mut portfolio = Portfolio::new();

        for result in rdr.records() {
            let record = result.map_err(|e| self.invalid(format!("CSV parse error: {}", e)))?;
            let symbol = record.get(0).map(str::trim).unwrap_or_default();
            if symbol.is_empty() {
                continue;
            }

            let allocation = match record.get(1).map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(raw.parse::<f64>().map_err(|e| {
                    self.invalid(format!("invalid allocation {:?} for {}: {}", raw, symbol, e))
                })?),
            };
            portfolio.add_holding(symbol, allocation)?;
        }

        debug!(
            "loaded {} holdings from {}",
            portfolio.holdings().len(),
            self.path.display()
        );
        Ok(portfolio)
    }

    fn save(&self, portfolio: &Portfolio) -> Result<(), RiskboardError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(&self.path).map_err(|e| self.invalid(e.to_string()))?;
        wtr.write_record(["symbol", "allocation"])
            .map_err(|e| self.invalid(e.to_string()))?;
        for holding in portfolio.holdings() {
            let allocation = holding
                .allocation_percent
                .map(|a| a.to_string())
                .unwrap_or_default();
            wtr.write_record([holding.symbol.as_str(), allocation.as_str()])
                .map_err(|e| self.invalid(e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
