//! Daily price/volume/volatility points for a single security.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    /// Point volatility as published by the data source. Not the rolling CVI.
    pub cvi: f64,
}

impl TimeSeriesPoint {
    /// Check the invariants the analytics rely on: positive finite close,
    /// non-negative finite point CVI.
    pub fn validate(&self) -> Result<(), String> {
        if !self.close.is_finite() || self.close <= 0.0 {
            return Err(format!("close must be positive on {}, got {}", self.date, self.close));
        }
        if !self.cvi.is_finite() || self.cvi < 0.0 {
            return Err(format!("cvi must be non-negative on {}, got {}", self.date, self.cvi));
        }
        Ok(())
    }
}

pub fn closes(points: &[TimeSeriesPoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}
