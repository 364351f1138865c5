//! Security summary records as delivered by the data source for one refresh cycle.

use std::fmt;

/// Market-regime indicator published alongside each security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Thermostat {
    Bullish,
    Neutral,
    Bearish,
    Unknown,
}

impl Thermostat {
    /// Source codes: 1 bullish, 2 neutral, 4 bearish. Anything else is unknown.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Thermostat::Bullish,
            2 => Thermostat::Neutral,
            4 => Thermostat::Bearish,
            _ => Thermostat::Unknown,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Thermostat::Bullish => Some(1),
            Thermostat::Neutral => Some(2),
            Thermostat::Bearish => Some(4),
            Thermostat::Unknown => None,
        }
    }
}

impl fmt::Display for Thermostat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Thermostat::Bullish => "bullish",
            Thermostat::Neutral => "neutral",
            Thermostat::Bearish => "bearish",
            Thermostat::Unknown => "unknown",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityRecord {
    pub symbol: String,
    pub name: String,
    pub category: String,
    pub close_price: f64,
    pub volume: u64,
    pub cvi: f64,
    pub sec_state: i64,
    pub thermostat: Thermostat,
    /// Current-period momentum score (VWRS).
    pub score: Option<f64>,
    /// Same score one week earlier (VWRS_1wk).
    pub prior_score: Option<f64>,
}

impl SecurityRecord {
    /// True when both scores are present and finite, i.e. the record can be ranked.
    pub fn is_rankable(&self) -> bool {
        matches!(self.score, Some(s) if s.is_finite())
            && matches!(self.prior_score, Some(s) if s.is_finite())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".into());
        }
        if !self.close_price.is_finite() || self.close_price < 0.0 {
            return Err(format!(
                "{}: close must be non-negative, got {}",
                self.symbol, self.close_price
            ));
        }
        if !self.cvi.is_finite() || self.cvi < 0.0 {
            return Err(format!(
                "{}: cvi must be non-negative, got {}",
                self.symbol, self.cvi
            ));
        }
        Ok(())
    }
}
