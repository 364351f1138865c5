//! Configuration validation.
//!
//! Checked once at startup so the commands can read values without
//! re-validating.

use crate::domain::error::RiskboardError;
use crate::domain::volatility::{SMA_LONG, SMA_SHORT};
use crate::ports::config_port::ConfigPort;

pub fn validate_dashboard_config(config: &dyn ConfigPort) -> Result<(), RiskboardError> {
    validate_data_dir(config)?;
    validate_sma_periods(config)?;
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), RiskboardError> {
    match config.get_string("data", "dir") {
        Some(dir) if !dir.trim().is_empty() => Ok(()),
        Some(_) => Err(RiskboardError::ConfigInvalid {
            section: "data".to_string(),
            key: "dir".to_string(),
            reason: "dir must not be empty".to_string(),
        }),
        None => Err(RiskboardError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        }),
    }
}

fn validate_sma_periods(config: &dyn ConfigPort) -> Result<(), RiskboardError> {
    let short = config.get_int("chart", "sma_short", SMA_SHORT as i64);
    let long = config.get_int("chart", "sma_long", SMA_LONG as i64);

    if short < 1 {
        return Err(RiskboardError::ConfigInvalid {
            section: "chart".to_string(),
            key: "sma_short".to_string(),
            reason: "sma_short must be at least 1".to_string(),
        });
    }
    if long <= short {
        return Err(RiskboardError::ConfigInvalid {
            section: "chart".to_string(),
            key: "sma_long".to_string(),
            reason: format!("sma_long must be greater than sma_short ({})", short),
        });
    }
    Ok(())
}

/// SMA periods from config, defaulting to 50/200.
pub fn sma_periods(config: &dyn ConfigPort) -> (usize, usize) {
    let short = config.get_int("chart", "sma_short", SMA_SHORT as i64);
    let long = config.get_int("chart", "sma_long", SMA_LONG as i64);
    (short.max(1) as usize, long.max(1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn minimal_config_is_valid() {
        let c = config("[data]\ndir = ./data\n");
        assert!(validate_dashboard_config(&c).is_ok());
        assert_eq!(sma_periods(&c), (50, 200));
    }

    #[test]
    fn missing_data_dir() {
        let c = config("[chart]\nsma_short = 20\n");
        match validate_dashboard_config(&c) {
            Err(RiskboardError::ConfigMissing { section, key }) => {
                assert_eq!(section, "data");
                assert_eq!(key, "dir");
            }
            other => panic!("expected ConfigMissing, got {:?}", other),
        }
    }

    #[test]
    fn zero_sma_short_rejected() {
        let c = config("[data]\ndir = d\n[chart]\nsma_short = 0\n");
        assert!(matches!(
            validate_dashboard_config(&c),
            Err(RiskboardError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn sma_long_must_exceed_short() {
        let c = config("[data]\ndir = d\n[chart]\nsma_short = 100\nsma_long = 100\n");
        assert!(matches!(
            validate_dashboard_config(&c),
            Err(RiskboardError::ConfigInvalid { key, .. }) if key == "sma_long"
        ));
    }

    #[test]
    fn custom_periods_read() {
        let c = config("[data]\ndir = d\n[chart]\nsma_short = 20\nsma_long = 100\n");
        assert!(validate_dashboard_config(&c).is_ok());
        assert_eq!(sma_periods(&c), (20, 100));
    }
}
