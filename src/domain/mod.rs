//! Core domain types and analytics.

pub mod time_series;
pub mod security;
pub mod series_math;
pub mod volatility;
pub mod ranking;
pub mod portfolio;
pub mod session;
pub mod config_validation;
pub mod error;
