//! riskboard — security ranking and portfolio volatility analytics.
//!
//! Hexagonal layout: analytics in [`domain`], port traits in [`ports`],
//! file-backed implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
