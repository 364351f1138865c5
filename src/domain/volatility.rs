//! Rolling continuous volatility index (CVI) and SMA overlays for one series.
//!
//! CVI(67) = round(sqrt(EWMA67(ln(P[i]/P[i-1])^2)) * sqrt(252) * 500)
//! Warmup: the first 67 values are 0. Series shorter than 68 points are all 0.

use crate::domain::error::RiskboardError;
use crate::domain::series_math::{cvi_from_variance, ewma_variance, log_returns_squared, moving_average};
use crate::domain::time_series::{closes, TimeSeriesPoint};
use chrono::NaiveDate;

pub const CVI_PERIOD: usize = 67;
pub const CVI_MIN_HISTORY: usize = CVI_PERIOD + 1;

pub const SMA_SHORT: usize = 50;
pub const SMA_LONG: usize = 200;

pub fn compute_cvi(prices: &[f64]) -> Result<Vec<i64>, RiskboardError> {
    if prices.len() < CVI_MIN_HISTORY {
        return Ok(vec![0; prices.len()]);
    }

    let squared = log_returns_squared(prices)?;
    let variance = ewma_variance(&squared, CVI_PERIOD)?;
    Ok(variance.into_iter().map(cvi_from_variance).collect())
}

pub fn compute_sma(points: &[TimeSeriesPoint], periods: usize) -> Result<Vec<Option<f64>>, RiskboardError> {
    moving_average(&closes(points), periods)
}

/// One row of the single-security chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rolling_cvi: i64,
}

/// Chart rows with the default 50/200 day overlays.
pub fn chart_series(points: &[TimeSeriesPoint]) -> Result<Vec<ChartPoint>, RiskboardError> {
    chart_series_with(points, SMA_SHORT, SMA_LONG)
}

pub fn chart_series_with(
    points: &[TimeSeriesPoint],
    short: usize,
    long: usize,
) -> Result<Vec<ChartPoint>, RiskboardError> {
    let prices = closes(points);
    let sma_short = moving_average(&prices, short)?;
    let sma_long = moving_average(&prices, long)?;
    let cvi = compute_cvi(&prices)?;

    Ok(points
        .iter()
        .enumerate()
        .map(|(i, p)| ChartPoint {
            date: p.date,
            close: p.close,
            sma_short: sma_short[i],
            sma_long: sma_long[i],
            rolling_cvi: cvi[i],
        })
        .collect())
}
