//! Numeric primitives over plain `f64` series.
//!
//! Invalid input (zero window, non-positive prices) is an error. Short input is
//! not: statistics that cannot be seeded yet come back as `None` or zero.

use crate::domain::error::RiskboardError;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Display scaling applied after annualisation.
pub const CVI_SCALE: f64 = 500.0;

/// Simple moving average. Index `i` is `None` while `i < window - 1`.
pub fn moving_average(series: &[f64], window: usize) -> Result<Vec<Option<f64>>, RiskboardError> {
    if window == 0 {
        return Err(RiskboardError::invalid("moving average window must be at least 1"));
    }

    let mut values = Vec::with_capacity(series.len());
    let mut sum = 0.0;

    for (i, &x) in series.iter().enumerate() {
        // Drop the outgoing value before adding the new one so window=1 is exact.
        if i >= window {
            sum -= series[i - window];
        }
        sum += x;

        if i + 1 < window {
            values.push(None);
        } else {
            values.push(Some(sum / window as f64));
        }
    }

    Ok(values)
}

/// `r[0] = 0`, `r[i] = ln(p[i] / p[i-1])^2`.
pub fn log_returns_squared(series: &[f64]) -> Result<Vec<f64>, RiskboardError> {
    if let Some((i, &bad)) = series
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v <= 0.0)
    {
        return Err(RiskboardError::invalid(format!(
            "log return undefined for value {} at index {}",
            bad, i
        )));
    }

    let mut out = Vec::with_capacity(series.len());
    if series.is_empty() {
        return Ok(out);
    }
    out.push(0.0);
    out.extend(series.windows(2).map(|w| {
        let r = (w[1] / w[0]).ln();
        r * r
    }));
    Ok(out)
}

/// Exponentially-weighted average of squared returns.
///
/// alpha = 2/(period+1). Seeded with the mean of `squared_returns[1..=period]`
/// (index 0 is the forced-zero return). Entries before `period` are 0.
/// Returns all zeros when the input is not longer than `period`.
pub fn ewma_variance(squared_returns: &[f64], period: usize) -> Result<Vec<f64>, RiskboardError> {
    if period == 0 {
        return Err(RiskboardError::invalid("EWMA period must be at least 1"));
    }
    if squared_returns.len() <= period {
        return Ok(vec![0.0; squared_returns.len()]);
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = vec![0.0; squared_returns.len()];

    let seed = squared_returns[1..=period].iter().sum::<f64>() / period as f64;
    values[period] = seed;

    let mut ema = seed;
    for i in (period + 1)..squared_returns.len() {
        ema += alpha * (squared_returns[i] - ema);
        values[i] = ema;
    }

    Ok(values)
}

/// round(sqrt(variance) * sqrt(252) * 500)
pub fn cvi_from_variance(variance: f64) -> i64 {
    (variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * CVI_SCALE).round() as i64
}
