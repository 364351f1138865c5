//! User holdings and portfolio-level risk aggregation.
//!
//! The aggregate treats the weighted basket as one instrument: its price path is
//! rebased to 100 and run through the same CVI calculation as a single security.
//! Comparing that against the allocation-weighted point CVI of the constituents
//! gives the diversification benefit.

use crate::domain::error::RiskboardError;
use crate::domain::time_series::TimeSeriesPoint;
use crate::domain::volatility::{compute_cvi, CVI_MIN_HISTORY};
use chrono::NaiveDate;
use log::warn;

/// Allowed deviation of the allocation total from 100%.
pub const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Most recent trading days used for the aggregate price path.
pub const MAX_AGGREGATION_DAYS: usize = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioHolding {
    pub symbol: String,
    /// Percent of the portfolio, 0-100. `None` until the user enters a value.
    pub allocation_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    holdings: Vec<PortfolioHolding>,
}

fn check_allocation(symbol: &str, allocation: f64) -> Result<(), RiskboardError> {
    if !allocation.is_finite() || !(0.0..=100.0).contains(&allocation) {
        return Err(RiskboardError::invalid(format!(
            "allocation for {} must be between 0 and 100, got {}",
            symbol, allocation
        )));
    }
    Ok(())
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings(&self) -> &[PortfolioHolding] {
        &self.holdings
    }

    pub fn get(&self, symbol: &str) -> Option<&PortfolioHolding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn add_holding(&mut self, symbol: &str, allocation: Option<f64>) -> Result<(), RiskboardError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(RiskboardError::invalid("holding symbol must not be empty"));
        }
        if self.contains(&symbol) {
            return Err(RiskboardError::invalid(format!("{} is already in the portfolio", symbol)));
        }
        if let Some(a) = allocation {
            check_allocation(&symbol, a)?;
        }
        self.holdings.push(PortfolioHolding {
            symbol,
            allocation_percent: allocation,
        });
        Ok(())
    }

    pub fn remove_holding(&mut self, symbol: &str) -> Option<PortfolioHolding> {
        let idx = self.holdings.iter().position(|h| h.symbol == symbol)?;
        Some(self.holdings.remove(idx))
    }

    pub fn set_allocation(&mut self, symbol: &str, allocation: Option<f64>) -> Result<(), RiskboardError> {
        if let Some(a) = allocation {
            check_allocation(symbol, a)?;
        }
        let holding = self
            .holdings
            .iter_mut()
            .find(|h| h.symbol == symbol)
            .ok_or_else(|| RiskboardError::invalid(format!("{} is not in the portfolio", symbol)))?;
        holding.allocation_percent = allocation;
        Ok(())
    }

    /// Sum of the entered allocations; holdings without one are skipped.
    pub fn total_allocation(&self) -> f64 {
        self.holdings.iter().filter_map(|h| h.allocation_percent).sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        !self.holdings.is_empty() && (self.total_allocation() - 100.0).abs() <= ALLOCATION_TOLERANCE
    }

    /// Holdings that carry weight in the aggregate (allocation > 0).
    pub fn weighted_holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.holdings.iter().filter_map(|h| match h.allocation_percent {
            Some(a) if a > 0.0 => Some((h.symbol.as_str(), a)),
            _ => None,
        })
    }
}

/// One weighted constituent handed to the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct HoldingInput<'a> {
    pub symbol: &'a str,
    pub allocation_percent: f64,
    /// Most recent point CVI of the security.
    pub latest_cvi: f64,
    pub history: &'a [TimeSeriesPoint],
}

impl HoldingInput<'_> {
    fn weight(&self) -> f64 {
        self.allocation_percent / 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMetrics {
    pub dates: Vec<NaiveDate>,
    pub normalized_price_series: Vec<f64>,
    pub rolling_cvi_series: Vec<i64>,
    pub weighted_cvi_series: Vec<f64>,
    pub weighted_average_cvi: f64,
    pub portfolio_cvi: i64,
    pub diversification_benefit_series: Vec<f64>,
    pub diversification_benefit_percent: f64,
    /// False when the aligned window was too short to seed the rolling CVI.
    pub cvi_warmed_up: bool,
}

impl PortfolioMetrics {
    pub fn days(&self) -> usize {
        self.normalized_price_series.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioOutcome {
    /// Allocations do not add up to 100%; nothing was computed.
    Unavailable { total_allocation: f64 },
    Ready(PortfolioMetrics),
}

pub fn allocations_complete(inputs: &[HoldingInput<'_>]) -> bool {
    let total: f64 = inputs.iter().map(|h| h.allocation_percent).sum();
    !inputs.is_empty() && (total - 100.0).abs() <= ALLOCATION_TOLERANCE
}

/// Σ (allocation/100) * latest point CVI.
pub fn weighted_average_cvi(inputs: &[HoldingInput<'_>]) -> f64 {
    inputs.iter().map(|h| h.weight() * h.latest_cvi).sum()
}

/// `(1 - rolling/weighted) * 100`, or 0 when either side is zero.
pub fn diversification_benefit(rolling_cvi: i64, weighted_cvi: f64) -> f64 {
    if rolling_cvi == 0 || weighted_cvi == 0.0 {
        return 0.0;
    }
    (1.0 - rolling_cvi as f64 / weighted_cvi) * 100.0
}

/// Length of the trailing window shared by all inputs.
fn aligned_window(inputs: &[HoldingInput<'_>]) -> Result<usize, RiskboardError> {
    if let Some(empty) = inputs.iter().find(|h| h.history.is_empty()) {
        return Err(RiskboardError::InsufficientData {
            symbol: empty.symbol.to_string(),
            points: 0,
            minimum: 1,
        });
    }
    let shortest = inputs.iter().map(|h| h.history.len()).min().unwrap_or(0);
    Ok(shortest.min(MAX_AGGREGATION_DAYS))
}

/// True when every non-empty tail ends on the same date.
fn last_dates_agree(tails: &[&[TimeSeriesPoint]]) -> bool {
    let mut last = tails.iter().filter_map(|t| t.last()).map(|p| p.date);
    match last.next() {
        Some(first) => last.all(|d| d == first),
        None => true,
    }
}

/// Combine weighted constituents into portfolio metrics.
///
/// Inputs with zero allocation should be left out by the caller; they would
/// still shorten the aligned window.
pub fn aggregate(inputs: &[HoldingInput<'_>]) -> Result<PortfolioOutcome, RiskboardError> {
    if !allocations_complete(inputs) {
        let total_allocation: f64 = inputs.iter().map(|h| h.allocation_percent).sum();
        return Ok(PortfolioOutcome::Unavailable { total_allocation });
    }

    let weighted_average_cvi = weighted_average_cvi(inputs);
    let window = aligned_window(inputs)?;

    let tails: Vec<&[TimeSeriesPoint]> = inputs
        .iter()
        .map(|h| &h.history[h.history.len() - window..])
        .collect();
    if !last_dates_agree(&tails) {
        warn!(
            "constituent histories end on different dates, aligning the last {} points by position",
            window
        );
    }

    let mut weighted_price = vec![0.0; window];
    let mut weighted_cvi_series = vec![0.0; window];
    for (input, tail) in inputs.iter().zip(&tails) {
        let w = input.weight();
        for (t, point) in tail.iter().enumerate() {
            weighted_price[t] += w * point.close;
            weighted_cvi_series[t] += w * point.cvi;
        }
    }

    let base = weighted_price[0];
    if !base.is_finite() || base <= 0.0 {
        return Err(RiskboardError::invalid(format!(
            "portfolio starting value must be positive, got {}",
            base
        )));
    }
    let normalized_price_series: Vec<f64> = weighted_price.iter().map(|p| p / base * 100.0).collect();

    let rolling_cvi_series = compute_cvi(&normalized_price_series)?;
    let portfolio_cvi = rolling_cvi_series.last().copied().unwrap_or(0);

    let diversification_benefit_series: Vec<f64> = rolling_cvi_series
        .iter()
        .zip(&weighted_cvi_series)
        .map(|(&r, &w)| diversification_benefit(r, w))
        .collect();
    let diversification_benefit_percent = diversification_benefit_series.last().copied().unwrap_or(0.0);

    let dates: Vec<NaiveDate> = tails[0].iter().map(|p| p.date).collect();

    Ok(PortfolioOutcome::Ready(PortfolioMetrics {
        dates,
        normalized_price_series,
        rolling_cvi_series,
        weighted_cvi_series,
        weighted_average_cvi,
        portfolio_cvi,
        diversification_benefit_series,
        diversification_benefit_percent,
        cvi_warmed_up: window >= CVI_MIN_HISTORY,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_history(days: usize, close: f64, cvi: f64) -> Vec<TimeSeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..days)
            .map(|i| TimeSeriesPoint {
                date: start + chrono::Duration::days(i as i64),
                close,
                volume: 1000,
                cvi,
            })
            .collect()
    }

    fn ready(outcome: PortfolioOutcome) -> PortfolioMetrics {
        match outcome {
            PortfolioOutcome::Ready(m) => m,
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut p = Portfolio::new();
        p.add_holding("vas", Some(50.0)).unwrap();
        assert!(p.contains("VAS"));
        assert!(p.add_holding("VAS", Some(10.0)).is_err());
        assert_eq!(p.holdings().len(), 1);
    }

    #[test]
    fn holdings_accessor_reflects_checked_mutations() {
        let mut p = Portfolio::new();
        p.add_holding("vgs", None).unwrap();
        p.add_holding("vas", Some(40.0)).unwrap();
        assert!(p.add_holding("VGS", Some(60.0)).is_err());

        let symbols: Vec<&str> = p.holdings().iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["VGS", "VAS"]);
    }

    #[test]
    fn allocation_bounds_enforced() {
        let mut p = Portfolio::new();
        assert!(p.add_holding("A", Some(120.0)).is_err());
        assert!(p.add_holding("A", Some(-1.0)).is_err());
        p.add_holding("A", None).unwrap();
        assert!(p.set_allocation("A", Some(f64::NAN)).is_err());
        p.set_allocation("A", Some(100.0)).unwrap();
        assert_eq!(p.get("A").unwrap().allocation_percent, Some(100.0));
    }

    #[test]
    fn set_allocation_unknown_symbol() {
        let mut p = Portfolio::new();
        assert!(p.set_allocation("NOPE", Some(10.0)).is_err());
    }

    #[test]
    fn remove_holding() {
        let mut p = Portfolio::new();
        p.add_holding("A", Some(100.0)).unwrap();
        assert!(p.remove_holding("A").is_some());
        assert!(p.remove_holding("A").is_none());
        assert!(!p.is_fully_allocated());
    }

    #[test]
    fn fully_allocated_within_tolerance() {
        let mut p = Portfolio::new();
        p.add_holding("A", Some(33.33)).unwrap();
        p.add_holding("B", Some(33.33)).unwrap();
        p.add_holding("C", Some(33.335)).unwrap();
        p.add_holding("D", None).unwrap();
        assert!(p.is_fully_allocated());

        p.set_allocation("C", Some(32.84)).unwrap();
        assert!(!p.is_fully_allocated());
    }

    #[test]
    fn weighted_holdings_skip_zero_and_missing() {
        let mut p = Portfolio::new();
        p.add_holding("A", Some(100.0)).unwrap();
        p.add_holding("B", Some(0.0)).unwrap();
        p.add_holding("C", None).unwrap();
        let w: Vec<_> = p.weighted_holdings().collect();
        assert_eq!(w, vec![("A", 100.0)]);
    }

    #[test]
    fn unavailable_when_not_fully_allocated() {
        let h = flat_history(100, 10.0, 5.0);
        let inputs = [HoldingInput {
            symbol: "A",
            allocation_percent: 99.5,
            latest_cvi: 5.0,
            history: &h,
        }];
        match aggregate(&inputs).unwrap() {
            PortfolioOutcome::Unavailable { total_allocation } => {
                assert_relative_eq!(total_allocation, 99.5)
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn empty_history_is_insufficient_data() {
        let a = flat_history(100, 10.0, 5.0);
        let inputs = [
            HoldingInput {
                symbol: "A",
                allocation_percent: 50.0,
                latest_cvi: 5.0,
                history: &a,
            },
            HoldingInput {
                symbol: "B",
                allocation_percent: 50.0,
                latest_cvi: 5.0,
                history: &[],
            },
        ];
        match aggregate(&inputs) {
            Err(RiskboardError::InsufficientData { symbol, .. }) => assert_eq!(symbol, "B"),
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn window_is_trailing_and_capped() {
        let a = flat_history(300, 10.0, 1.0);
        let b = flat_history(280, 20.0, 2.0);
        let inputs = [
            HoldingInput {
                symbol: "A",
                allocation_percent: 50.0,
                latest_cvi: 1.0,
                history: &a,
            },
            HoldingInput {
                symbol: "B",
                allocation_percent: 50.0,
                latest_cvi: 2.0,
                history: &b,
            },
        ];
        let m = ready(aggregate(&inputs).unwrap());

        assert_eq!(m.days(), MAX_AGGREGATION_DAYS);
        assert_eq!(m.rolling_cvi_series.len(), MAX_AGGREGATION_DAYS);
        assert_eq!(m.weighted_cvi_series.len(), MAX_AGGREGATION_DAYS);
        assert_eq!(m.dates[0], a[300 - MAX_AGGREGATION_DAYS].date);
        assert_eq!(m.dates.last(), a.last().map(|p| &p.date));
    }

    #[test]
    fn short_window_degrades_to_zero_cvi() {
        let a = flat_history(300, 10.0, 4.0);
        let b = flat_history(50, 20.0, 8.0);
        let inputs = [
            HoldingInput {
                symbol: "A",
                allocation_percent: 50.0,
                latest_cvi: 4.0,
                history: &a,
            },
            HoldingInput {
                symbol: "B",
                allocation_percent: 50.0,
                latest_cvi: 8.0,
                history: &b,
            },
        ];
        let m = ready(aggregate(&inputs).unwrap());

        assert_eq!(m.days(), 50);
        assert!(!m.cvi_warmed_up);
        assert!(m.rolling_cvi_series.iter().all(|&v| v == 0));
        assert_eq!(m.portfolio_cvi, 0);
        assert!(m.diversification_benefit_series.iter().all(|&v| v == 0.0));
        assert_relative_eq!(m.weighted_average_cvi, 6.0);
    }

    #[test]
    fn weighted_cvi_uses_point_cvi() {
        let a = flat_history(80, 10.0, 100.0);
        let b = flat_history(80, 20.0, 300.0);
        let inputs = [
            HoldingInput {
                symbol: "A",
                allocation_percent: 75.0,
                latest_cvi: 100.0,
                history: &a,
            },
            HoldingInput {
                symbol: "B",
                allocation_percent: 25.0,
                latest_cvi: 300.0,
                history: &b,
            },
        ];
        let m = ready(aggregate(&inputs).unwrap());
        for v in &m.weighted_cvi_series {
            assert_relative_eq!(*v, 150.0);
        }
        assert!(m.cvi_warmed_up);
    }

    #[test]
    fn last_dates_must_match() {
        let a = flat_history(10, 10.0, 1.0);
        let b = flat_history(10, 20.0, 2.0);
        let lagging = flat_history(9, 20.0, 2.0);

        let empty: &[TimeSeriesPoint] = &[];

        assert!(last_dates_agree(&[a.as_slice(), b.as_slice()]));
        assert!(!last_dates_agree(&[a.as_slice(), lagging.as_slice()]));
        assert!(last_dates_agree(&[a.as_slice(), empty]));
    }

    #[test]
    fn benefit_formula() {
        assert_eq!(diversification_benefit(0, 100.0), 0.0);
        assert_eq!(diversification_benefit(50, 0.0), 0.0);
        assert_relative_eq!(diversification_benefit(80, 100.0), 20.0);
        assert_relative_eq!(diversification_benefit(120, 100.0), -20.0);
    }
}
