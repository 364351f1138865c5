//! Portfolio aggregation requests.
//!
//! A request moves Idle -> Fetching -> Computing -> Ready. Any fetch error or
//! insufficient history drops it back to Idle with no metrics kept. Requests are
//! numbered; only the newest one may publish, so a slow request that finishes
//! after the user has changed the portfolio is discarded.

use crate::domain::error::RiskboardError;
use crate::domain::portfolio::{aggregate, HoldingInput, Portfolio, PortfolioMetrics, PortfolioOutcome};
use crate::domain::security::SecurityRecord;
use crate::domain::time_series::TimeSeriesPoint;
use crate::ports::market_data_port::MarketDataPort;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationState {
    Idle,
    Fetching,
    Computing,
    Ready(Box<PortfolioMetrics>),
}

impl AggregationState {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationState::Idle => "idle",
            AggregationState::Fetching => "fetching",
            AggregationState::Computing => "computing",
            AggregationState::Ready(_) => "ready",
        }
    }

    pub fn metrics(&self) -> Option<&PortfolioMetrics> {
        match self {
            AggregationState::Ready(m) => Some(m),
            _ => None,
        }
    }
}

/// Sequence number identifying one aggregation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Ready(PortfolioMetrics),
    /// Allocations don't total 100%; the panel shows a placeholder.
    Unavailable { total_allocation: f64 },
    /// A newer request was started before this one finished.
    Superseded,
}

#[derive(Debug)]
struct Published {
    state: AggregationState,
    last_error: Option<String>,
}

#[derive(Debug)]
pub struct AggregationSession {
    latest: AtomicU64,
    published: Mutex<Published>,
}

impl Default for AggregationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationSession {
    pub fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
            published: Mutex::new(Published {
                state: AggregationState::Idle,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> AggregationState {
        self.lock().state.clone()
    }

    /// Message of the current request's failure. Any later transition clears it.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Start a new request, superseding any in flight.
    pub fn begin(&self) -> RequestToken {
        let token = RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        debug!("aggregation request {} started", token.0);
        token
    }

    /// Apply a state change if `token` is still the newest request.
    fn transition(&self, token: RequestToken, state: AggregationState, error: Option<String>) -> bool {
        let mut published = self.lock();
        // Checked under the lock so a newer request can't publish in between.
        if !self.is_current(token) {
            debug!(
                "aggregation request {} is stale, not moving to {}",
                token.0,
                state.name()
            );
            return false;
        }
        debug!(
            "aggregation request {}: {} -> {}",
            token.0,
            published.state.name(),
            state.name()
        );
        published.state = state;
        published.last_error = error;
        true
    }

    fn fail(&self, token: RequestToken, err: RiskboardError) -> Result<RequestOutcome, RiskboardError> {
        warn!("aggregation request {} failed: {}", token.0, err);
        self.transition(token, AggregationState::Idle, Some(err.to_string()));
        Err(err)
    }

    /// Start and run a request in one call.
    pub fn refresh(
        &self,
        port: &(dyn MarketDataPort + Sync),
        portfolio: &Portfolio,
        records: &[SecurityRecord],
    ) -> Result<RequestOutcome, RiskboardError> {
        let token = self.begin();
        self.run(token, port, portfolio, records)
    }

    /// Run the request identified by `token`.
    ///
    /// Errors are returned to the caller even when the request is stale, but
    /// only the current request changes the published state.
    pub fn run(
        &self,
        token: RequestToken,
        port: &(dyn MarketDataPort + Sync),
        portfolio: &Portfolio,
        records: &[SecurityRecord],
    ) -> Result<RequestOutcome, RiskboardError> {
        if !portfolio.is_fully_allocated() {
            let total_allocation = portfolio.total_allocation();
            info!(
                "portfolio allocations total {:.2}%, metrics unavailable",
                total_allocation
            );
            if !self.transition(token, AggregationState::Idle, None) {
                return Ok(RequestOutcome::Superseded);
            }
            return Ok(RequestOutcome::Unavailable { total_allocation });
        }

        if !self.transition(token, AggregationState::Fetching, None) {
            return Ok(RequestOutcome::Superseded);
        }

        let weighted: Vec<(&str, f64)> = portfolio.weighted_holdings().collect();
        let histories = match fetch_all(port, &weighted) {
            Ok(h) => h,
            Err(e) => return self.fail(token, e),
        };

        if !self.transition(token, AggregationState::Computing, None) {
            return Ok(RequestOutcome::Superseded);
        }

        let snapshot: HashMap<&str, f64> = records.iter().map(|r| (r.symbol.as_str(), r.cvi)).collect();
        let inputs: Vec<HoldingInput<'_>> = weighted
            .iter()
            .zip(&histories)
            .map(|(&(symbol, allocation_percent), history)| HoldingInput {
                symbol,
                allocation_percent,
                latest_cvi: latest_cvi(symbol, &snapshot, history),
                history: history.as_slice(),
            })
            .collect();

        let metrics = match aggregate(&inputs) {
            Ok(PortfolioOutcome::Ready(m)) => m,
            Ok(PortfolioOutcome::Unavailable { total_allocation }) => {
                if !self.transition(token, AggregationState::Idle, None) {
                    return Ok(RequestOutcome::Superseded);
                }
                return Ok(RequestOutcome::Unavailable { total_allocation });
            }
            Err(e) => return self.fail(token, e),
        };

        if !self.transition(token, AggregationState::Ready(Box::new(metrics.clone())), None) {
            return Ok(RequestOutcome::Superseded);
        }
        info!(
            "portfolio CVI {} over {} days, diversification benefit {:.1}%",
            metrics.portfolio_cvi,
            metrics.days(),
            metrics.diversification_benefit_percent
        );
        Ok(RequestOutcome::Ready(metrics))
    }
}

/// Snapshot CVI from the summary table, falling back to the last history point.
fn latest_cvi(symbol: &str, snapshot: &HashMap<&str, f64>, history: &[TimeSeriesPoint]) -> f64 {
    snapshot
        .get(symbol)
        .copied()
        .or_else(|| history.last().map(|p| p.cvi))
        .unwrap_or(0.0)
}

/// Fetch every history in parallel. The first failure aborts the whole batch.
fn fetch_all(
    port: &(dyn MarketDataPort + Sync),
    holdings: &[(&str, f64)],
) -> Result<Vec<Vec<TimeSeriesPoint>>, RiskboardError> {
    debug!("fetching {} histories", holdings.len());
    holdings
        .par_iter()
        .map(|&(symbol, _)| {
            port.fetch_history(symbol).map_err(|e| match e {
                RiskboardError::FetchFailure { .. } => e,
                other => RiskboardError::FetchFailure {
                    symbol: symbol.to_string(),
                    reason: other.to_string(),
                },
            })
        })
        .collect()
}
