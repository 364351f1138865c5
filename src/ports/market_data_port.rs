//! Market data access port.
//!
//! Implementations hand back typed, validated records: the analytics never
//! parse text themselves.

use crate::domain::error::RiskboardError;
use crate::domain::security::SecurityRecord;
use crate::domain::time_series::TimeSeriesPoint;

pub trait MarketDataPort {
    /// Summary snapshot of every security for the current refresh.
    fn fetch_summaries(&self) -> Result<Vec<SecurityRecord>, RiskboardError>;

    /// Full chronological daily history for one security.
    fn fetch_history(&self, symbol: &str) -> Result<Vec<TimeSeriesPoint>, RiskboardError>;
}
