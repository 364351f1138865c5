//! Export port for tabular results.

use crate::domain::error::RiskboardError;
use crate::domain::portfolio::PortfolioMetrics;
use crate::domain::ranking::RankedRecord;
use std::path::Path;

pub trait ExportPort {
    /// One row per aligned day: index, date, portfolio value, rolling CVI,
    /// weighted CVI, diversification benefit.
    fn write_metrics(&self, metrics: &PortfolioMetrics, output_path: &Path) -> Result<(), RiskboardError>;

    fn write_rankings(&self, ranked: &[RankedRecord], output_path: &Path) -> Result<(), RiskboardError>;
}
