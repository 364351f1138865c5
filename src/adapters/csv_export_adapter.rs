//! CSV export of portfolio metrics and ranking tables.

use crate::domain::error::RiskboardError;
use crate::domain::portfolio::PortfolioMetrics;
use crate::domain::ranking::RankedRecord;
use crate::ports::export_port::ExportPort;
use std::path::Path;

const METRICS_HEADER: [&str; 6] = [
    "day",
    "date",
    "portfolio_value",
    "rolling_cvi",
    "weighted_cvi",
    "diversification_benefit_pct",
];

const RANKINGS_HEADER: [&str; 11] = [
    "rank",
    "prior_rank",
    "rank_change",
    "symbol",
    "name",
    "category",
    "close",
    "cvi",
    "thermostat",
    "thermostat_code",
    "score",
];

#[derive(Debug, Default)]
pub struct CsvExportAdapter;

fn csv_err(path: &Path, e: csv::Error) -> RiskboardError {
    RiskboardError::Io(std::io::Error::other(format!(
        "failed to write {}: {}",
        path.display(),
        e
    )))
}

/// Metrics as string rows, header first.
pub fn metrics_rows(metrics: &PortfolioMetrics) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![METRICS_HEADER.iter().map(|s| s.to_string()).collect()];
    for day in 0..metrics.days() {
        rows.push(vec![
            (day + 1).to_string(),
            metrics
                .dates
                .get(day)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            format!("{:.4}", metrics.normalized_price_series[day]),
            metrics.rolling_cvi_series[day].to_string(),
            format!("{:.2}", metrics.weighted_cvi_series[day]),
            format!("{:.2}", metrics.diversification_benefit_series[day]),
        ]);
    }
    rows
}

pub fn ranking_rows(ranked: &[RankedRecord]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![RANKINGS_HEADER.iter().map(|s| s.to_string()).collect()];
    for r in ranked {
        rows.push(vec![
            r.rank.to_string(),
            r.prior_rank.to_string(),
            r.rank_change.to_string(),
            r.record.symbol.clone(),
            r.record.name.clone(),
            r.record.category.clone(),
            format!("{:.2}", r.record.close_price),
            format!("{:.0}", r.record.cvi),
            r.record.thermostat.to_string(),
            r.record.thermostat.code().map(|c| c.to_string()).unwrap_or_default(),
            r.record.score.map(|s| format!("{:.4}", s)).unwrap_or_default(),
        ]);
    }
    rows
}

fn write_rows(rows: &[Vec<String>], output_path: &Path) -> Result<(), RiskboardError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(output_path).map_err(|e| csv_err(output_path, e))?;
    for row in rows {
        wtr.write_record(row).map_err(|e| csv_err(output_path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

impl ExportPort for CsvExportAdapter {
    fn write_metrics(&self, metrics: &PortfolioMetrics, output_path: &Path) -> Result<(), RiskboardError> {
        write_rows(&metrics_rows(metrics), output_path)
    }

    fn write_rankings(&self, ranked: &[RankedRecord], output_path: &Path) -> Result<(), RiskboardError> {
        write_rows(&ranking_rows(ranked), output_path)
    }
}
