//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::csv_export_adapter::CsvExportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::holdings_file_adapter::CsvHoldingsStore;
use crate::domain::config_validation::{sma_periods, validate_dashboard_config};
use crate::domain::error::RiskboardError;
use crate::domain::portfolio::{Portfolio, PortfolioMetrics};
use crate::domain::ranking::{filter_by_category, rank, top_movers, RankedRecord};
use crate::domain::session::{AggregationSession, RequestOutcome};
use crate::domain::volatility::{chart_series_with, ChartPoint};
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportPort;
use crate::ports::holdings_store::HoldingsStore;
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "riskboard", about = "Security ranking and portfolio volatility dashboard")]
pub struct Cli {
    #[arg(short, long, global = true, default_value = "riskboard.ini")]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rank securities by momentum score with week-over-week change
    Rank {
        #[arg(long)]
        category: Option<String>,
        /// Only show the N biggest climbers
        #[arg(long)]
        movers: Option<usize>,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Price, SMA overlays and rolling CVI for one security
    Chart {
        #[arg(long)]
        symbol: String,
        /// Only print the last N days
        #[arg(long, default_value_t = 20)]
        last: usize,
    },
    /// Aggregate the saved holdings into portfolio risk metrics
    Portfolio {
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Manage the saved holdings list
    Holdings {
        #[command(subcommand)]
        action: HoldingsAction,
    },
    /// Validate the configuration file
    Validate,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum HoldingsAction {
    List,
    Add {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        allocation: Option<f64>,
    },
    Remove {
        #[arg(long)]
        symbol: String,
    },
    Set {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        allocation: f64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_dashboard_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let result = match cli.command {
        Command::Rank {
            category,
            movers,
            export,
        } => run_rank(&config, category.as_deref(), movers, export.as_deref()),
        Command::Chart { symbol, last } => run_chart(&config, &symbol, last),
        Command::Portfolio { export } => run_portfolio(&config, export.as_deref()),
        Command::Holdings { action } => run_holdings(&config, action),
        Command::Validate => {
            eprintln!("Configuration {} is valid", cli.config.display());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    debug!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

pub fn market_data(config: &FileConfigAdapter) -> CsvMarketData {
    CsvMarketData::new(config.get_path("data", "dir", "data"))
}

pub fn holdings_store(config: &FileConfigAdapter) -> CsvHoldingsStore {
    CsvHoldingsStore::new(config.get_path("portfolio", "holdings", "holdings.csv"))
}

/// Relative export paths land under `[export] dir` when one is configured.
pub fn export_target(config: &FileConfigAdapter, path: &Path) -> PathBuf {
    let configured = config
        .get_string("export", "dir")
        .filter(|d| !d.trim().is_empty());
    if path.is_absolute() || configured.is_none() {
        path.to_path_buf()
    } else {
        config.get_path("export", "dir", ".").join(path)
    }
}

/// Summaries → optional category filter → ranking.
pub fn rank_pipeline(
    port: &dyn MarketDataPort,
    category: Option<&str>,
) -> Result<Vec<RankedRecord>, RiskboardError> {
    let mut records = port.fetch_summaries()?;
    if let Some(c) = category {
        records = filter_by_category(&records, c);
    }
    let ranked = rank(&records);
    info!(
        "ranked {} of {} securities",
        ranked.len(),
        records.len()
    );
    Ok(ranked)
}

pub fn chart_pipeline(
    port: &dyn MarketDataPort,
    symbol: &str,
    sma_short: usize,
    sma_long: usize,
) -> Result<Vec<ChartPoint>, RiskboardError> {
    let history = port.fetch_history(symbol)?;
    if history.is_empty() {
        return Err(RiskboardError::InsufficientData {
            symbol: symbol.to_string(),
            points: 0,
            minimum: 1,
        });
    }
    chart_series_with(&history, sma_short, sma_long)
}

pub fn portfolio_pipeline(
    port: &(dyn MarketDataPort + Sync),
    store: &dyn HoldingsStore,
    session: &AggregationSession,
) -> Result<RequestOutcome, RiskboardError> {
    let portfolio = store.load()?;
    let records = port.fetch_summaries()?;
    session.refresh(port, &portfolio, &records)
}

pub fn apply_holdings_action(
    store: &dyn HoldingsStore,
    action: &HoldingsAction,
) -> Result<Portfolio, RiskboardError> {
    let mut portfolio = store.load()?;
    match action {
        HoldingsAction::List => return Ok(portfolio),
        HoldingsAction::Add { symbol, allocation } => portfolio.add_holding(symbol, *allocation)?,
        HoldingsAction::Remove { symbol } => {
            let symbol = symbol.trim().to_uppercase();
            if portfolio.remove_holding(&symbol).is_none() {
                return Err(RiskboardError::invalid(format!("{} is not in the portfolio", symbol)));
            }
        }
        HoldingsAction::Set { symbol, allocation } => {
            portfolio.set_allocation(&symbol.trim().to_uppercase(), Some(*allocation))?
        }
    }
    store.save(&portfolio)?;
    Ok(portfolio)
}

fn run_rank(
    config: &FileConfigAdapter,
    category: Option<&str>,
    movers: Option<usize>,
    export: Option<&Path>,
) -> Result<(), RiskboardError> {
    let mut ranked = rank_pipeline(&market_data(config), category)?;
    if let Some(n) = movers {
        ranked = top_movers(&ranked, n);
    }

    if ranked.is_empty() {
        eprintln!("No rankable securities");
    }
    println!(
        "{:>4} {:>6} {:<8} {:<32} {:>10} {:>6} {:<8}",
        "Rank", "Chg", "Symbol", "Name", "Close", "CVI", "Regime"
    );
    for r in &ranked {
        println!(
            "{:>4} {:>+6} {:<8} {:<32} {:>10.2} {:>6.0} {:<8}",
            r.rank,
            r.rank_change,
            r.record.symbol,
            truncate(&r.record.name, 32),
            r.record.close_price,
            r.record.cvi,
            r.record.thermostat,
        );
    }

    if let Some(path) = export {
        let path = export_target(config, path);
        CsvExportAdapter.write_rankings(&ranked, &path)?;
        eprintln!("Rankings written to: {}", path.display());
    }
    Ok(())
}

fn run_chart(config: &FileConfigAdapter, symbol: &str, last: usize) -> Result<(), RiskboardError> {
    let (short, long) = sma_periods(config);
    let symbol = symbol.trim().to_uppercase();
    let chart = chart_pipeline(&market_data(config), &symbol, short, long)?;

    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>6}",
        "Date",
        "Close",
        format!("SMA{}", short),
        format!("SMA{}", long),
        "CVI"
    );
    let skip = chart.len().saturating_sub(last);
    for p in &chart[skip..] {
        println!(
            "{:<10} {:>10.2} {:>10} {:>10} {:>6}",
            p.date,
            p.close,
            fmt_opt(p.sma_short),
            fmt_opt(p.sma_long),
            p.rolling_cvi
        );
    }
    Ok(())
}

fn run_portfolio(config: &FileConfigAdapter, export: Option<&Path>) -> Result<(), RiskboardError> {
    let session = AggregationSession::new();
    let outcome = portfolio_pipeline(&market_data(config), &holdings_store(config), &session)?;

    match outcome {
        RequestOutcome::Ready(metrics) => {
            print_metrics(&metrics);
            if let Some(path) = export {
                let path = export_target(config, path);
                CsvExportAdapter.write_metrics(&metrics, &path)?;
                eprintln!("Portfolio metrics written to: {}", path.display());
            }
        }
        RequestOutcome::Unavailable { total_allocation } => {
            eprintln!(
                "Portfolio metrics unavailable: allocations total {:.2}%, need 100%",
                total_allocation
            );
        }
        RequestOutcome::Superseded => {
            eprintln!("Portfolio request superseded");
        }
    }
    Ok(())
}

fn run_holdings(config: &FileConfigAdapter, action: HoldingsAction) -> Result<(), RiskboardError> {
    let portfolio = apply_holdings_action(&holdings_store(config), &action)?;

    for h in portfolio.holdings() {
        println!("{:<8} {:>8}", h.symbol, fmt_opt(h.allocation_percent));
    }
    let total = portfolio.total_allocation();
    if portfolio.is_fully_allocated() {
        eprintln!("Total allocation: {:.2}%", total);
    } else {
        eprintln!("Total allocation: {:.2}% (must be 100% to aggregate)", total);
    }
    Ok(())
}

fn print_metrics(metrics: &PortfolioMetrics) {
    println!("=== Portfolio ===");
    println!("Days aggregated:        {}", metrics.days());
    println!("Portfolio CVI:          {}", metrics.portfolio_cvi);
    println!("Weighted average CVI:   {:.1}", metrics.weighted_average_cvi);
    println!(
        "Diversification benefit: {:.1}%",
        metrics.diversification_benefit_percent
    );
    if let Some(last) = metrics.normalized_price_series.last() {
        println!("Portfolio value:        {:.2} (rebased to 100)", last);
    }
    if !metrics.cvi_warmed_up {
        eprintln!("warning: history too short to seed the rolling CVI, values are zero");
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(std::iter::once('…')).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("Short", 10), "Short");
        assert_eq!(truncate("Vanguard Australian Shares", 8), "Vanguar…");
    }

    #[test]
    fn fmt_opt_dash_for_none() {
        assert_eq!(fmt_opt(None), "-");
        assert_eq!(fmt_opt(Some(1.234)), "1.23");
    }

    #[test]
    fn cli_parses_holdings_add() {
        let cli = Cli::try_parse_from([
            "riskboard",
            "--config",
            "x.ini",
            "holdings",
            "add",
            "--symbol",
            "VAS",
            "--allocation",
            "60",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("x.ini"));
        match cli.command {
            Command::Holdings { action } => assert_eq!(
                action,
                HoldingsAction::Add {
                    symbol: "VAS".into(),
                    allocation: Some(60.0)
                }
            ),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn export_target_uses_export_dir() {
        let config = FileConfigAdapter::from_string("[export]\ndir = /tmp/riskboard-out\n").unwrap();
        assert_eq!(
            export_target(&config, Path::new("rank.csv")),
            PathBuf::from("/tmp/riskboard-out/rank.csv")
        );
        assert_eq!(
            export_target(&config, Path::new("/abs/rank.csv")),
            PathBuf::from("/abs/rank.csv")
        );

        let bare = FileConfigAdapter::from_string("[data]\ndir = d\n").unwrap();
        assert_eq!(export_target(&bare, Path::new("rank.csv")), PathBuf::from("rank.csv"));
    }

    #[test]
    fn cli_default_config_path() {
        let cli = Cli::try_parse_from(["riskboard", "validate"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("riskboard.ini"));
    }
}
