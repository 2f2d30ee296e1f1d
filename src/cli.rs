//! Command-line interface for the pairs backtest engine.

use crate::analytics::ResultFormatter;
use crate::config::BacktestFileConfig;
use crate::data::{load_pair, load_price_series};
use crate::engine::{BacktestConfig, BacktestResult, Engine};
use crate::error::{BacktestError, Result};
use crate::portfolio::CostModel;

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Statarb - a regime-adaptive pairs trading backtester.
#[derive(Parser)]
#[command(name = "statarb")]
#[command(version)]
#[command(about = "A regime-adaptive pairs trading backtesting engine")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pairs backtest from two CSV price files
    Run {
        /// Path to CSV price file for leg A
        #[arg(long)]
        data_a: PathBuf,

        /// Path to CSV price file for leg B
        #[arg(long)]
        data_b: PathBuf,

        /// Symbol name for leg A
        #[arg(long, default_value = "A")]
        symbol_a: String,

        /// Symbol name for leg B
        #[arg(long, default_value = "B")]
        symbol_b: String,

        /// Initial capital
        #[arg(short, long, default_value = "100000")]
        capital: f64,

        /// Rolling window in days for correlation and z-score
        #[arg(short, long, default_value = "20")]
        window: usize,

        /// Entry z-score threshold
        #[arg(long, default_value = "2.0")]
        entry_zscore: f64,

        /// Mean-reversion exit z-score threshold
        #[arg(long, default_value = "0.5")]
        exit_zscore: f64,

        /// Commission percentage (e.g., 0.1 for 0.1%)
        #[arg(long, default_value = "0.1")]
        commission: f64,

        /// Slippage percentage (e.g., 0.05 for 0.05%)
        #[arg(long, default_value = "0.05")]
        slippage: f64,

        /// Closed trades to show after the report (0 hides the table)
        #[arg(long, default_value = "10")]
        show_trades: usize,
    },

    /// Run a backtest from a TOML configuration file
    RunConfig {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Validate a CSV price file
    Validate {
        /// Path to CSV price file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "backtest.toml")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();

        // A second init in the same process is harmless.
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn emit(result: &BacktestResult, format: OutputFormat, show_trades: usize) {
    match format {
        OutputFormat::Text => {
            ResultFormatter::print_report(result);
            if show_trades > 0 {
                println!();
                ResultFormatter::print_trades(&result.trades, show_trades);
            }
        }
        OutputFormat::Json => println!("{}", ResultFormatter::to_json(result)),
        OutputFormat::Csv => {
            println!("{}", ResultFormatter::csv_header());
            println!("{}", ResultFormatter::to_csv_line(result));
        }
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Run {
            data_a,
            data_b,
            symbol_a,
            symbol_b,
            capital,
            window,
            entry_zscore,
            exit_zscore,
            commission,
            slippage,
            show_trades,
        } => {
            let pair = load_pair(data_a, data_b, symbol_a.clone(), symbol_b.clone())?;

            let config = BacktestConfig {
                initial_capital: *capital,
                correlation_window: *window,
                entry_zscore: *entry_zscore,
                exit_zscore: *exit_zscore,
                cost_model: CostModel {
                    commission_pct: commission / 100.0,
                    slippage_pct: slippage / 100.0,
                },
                show_progress: matches!(cli.output, OutputFormat::Text),
                ..Default::default()
            };

            let result = Engine::new(config).run(&pair)?;
            emit(&result, cli.output, *show_trades);
        }

        Commands::RunConfig { config } => {
            let file_config = BacktestFileConfig::load(config)?;

            let path_a = file_config.data.path_a.as_ref().ok_or_else(|| {
                BacktestError::ConfigError("data.path_a is required".to_string())
            })?;
            let path_b = file_config.data.path_b.as_ref().ok_or_else(|| {
                BacktestError::ConfigError("data.path_b is required".to_string())
            })?;

            let pair = load_pair(
                path_a,
                path_b,
                file_config.data.symbol_a.clone(),
                file_config.data.symbol_b.clone(),
            )?;

            let result = Engine::new(file_config.to_backtest_config()).run(&pair)?;
            emit(&result, cli.output, 10);
        }

        Commands::Validate { data } => {
            let prices = load_price_series(data)?;
            info!(observations = prices.len(), "file is usable");
            println!(
                "{}: {} usable price rows (min {:.4}, max {:.4})",
                data.display(),
                prices.len(),
                prices.iter().cloned().fold(f64::INFINITY, f64::min),
                prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            );
        }

        Commands::Init { output } => {
            fs::write(output, BacktestFileConfig::example())?;
            println!("Wrote example configuration to {}", output.display());
        }
    }

    Ok(())
}
