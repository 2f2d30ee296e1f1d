//! Configuration file support for backtests.
//!
//! Allows loading backtest configurations from TOML files for reproducibility.

use crate::engine::BacktestConfig;
use crate::error::{BacktestError, Result};
use crate::portfolio::CostModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete backtest configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestFileConfig {
    /// General backtest settings.
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Data settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Regime and signal thresholds.
    #[serde(default)]
    pub thresholds: ThresholdSettings,
    /// Position sizing and leverage.
    #[serde(default)]
    pub sizing: SizingSettings,
    /// Cost model settings.
    #[serde(default)]
    pub costs: CostSettings,
}

/// General backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Initial capital.
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// Rolling window for correlation and z-score, in days.
    #[serde(default = "default_window")]
    pub correlation_window: usize,
    /// Maximum holding period in days.
    #[serde(default = "default_max_holding")]
    pub max_holding_days: usize,
    /// Show a progress bar while running.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_capital() -> f64 { 100_000.0 }
fn default_window() -> usize { 20 }
fn default_max_holding() -> usize { 30 }
fn default_true() -> bool { true }

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            correlation_window: 20,
            max_holding_days: 30,
            show_progress: true,
        }
    }
}

/// Data settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSettings {
    /// Path to the CSV file for leg A.
    pub path_a: Option<String>,
    /// Path to the CSV file for leg B.
    pub path_b: Option<String>,
    /// Symbol name for leg A.
    #[serde(default = "default_symbol_a")]
    pub symbol_a: String,
    /// Symbol name for leg B.
    #[serde(default = "default_symbol_b")]
    pub symbol_b: String,
}

fn default_symbol_a() -> String { "A".to_string() }
fn default_symbol_b() -> String { "B".to_string() }

/// Regime and signal thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    /// Correlation above this is the high-correlation regime.
    #[serde(default = "default_high_corr")]
    pub high_correlation: f64,
    /// Correlation below this is the low-correlation regime.
    #[serde(default = "default_low_corr")]
    pub low_correlation: f64,
    /// Entry z-score threshold.
    #[serde(default = "default_entry_z")]
    pub entry_zscore: f64,
    /// Mean-reversion exit z-score threshold.
    #[serde(default = "default_exit_z")]
    pub exit_zscore: f64,
    /// Stop loss as a fraction of allocated capital.
    #[serde(default = "default_stop_loss")]
    pub stop_loss_pct: f64,
}

fn default_high_corr() -> f64 { 0.7 }
fn default_low_corr() -> f64 { 0.3 }
fn default_entry_z() -> f64 { 2.0 }
fn default_exit_z() -> f64 { 0.5 }
fn default_stop_loss() -> f64 { 0.1 }

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            high_correlation: 0.7,
            low_correlation: 0.3,
            entry_zscore: 2.0,
            exit_zscore: 0.5,
            stop_loss_pct: 0.1,
        }
    }
}

/// Position sizing and leverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingSettings {
    /// Cap on a single allocation as a fraction of available capital.
    #[serde(default = "default_max_position")]
    pub max_position_size: f64,
    /// Minimum absolute allocation; smaller entries are dropped.
    #[serde(default = "default_min_trade")]
    pub min_trade_value: f64,
    #[serde(default = "default_mr_leverage")]
    pub mean_reversion_leverage: f64,
    #[serde(default = "default_mom_leverage")]
    pub momentum_leverage: f64,
    #[serde(default = "default_trans_leverage")]
    pub transition_leverage: f64,
}

fn default_max_position() -> f64 { 0.5 }
fn default_min_trade() -> f64 { 100.0 }
fn default_mr_leverage() -> f64 { 2.0 }
fn default_mom_leverage() -> f64 { 1.5 }
fn default_trans_leverage() -> f64 { 1.0 }

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            max_position_size: 0.5,
            min_trade_value: 100.0,
            mean_reversion_leverage: 2.0,
            momentum_leverage: 1.5,
            transition_leverage: 1.0,
        }
    }
}

/// Cost model settings, as percentages for readability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSettings {
    /// Commission as a percentage of notional (0.1 = 10 bps).
    #[serde(default = "default_commission_pct")]
    pub commission_pct: f64,
    /// Slippage as a percentage of notional.
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: f64,
}

fn default_commission_pct() -> f64 { 0.1 }
fn default_slippage_pct() -> f64 { 0.05 }

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            commission_pct: 0.1,
            slippage_pct: 0.05,
        }
    }
}

impl BacktestFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("loading configuration from {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: BacktestFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| BacktestError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to [`BacktestConfig`] for the engine.
    pub fn to_backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.backtest.initial_capital,
            cost_model: CostModel {
                commission_pct: self.costs.commission_pct / 100.0,
                slippage_pct: self.costs.slippage_pct / 100.0,
            },
            correlation_window: self.backtest.correlation_window,
            high_corr_threshold: self.thresholds.high_correlation,
            low_corr_threshold: self.thresholds.low_correlation,
            entry_zscore: self.thresholds.entry_zscore,
            exit_zscore: self.thresholds.exit_zscore,
            stop_loss_pct: self.thresholds.stop_loss_pct,
            max_holding_days: self.backtest.max_holding_days,
            max_position_size: self.sizing.max_position_size,
            min_trade_value: self.sizing.min_trade_value,
            mean_reversion_leverage: self.sizing.mean_reversion_leverage,
            momentum_leverage: self.sizing.momentum_leverage,
            transition_leverage: self.sizing.transition_leverage,
            show_progress: self.backtest.show_progress,
        }
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Pairs backtest configuration file

[backtest]
initial_capital = 100000.0
correlation_window = 20
max_holding_days = 30
show_progress = true

[data]
path_a = "data/gld.csv"
path_b = "data/slv.csv"
symbol_a = "GLD"
symbol_b = "SLV"

[thresholds]
high_correlation = 0.7
low_correlation = 0.3
entry_zscore = 2.0
exit_zscore = 0.5
stop_loss_pct = 0.1    # 10% of allocated capital

[sizing]
max_position_size = 0.5
min_trade_value = 100.0
mean_reversion_leverage = 2.0
momentum_leverage = 1.5
transition_leverage = 1.0

[costs]
commission_pct = 0.1   # 0.1%
slippage_pct = 0.05    # 0.05%
"#
        .to_string()
    }
}
