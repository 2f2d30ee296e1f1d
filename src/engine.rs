//! Backtest execution engine.
//!
//! Drives one deterministic pass over the day-aligned derived series:
//! classify regime, evaluate exits, attempt one entry, record equity.

use crate::error::{BacktestError, Result};
use crate::portfolio::{CostModel, ExitRules, Portfolio};
use crate::regime::{regime_breakdown, RegimeBreakdown, RegimeClassifier};
use crate::series::DerivedSeries;
use crate::signal::{Signal, SignalGenerator};
use crate::sizing::PositionSizer;
use crate::types::{ClosedTrade, EquityPoint, PairSeries};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for the backtest engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial capital for the backtest.
    pub initial_capital: f64,
    /// Commission and slippage model.
    pub cost_model: CostModel,
    /// Rolling window for correlation and spread z-score.
    pub correlation_window: usize,
    /// Correlation above this is the high-correlation regime.
    pub high_corr_threshold: f64,
    /// Correlation below this is the low-correlation regime.
    pub low_corr_threshold: f64,
    /// Entries require `|z| > entry_zscore`.
    pub entry_zscore: f64,
    /// Mean-reversion trades close when `|z| < exit_zscore`.
    pub exit_zscore: f64,
    /// Stop out when unrealized PnL < `-stop_loss_pct * capital`.
    pub stop_loss_pct: f64,
    /// Maximum holding period in days.
    pub max_holding_days: usize,
    /// Cap on a single allocation as a fraction of available capital.
    pub max_position_size: f64,
    /// Minimum absolute allocation; smaller entries are dropped.
    pub min_trade_value: f64,
    pub mean_reversion_leverage: f64,
    pub momentum_leverage: f64,
    pub transition_leverage: f64,
    /// Show a progress bar during the run.
    pub show_progress: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            cost_model: CostModel::default(),
            correlation_window: 20,
            high_corr_threshold: 0.7,
            low_corr_threshold: 0.3,
            entry_zscore: 2.0,
            exit_zscore: 0.5,
            stop_loss_pct: 0.1,
            max_holding_days: 30,
            max_position_size: 0.5,
            min_trade_value: 100.0,
            mean_reversion_leverage: 2.0,
            momentum_leverage: 1.5,
            transition_leverage: 1.0,
            show_progress: true,
        }
    }
}

impl BacktestConfig {
    /// Validate parameter ranges before a run.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= 0.0 {
            return Err(BacktestError::ConfigError(
                "initial_capital must be positive".to_string(),
            ));
        }
        if self.correlation_window < 2 {
            return Err(BacktestError::ConfigError(
                "correlation_window must be at least 2".to_string(),
            ));
        }
        if self.high_corr_threshold <= self.low_corr_threshold {
            return Err(BacktestError::ConfigError(format!(
                "high_corr_threshold ({}) must exceed low_corr_threshold ({})",
                self.high_corr_threshold, self.low_corr_threshold
            )));
        }
        if self.entry_zscore <= self.exit_zscore {
            return Err(BacktestError::ConfigError(format!(
                "entry_zscore ({}) must exceed exit_zscore ({})",
                self.entry_zscore, self.exit_zscore
            )));
        }
        if self.exit_zscore < 0.0 || self.stop_loss_pct <= 0.0 {
            return Err(BacktestError::ConfigError(
                "exit_zscore must be non-negative and stop_loss_pct positive".to_string(),
            ));
        }
        if self.max_holding_days == 0 {
            return Err(BacktestError::ConfigError(
                "max_holding_days must be positive".to_string(),
            ));
        }
        if !(0.0 < self.max_position_size && self.max_position_size <= 1.0) {
            return Err(BacktestError::ConfigError(
                "max_position_size must be in (0, 1]".to_string(),
            ));
        }
        for (name, leverage) in [
            ("mean_reversion_leverage", self.mean_reversion_leverage),
            ("momentum_leverage", self.momentum_leverage),
            ("transition_leverage", self.transition_leverage),
        ] {
            if leverage <= 0.0 {
                return Err(BacktestError::ConfigError(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    fn sizer(&self) -> PositionSizer {
        PositionSizer {
            max_position_size: self.max_position_size,
            min_trade_value: self.min_trade_value,
            mean_reversion_leverage: self.mean_reversion_leverage,
            momentum_leverage: self.momentum_leverage,
            transition_leverage: self.transition_leverage,
        }
    }

    fn exit_rules(&self) -> ExitRules {
        ExitRules {
            exit_threshold: self.exit_zscore,
            stop_loss_pct: self.stop_loss_pct,
            max_holding_days: self.max_holding_days,
        }
    }
}

/// Results from a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Symbols of the two legs.
    pub symbols: [String; 2],
    /// Configuration used.
    pub config: BacktestConfig,
    pub initial_capital: f64,
    /// Cash after every position has been closed.
    pub final_equity: f64,
    pub total_return_pct: f64,
    /// Simulated days (days with defined statistics).
    pub trading_days: usize,
    /// Hedge ratio fixed over the full series.
    pub hedge_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Win rate percentage.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Gross wins / gross losses; +inf with wins and no losses.
    pub profit_factor: f64,
    pub max_drawdown_pct: f64,
    /// Per-regime day counts and trade PnL.
    pub regime_stats: Vec<RegimeBreakdown>,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Wall-clock timestamps of the run.
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// The backtest engine.
pub struct Engine {
    config: BacktestConfig,
}

impl Engine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(BacktestConfig::default())
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the backtest over one aligned price pair.
    pub fn run(&self, pair: &PairSeries) -> Result<BacktestResult> {
        self.config.validate()?;
        let started_at = Utc::now();

        let derived = DerivedSeries::compute(pair, self.config.correlation_window)?;

        info!(
            pair = %format!("{}/{}", pair.symbol_a, pair.symbol_b),
            observations = pair.len(),
            simulated_days = derived.len(),
            hedge_ratio = derived.hedge_ratio,
            "running backtest"
        );

        let classifier = RegimeClassifier::new(
            self.config.high_corr_threshold,
            self.config.low_corr_threshold,
        );
        let generator = SignalGenerator::new(self.config.entry_zscore);
        let sizer = self.config.sizer();
        let rules = self.config.exit_rules();

        let mut portfolio = Portfolio::new(self.config.initial_capital, self.config.cost_model);
        let mut observed = Vec::with_capacity(derived.len());

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(derived.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .map_err(|e| BacktestError::ConfigError(e.to_string()))?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for day in 0..derived.len() {
            let raw = derived.raw_index(day);
            let price_a = pair.prices_a[raw];
            let price_b = pair.prices_b[raw];
            let zscore = derived.zscore[day];

            let regime = classifier.classify(derived.correlation[day]);
            observed.push(regime);

            // Exits are evaluated before any new entry.
            portfolio.evaluate_exits(day, zscore, price_a, price_b, &rules);

            if portfolio.has_capacity() {
                if let Signal::Enter(entry) = generator.generate(zscore, regime) {
                    if let Some(sized) = sizer.size(regime, entry.strength, portfolio.cash) {
                        portfolio.open_position(
                            day, price_a, price_b, zscore, entry, sized, regime,
                        );
                    }
                }
            }

            portfolio.record_equity(day, price_a, price_b);

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("backtest complete");
        }

        // Force-close whatever is still open at the final prices.
        if derived.len() > 0 {
            let last_day = derived.len() - 1;
            let raw = derived.raw_index(last_day);
            portfolio.force_close_all(last_day, pair.prices_a[raw], pair.prices_b[raw]);
        }

        let result = self.aggregate(pair, &derived, portfolio, observed, started_at);

        info!(
            total_return_pct = result.total_return_pct,
            trades = result.total_trades,
            max_drawdown_pct = result.max_drawdown_pct,
            "backtest complete"
        );

        Ok(result)
    }

    /// Aggregate the final report from portfolio state.
    fn aggregate(
        &self,
        pair: &PairSeries,
        derived: &DerivedSeries,
        portfolio: Portfolio,
        observed: Vec<crate::regime::Regime>,
        started_at: DateTime<Utc>,
    ) -> BacktestResult {
        let trades = portfolio.closed_trades().to_vec();
        let equity_curve = portfolio.equity_curve().to_vec();

        // All positions are closed by now, so equity is pure cash.
        let final_equity = portfolio.cash;
        let total_return_pct =
            (final_equity - self.config.initial_capital) / self.config.initial_capital * 100.0;

        let winning: Vec<&ClosedTrade> = trades.iter().filter(|t| t.net_pnl > 0.0).collect();
        let losing: Vec<&ClosedTrade> = trades.iter().filter(|t| t.net_pnl < 0.0).collect();

        let win_rate = if trades.is_empty() {
            0.0
        } else {
            winning.len() as f64 / trades.len() as f64 * 100.0
        };

        let avg_win = if winning.is_empty() {
            0.0
        } else {
            winning.iter().map(|t| t.net_pnl).sum::<f64>() / winning.len() as f64
        };

        let avg_loss = if losing.is_empty() {
            0.0
        } else {
            losing.iter().map(|t| t.net_pnl).sum::<f64>() / losing.len() as f64
        };

        let gross_wins: f64 = winning.iter().map(|t| t.net_pnl).sum();
        let gross_losses: f64 = losing.iter().map(|t| t.net_pnl.abs()).sum();
        let profit_factor = if gross_losses > 0.0 {
            gross_wins / gross_losses
        } else if gross_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let max_drawdown_pct = equity_curve
            .iter()
            .map(|e| e.drawdown_pct)
            .fold(0.0_f64, f64::max);

        let regime_stats = regime_breakdown(&observed, &trades);

        BacktestResult {
            symbols: [pair.symbol_a.clone(), pair.symbol_b.clone()],
            config: self.config.clone(),
            initial_capital: self.config.initial_capital,
            final_equity,
            total_return_pct,
            trading_days: derived.len(),
            hedge_ratio: derived.hedge_ratio,
            total_trades: trades.len(),
            winning_trades: winning.len(),
            losing_trades: losing.len(),
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            max_drawdown_pct,
            regime_stats,
            trades,
            equity_curve,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
