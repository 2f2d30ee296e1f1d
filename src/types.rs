//! Core data types for the pairs backtest engine.

use crate::error::{BacktestError, Result};
use crate::regime::Regime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two time-aligned daily price series for a fixed instrument pair.
///
/// Both legs have equal length and contain only finite, strictly positive
/// prices; construction enforces this so downstream stages never see NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSeries {
    pub symbol_a: String,
    pub symbol_b: String,
    pub prices_a: Vec<f64>,
    pub prices_b: Vec<f64>,
}

impl PairSeries {
    /// Create a validated pair of aligned price series.
    pub fn new(
        symbol_a: impl Into<String>,
        symbol_b: impl Into<String>,
        prices_a: Vec<f64>,
        prices_b: Vec<f64>,
    ) -> Result<Self> {
        if prices_a.len() != prices_b.len() {
            return Err(BacktestError::DataError(format!(
                "price series length mismatch: {} vs {}",
                prices_a.len(),
                prices_b.len()
            )));
        }
        if prices_a.is_empty() {
            return Err(BacktestError::NoData);
        }
        for (i, (&a, &b)) in prices_a.iter().zip(&prices_b).enumerate() {
            if !a.is_finite() || !b.is_finite() || a <= 0.0 || b <= 0.0 {
                return Err(BacktestError::DataError(format!(
                    "non-positive or non-finite price at index {}: a={}, b={}",
                    i, a, b
                )));
            }
        }
        Ok(Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            prices_a,
            prices_b,
        })
    }

    /// Number of aligned observations.
    pub fn len(&self) -> usize {
        self.prices_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices_a.is_empty()
    }
}

/// Direction of a pairs trade across the two legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Long leg A, short leg B.
    LongAShortB,
    /// Short leg A, long leg B.
    ShortALongB,
}

impl Direction {
    /// Combine per-leg simple returns into the trade's directional return.
    pub fn combined_return(&self, return_a: f64, return_b: f64) -> f64 {
        match self {
            Direction::LongAShortB => return_a - return_b,
            Direction::ShortALongB => return_b - return_a,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LongAShortB => write!(f, "long_A_short_B"),
            Direction::ShortALongB => write!(f, "short_A_long_B"),
        }
    }
}

/// Which regime-conditioned strategy opened the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Bets the spread reverts toward its rolling mean.
    MeanReversion,
    /// Bets the spread keeps moving in its current direction.
    Momentum,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::MeanReversion => write!(f, "mean_reversion"),
            StrategyKind::Momentum => write!(f, "momentum"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Spread z-score returned inside the exit threshold.
    MeanReversionTarget,
    /// Spread z-score flipped sign against the entry.
    MomentumReversal,
    /// Unrealized loss breached the stop fraction of allocated capital.
    StopLoss,
    /// Held longer than the maximum holding period.
    MaxHoldingPeriod,
    /// Forced closure when the simulation ran out of data.
    BacktestEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::MeanReversionTarget => write!(f, "mean_reversion_target"),
            ExitReason::MomentumReversal => write!(f, "momentum_reversal"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::MaxHoldingPeriod => write!(f, "max_holding_period"),
            ExitReason::BacktestEnd => write!(f, "backtest_end"),
        }
    }
}

/// An open pairs position, owned exclusively by the ledger until closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Ledger-assigned sequential id, stable across identical runs.
    pub id: u64,
    /// Simulation day the position was opened.
    pub entry_day: usize,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub entry_zscore: f64,
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry_regime: Regime,
    /// Unlevered capital debited from cash at entry.
    pub capital_allocated: f64,
    pub leverage: f64,
    /// Commission + slippage accumulated so far (entry side only while open).
    pub transaction_costs: f64,
}

impl Position {
    /// Create a new open position.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: u64,
        entry_day: usize,
        entry_price_a: f64,
        entry_price_b: f64,
        entry_zscore: f64,
        direction: Direction,
        strategy: StrategyKind,
        entry_regime: Regime,
        capital_allocated: f64,
        leverage: f64,
        entry_costs: f64,
    ) -> Self {
        Self {
            id,
            entry_day,
            entry_price_a,
            entry_price_b,
            entry_zscore,
            direction,
            strategy,
            entry_regime,
            capital_allocated,
            leverage,
            transaction_costs: entry_costs,
        }
    }

    /// Notional exposure the position controls.
    pub fn notional(&self) -> f64 {
        self.capital_allocated * self.leverage
    }

    /// Mark-to-market PnL at the given leg prices, leverage included.
    pub fn unrealized_pnl(&self, price_a: f64, price_b: f64) -> f64 {
        let return_a = (price_a - self.entry_price_a) / self.entry_price_a;
        let return_b = (price_b - self.entry_price_b) / self.entry_price_b;
        self.direction.combined_return(return_a, return_b) * self.notional()
    }

    /// Capital tied up in the position plus its mark-to-market PnL.
    pub fn carrying_value(&self, price_a: f64, price_b: f64) -> f64 {
        self.capital_allocated + self.unrealized_pnl(price_a, price_b)
    }

    /// Whole days the position has been held as of `day`.
    pub fn holding_days(&self, day: usize) -> usize {
        day.saturating_sub(self.entry_day)
    }
}

/// A closed pairs trade. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: u64,
    pub entry_day: usize,
    pub exit_day: usize,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub exit_price_a: f64,
    pub exit_price_b: f64,
    pub entry_zscore: f64,
    pub direction: Direction,
    pub strategy: StrategyKind,
    pub entry_regime: Regime,
    pub capital_allocated: f64,
    pub leverage: f64,
    /// Entry + exit commission and slippage.
    pub transaction_costs: f64,
    pub exit_reason: ExitReason,
    /// Realized PnL after exit costs, in account currency.
    pub net_pnl: f64,
    /// Realized PnL as percent of allocated capital.
    pub pnl_pct: f64,
    pub holding_days: usize,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}

/// Equity snapshot for one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Simulation day index (0 = first day with defined statistics).
    pub day: usize,
    /// Cash plus carrying value of all open positions.
    pub equity: f64,
    pub cash: f64,
    /// Sum of leveraged mark-to-market PnL across open positions.
    pub unrealized_pnl: f64,
    /// Decline from the running equity peak, in percent.
    pub drawdown_pct: f64,
    pub open_positions: usize,
}
