//! Correlation regime classification.
//!
//! Each simulated day is mapped to one of three regimes from the rolling
//! return correlation of the pair. The regime decides which strategy may
//! open positions that day and how entries are sized.

use crate::types::ClosedTrade;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation state of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Returns move together; the spread is expected to mean-revert.
    HighCorrelation,
    /// Returns have decoupled; spread moves are traded as momentum.
    LowCorrelation,
    /// Between thresholds (or correlation undefined). No new entries.
    Transition,
}

impl Regime {
    /// All regimes, for exhaustive per-regime aggregation.
    pub const ALL: [Regime; 3] = [
        Regime::HighCorrelation,
        Regime::LowCorrelation,
        Regime::Transition,
    ];
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::HighCorrelation => write!(f, "high_correlation"),
            Regime::LowCorrelation => write!(f, "low_correlation"),
            Regime::Transition => write!(f, "transition"),
        }
    }
}

/// Stateless threshold classifier.
///
/// Thresholds are exclusive on the extreme side: a correlation exactly at
/// a threshold falls into `Transition`. No hysteresis; each day is
/// classified independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegimeClassifier {
    pub high_threshold: f64,
    pub low_threshold: f64,
}

impl RegimeClassifier {
    pub fn new(high_threshold: f64, low_threshold: f64) -> Self {
        Self {
            high_threshold,
            low_threshold,
        }
    }

    /// Classify one day's correlation. An undefined correlation (degenerate
    /// window) is treated as `Transition`, never as an extreme.
    pub fn classify(&self, correlation: Option<f64>) -> Regime {
        match correlation {
            Some(corr) if corr > self.high_threshold => Regime::HighCorrelation,
            Some(corr) if corr < self.low_threshold => Regime::LowCorrelation,
            _ => Regime::Transition,
        }
    }
}

/// Per-regime aggregation for the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeBreakdown {
    pub regime: Regime,
    /// Days the simulation observed this regime.
    pub days: usize,
    /// Share of all simulated days, in percent.
    pub days_pct: f64,
    /// Trades entered while this regime was active.
    pub trades: usize,
    /// Cumulative net PnL of those trades.
    pub total_pnl: f64,
    /// Average net PnL per trade (0 when no trades).
    pub avg_pnl: f64,
}

/// Aggregate observed regimes and closed trades into per-regime stats.
pub fn regime_breakdown(observed: &[Regime], trades: &[ClosedTrade]) -> Vec<RegimeBreakdown> {
    let total_days = observed.len();

    Regime::ALL
        .iter()
        .map(|&regime| {
            let days = observed.iter().filter(|&&r| r == regime).count();
            let days_pct = if total_days > 0 {
                days as f64 / total_days as f64 * 100.0
            } else {
                0.0
            };

            let regime_trades: Vec<&ClosedTrade> =
                trades.iter().filter(|t| t.entry_regime == regime).collect();
            let total_pnl: f64 = regime_trades.iter().map(|t| t.net_pnl).sum();
            let avg_pnl = if regime_trades.is_empty() {
                0.0
            } else {
                total_pnl / regime_trades.len() as f64
            };

            RegimeBreakdown {
                regime,
                days,
                days_pct,
                trades: regime_trades.len(),
                total_pnl,
                avg_pnl,
            }
        })
        .collect()
}
