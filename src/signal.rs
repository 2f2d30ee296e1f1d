//! Entry-signal generation from (z-score, regime).
//!
//! High-correlation days fade the spread (mean reversion); low-correlation
//! days follow it (momentum); transition days never open positions.

use crate::regime::Regime;
use crate::types::{Direction, StrategyKind};
use serde::{Deserialize, Serialize};

/// Upper bound on signal strength so extreme z-scores cannot dominate sizing.
pub const MAX_STRENGTH: f64 = 2.0;

/// A non-hold entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub direction: Direction,
    pub strategy: StrategyKind,
    /// `min(|z| / entry_threshold, 2.0)`; scales the capital allocation.
    pub strength: f64,
}

/// Signal emitted for one simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Signal {
    #[default]
    Hold,
    Enter(EntrySignal),
}

impl Signal {
    pub fn is_hold(&self) -> bool {
        matches!(self, Signal::Hold)
    }
}

/// Stateless mapper from (z-score, regime) to an entry signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalGenerator {
    pub entry_threshold: f64,
}

impl SignalGenerator {
    pub fn new(entry_threshold: f64) -> Self {
        Self { entry_threshold }
    }

    /// Generate the day's signal.
    ///
    /// `|z| <= entry_threshold` holds regardless of regime, and the
    /// transition regime holds regardless of z-score.
    pub fn generate(&self, zscore: f64, regime: Regime) -> Signal {
        if zscore.abs() <= self.entry_threshold {
            return Signal::Hold;
        }

        let (strategy, direction) = match regime {
            Regime::HighCorrelation => {
                // Fade the spread back toward its mean.
                let direction = if zscore > 0.0 {
                    Direction::ShortALongB
                } else {
                    Direction::LongAShortB
                };
                (StrategyKind::MeanReversion, direction)
            }
            Regime::LowCorrelation => {
                // Follow the spread in its current direction.
                let direction = if zscore > 0.0 {
                    Direction::LongAShortB
                } else {
                    Direction::ShortALongB
                };
                (StrategyKind::Momentum, direction)
            }
            Regime::Transition => return Signal::Hold,
        };

        let strength = (zscore.abs() / self.entry_threshold).min(MAX_STRENGTH);

        Signal::Enter(EntrySignal {
            direction,
            strategy,
            strength,
        })
    }
}
