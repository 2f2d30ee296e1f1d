//! Regime-aware position sizing.

use crate::regime::Regime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capital allocation and leverage for an accepted entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizedEntry {
    /// Unlevered capital to debit from cash.
    pub capital: f64,
    pub leverage: f64,
}

/// Maps (regime, signal strength, available capital) to an allocation.
///
/// Allocation is `base_fraction(regime) * strength * available`, capped at
/// `max_position_size * available`. Allocations below `min_trade_value`
/// are rejected as a business no-op, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSizer {
    /// Cap on any single allocation, as a fraction of available capital.
    pub max_position_size: f64,
    /// Minimum absolute allocation; smaller entries are dropped.
    pub min_trade_value: f64,
    pub mean_reversion_leverage: f64,
    pub momentum_leverage: f64,
    pub transition_leverage: f64,
}

impl PositionSizer {
    /// Base capital fraction by regime. The transition fraction is only
    /// reachable if transition entries are ever permitted; it keeps the
    /// table total over the closed enum.
    pub fn base_fraction(regime: Regime) -> f64 {
        match regime {
            Regime::HighCorrelation => 0.4,
            Regime::LowCorrelation => 0.5,
            Regime::Transition => 0.2,
        }
    }

    /// Fixed leverage multiplier by regime.
    pub fn leverage(&self, regime: Regime) -> f64 {
        match regime {
            Regime::HighCorrelation => self.mean_reversion_leverage,
            Regime::LowCorrelation => self.momentum_leverage,
            Regime::Transition => self.transition_leverage,
        }
    }

    /// Size an entry. `None` means the entry is dropped (too small), which
    /// is a normal outcome rather than an error.
    pub fn size(&self, regime: Regime, strength: f64, available: f64) -> Option<SizedEntry> {
        if available <= 0.0 {
            return None;
        }

        let uncapped = Self::base_fraction(regime) * strength * available;
        let capital = uncapped.min(self.max_position_size * available);

        if capital < self.min_trade_value {
            debug!(
                capital,
                min = self.min_trade_value,
                "allocation below minimum trade value, entry dropped"
            );
            return None;
        }

        Some(SizedEntry {
            capital,
            leverage: self.leverage(regime),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer {
            max_position_size: 0.5,
            min_trade_value: 100.0,
            mean_reversion_leverage: 2.0,
            momentum_leverage: 1.5,
            transition_leverage: 1.0,
        }
    }

    #[test]
    fn test_base_allocation() {
        let entry = sizer()
            .size(Regime::HighCorrelation, 1.0, 100_000.0)
            .unwrap();
        assert!((entry.capital - 40_000.0).abs() < 1e-9);
        assert!((entry.leverage - 2.0).abs() < 1e-12);

        let entry = sizer().size(Regime::LowCorrelation, 1.0, 100_000.0).unwrap();
        assert!((entry.capital - 50_000.0).abs() < 1e-9);
        assert!((entry.leverage - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_strength_scales_allocation() {
        let entry = sizer()
            .size(Regime::HighCorrelation, 1.2, 100_000.0)
            .unwrap();
        assert!((entry.capital - 48_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_applies() {
        // 0.5 * 2.0 = 1.0 of capital uncapped, capped to 0.5
        let entry = sizer().size(Regime::LowCorrelation, 2.0, 100_000.0).unwrap();
        assert!((entry.capital - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimum_trade_value_rejects() {
        assert!(sizer().size(Regime::HighCorrelation, 1.0, 200.0).is_none());
        assert!(sizer().size(Regime::HighCorrelation, 1.0, 0.0).is_none());
        assert!(sizer().size(Regime::HighCorrelation, 1.0, -50.0).is_none());
    }

    #[test]
    fn test_transition_sizing_reachable_but_small() {
        let entry = sizer().size(Regime::Transition, 1.0, 100_000.0).unwrap();
        assert!((entry.capital - 20_000.0).abs() < 1e-9);
        assert!((entry.leverage - 1.0).abs() < 1e-12);
    }
}
