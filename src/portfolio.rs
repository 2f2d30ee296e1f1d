//! Portfolio state and the pairs position ledger.
//!
//! The ledger owns every open position from creation to close. Cash only
//! moves on entry (debit allocation + costs) and exit (credit allocation +
//! net PnL); closed trades are immutable history.

use crate::regime::Regime;
use crate::signal::EntrySignal;
use crate::sizing::SizedEntry;
use crate::types::{ClosedTrade, EquityPoint, ExitReason, Position, StrategyKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hard cap on simultaneously open positions.
pub const MAX_OPEN_POSITIONS: usize = 2;

/// Fractional transaction costs applied to notional on each side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostModel {
    /// Commission as a fraction of notional (e.g. 0.001 = 10 bps).
    pub commission_pct: f64,
    /// Slippage as a fraction of notional.
    pub slippage_pct: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission_pct: 0.001,
            slippage_pct: 0.0005,
        }
    }
}

impl CostModel {
    /// Zero-cost model for tests.
    pub fn zero() -> Self {
        Self {
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }

    /// Cost of one side (entry or exit) on the given notional.
    pub fn per_side(&self, notional: f64) -> f64 {
        notional * (self.commission_pct + self.slippage_pct)
    }

    /// Full entry-plus-exit cost on the given notional.
    pub fn round_trip(&self, notional: f64) -> f64 {
        2.0 * self.per_side(notional)
    }
}

/// Exit conditions evaluated for every open position, in priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExitRules {
    /// Mean-reversion target: close when `|z| < exit_threshold`.
    pub exit_threshold: f64,
    /// Close when unrealized PnL falls below `-stop_loss_pct * capital`.
    /// Unrealized PnL is leverage-scaled; the capital base is not.
    pub stop_loss_pct: f64,
    /// Close once held this many days. The bound is inclusive: a position
    /// opened on day 0 closes on day `max_holding_days`, not the day after.
    pub max_holding_days: usize,
}

impl ExitRules {
    /// First matching condition wins; `None` keeps the position open.
    pub fn evaluate(
        &self,
        position: &Position,
        day: usize,
        zscore: f64,
        price_a: f64,
        price_b: f64,
    ) -> Option<ExitReason> {
        if position.holding_days(day) >= self.max_holding_days {
            return Some(ExitReason::MaxHoldingPeriod);
        }

        let unrealized = position.unrealized_pnl(price_a, price_b);
        if unrealized < -self.stop_loss_pct * position.capital_allocated {
            return Some(ExitReason::StopLoss);
        }

        match position.strategy {
            StrategyKind::MeanReversion => {
                if zscore.abs() < self.exit_threshold {
                    return Some(ExitReason::MeanReversionTarget);
                }
            }
            StrategyKind::Momentum => {
                // A z-score landing exactly on zero counts as a reversal.
                if zscore == 0.0 || zscore.signum() != position.entry_zscore.signum() {
                    return Some(ExitReason::MomentumReversal);
                }
            }
        }

        None
    }
}

/// Portfolio: cash, open positions, closed-trade history, equity curve.
#[derive(Debug)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    cost_model: CostModel,
    open_positions: Vec<Position>,
    closed_trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
    peak_equity: f64,
    next_position_id: u64,
}

impl Portfolio {
    pub fn new(initial_capital: f64, cost_model: CostModel) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            cost_model,
            open_positions: Vec::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity: initial_capital,
            next_position_id: 1,
        }
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Whether the book can take another position.
    pub fn has_capacity(&self) -> bool {
        self.open_positions.len() < MAX_OPEN_POSITIONS
    }

    /// Sum of leveraged mark-to-market PnL across open positions.
    pub fn unrealized_pnl(&self, price_a: f64, price_b: f64) -> f64 {
        self.open_positions
            .iter()
            .map(|p| p.unrealized_pnl(price_a, price_b))
            .sum()
    }

    /// Cash plus the carrying value of every open position.
    pub fn equity(&self, price_a: f64, price_b: f64) -> f64 {
        self.cash
            + self
                .open_positions
                .iter()
                .map(|p| p.carrying_value(price_a, price_b))
                .sum::<f64>()
    }

    /// Try to open a position from an accepted signal and sizing.
    ///
    /// Returns the new position id, or `None` when the book is full or
    /// cash cannot cover the allocation plus entry costs (both are normal
    /// no-ops, not errors).
    pub fn open_position(
        &mut self,
        day: usize,
        price_a: f64,
        price_b: f64,
        zscore: f64,
        entry: EntrySignal,
        sized: SizedEntry,
        regime: Regime,
    ) -> Option<u64> {
        if !self.has_capacity() {
            return None;
        }

        let notional = sized.capital * sized.leverage;
        let entry_costs = self.cost_model.per_side(notional);
        let debit = sized.capital + entry_costs;
        if debit > self.cash {
            debug!(debit, cash = self.cash, "entry skipped, insufficient cash");
            return None;
        }

        let position = Position::open(
            self.next_position_id,
            day,
            price_a,
            price_b,
            zscore,
            entry.direction,
            entry.strategy,
            regime,
            sized.capital,
            sized.leverage,
            entry_costs,
        );
        let id = position.id;
        self.next_position_id += 1;

        self.cash -= debit;
        debug!(
            id,
            day,
            strategy = %entry.strategy,
            direction = %entry.direction,
            capital = sized.capital,
            leverage = sized.leverage,
            "position opened"
        );
        self.open_positions.push(position);
        Some(id)
    }

    /// Evaluate exit rules for every open position and close the matches.
    /// Returns the number of positions closed.
    pub fn evaluate_exits(
        &mut self,
        day: usize,
        zscore: f64,
        price_a: f64,
        price_b: f64,
        rules: &ExitRules,
    ) -> usize {
        let exits: Vec<(u64, ExitReason)> = self
            .open_positions
            .iter()
            .filter_map(|p| {
                rules
                    .evaluate(p, day, zscore, price_a, price_b)
                    .map(|reason| (p.id, reason))
            })
            .collect();

        for (id, reason) in &exits {
            self.close_position(*id, day, price_a, price_b, *reason);
        }
        exits.len()
    }

    /// Close every remaining open position at simulation end.
    pub fn force_close_all(&mut self, day: usize, price_a: f64, price_b: f64) {
        let ids: Vec<u64> = self.open_positions.iter().map(|p| p.id).collect();
        for id in ids {
            self.close_position(id, day, price_a, price_b, ExitReason::BacktestEnd);
        }
    }

    /// Close one position: realize PnL net of exit costs, credit cash,
    /// and move it into the immutable trade history.
    fn close_position(
        &mut self,
        id: u64,
        day: usize,
        price_a: f64,
        price_b: f64,
        reason: ExitReason,
    ) {
        let Some(index) = self.open_positions.iter().position(|p| p.id == id) else {
            return;
        };
        let position = self.open_positions.remove(index);

        let gross = position.unrealized_pnl(price_a, price_b);
        // Exit costs are charged on the entry notional, independent of the
        // PnL path.
        let exit_costs = self.cost_model.per_side(position.notional());
        let net_pnl = gross - exit_costs;

        self.cash += position.capital_allocated + net_pnl;

        debug!(
            id,
            day,
            reason = %reason,
            net_pnl,
            "position closed"
        );

        self.closed_trades.push(ClosedTrade {
            id: position.id,
            entry_day: position.entry_day,
            exit_day: day,
            entry_price_a: position.entry_price_a,
            entry_price_b: position.entry_price_b,
            exit_price_a: price_a,
            exit_price_b: price_b,
            entry_zscore: position.entry_zscore,
            direction: position.direction,
            strategy: position.strategy,
            entry_regime: position.entry_regime,
            capital_allocated: position.capital_allocated,
            leverage: position.leverage,
            transaction_costs: position.transaction_costs + exit_costs,
            exit_reason: reason,
            net_pnl,
            pnl_pct: net_pnl / position.capital_allocated * 100.0,
            holding_days: position.holding_days(day),
        });
    }

    /// Append one equity-curve sample for the day.
    pub fn record_equity(&mut self, day: usize, price_a: f64, price_b: f64) {
        let equity = self.equity(price_a, price_b);
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        let drawdown_pct = if self.peak_equity > 0.0 {
            (self.peak_equity - equity) / self.peak_equity * 100.0
        } else {
            0.0
        };

        self.equity_curve.push(EquityPoint {
            day,
            equity,
            cash: self.cash,
            unrealized_pnl: self.unrealized_pnl(price_a, price_b),
            drawdown_pct,
            open_positions: self.open_positions.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn mr_entry() -> EntrySignal {
        EntrySignal {
            direction: Direction::ShortALongB,
            strategy: StrategyKind::MeanReversion,
            strength: 1.0,
        }
    }

    fn momentum_entry() -> EntrySignal {
        EntrySignal {
            direction: Direction::LongAShortB,
            strategy: StrategyKind::Momentum,
            strength: 1.0,
        }
    }

    fn sized(capital: f64, leverage: f64) -> SizedEntry {
        SizedEntry { capital, leverage }
    }

    fn rules() -> ExitRules {
        ExitRules {
            exit_threshold: 0.5,
            stop_loss_pct: 0.1,
            max_holding_days: 30,
        }
    }

    #[test]
    fn test_open_debits_allocation_plus_costs() {
        let mut portfolio = Portfolio::new(
            100_000.0,
            CostModel {
                commission_pct: 0.001,
                slippage_pct: 0.0005,
            },
        );

        let id = portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 2.0),
            Regime::HighCorrelation,
        );
        assert!(id.is_some());

        // Debit = 10_000 + 20_000 * 0.0015 = 10_030
        assert!((portfolio.cash - 89_970.0).abs() < 1e-6);
        // Entry cost is half the round trip.
        let model = CostModel {
            commission_pct: 0.001,
            slippage_pct: 0.0005,
        };
        assert!((model.round_trip(20_000.0) - 60.0).abs() < 1e-9);
        assert_eq!(portfolio.open_positions().len(), 1);
        // Equity only dropped by the entry costs.
        assert!((portfolio.equity(100.0, 50.0) - 99_970.0).abs() < 1e-6);
    }

    #[test]
    fn test_capacity_limit_is_two() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());

        for _ in 0..2 {
            assert!(portfolio
                .open_position(
                    0,
                    100.0,
                    50.0,
                    2.5,
                    mr_entry(),
                    sized(10_000.0, 1.0),
                    Regime::HighCorrelation,
                )
                .is_some());
        }
        assert!(portfolio
            .open_position(
                0,
                100.0,
                50.0,
                2.5,
                mr_entry(),
                sized(10_000.0, 1.0),
                Regime::HighCorrelation,
            )
            .is_none());
        assert_eq!(portfolio.open_positions().len(), MAX_OPEN_POSITIONS);
    }

    #[test]
    fn test_insufficient_cash_is_a_noop() {
        let mut portfolio = Portfolio::new(5_000.0, CostModel::zero());
        assert!(portfolio
            .open_position(
                0,
                100.0,
                50.0,
                2.5,
                mr_entry(),
                sized(6_000.0, 1.0),
                Regime::HighCorrelation,
            )
            .is_none());
        assert!((portfolio.cash - 5_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_close_credits_capital_plus_net_pnl() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            -2.5,
            momentum_entry(),
            sized(10_000.0, 2.0),
            Regime::LowCorrelation,
        );

        // A +10%, B flat: combined 10% on 20k notional = 2000
        portfolio.force_close_all(5, 110.0, 50.0);

        assert_eq!(portfolio.open_positions().len(), 0);
        assert_eq!(portfolio.closed_trades().len(), 1);

        let trade = &portfolio.closed_trades()[0];
        assert_eq!(trade.exit_reason, ExitReason::BacktestEnd);
        assert_eq!(trade.exit_day, 5);
        assert_eq!(trade.holding_days, 5);
        assert!((trade.net_pnl - 2_000.0).abs() < 1e-6);
        assert!((trade.pnl_pct - 20.0).abs() < 1e-6);
        assert!((portfolio.cash - 102_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_exit_priority_max_holding_beats_target() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 1.0),
            Regime::HighCorrelation,
        );

        // Both max-holding and the mean-reversion target hold at day 30;
        // the holding-period rule wins.
        let closed = portfolio.evaluate_exits(30, 0.0, 100.0, 50.0, &rules());
        assert_eq!(closed, 1);
        assert_eq!(
            portfolio.closed_trades()[0].exit_reason,
            ExitReason::MaxHoldingPeriod
        );
    }

    #[test]
    fn test_max_holding_boundary_is_inclusive() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 1.0),
            Regime::HighCorrelation,
        );

        // Day 29: 29 days held, below the 30-day maximum, no other exit
        // condition fires.
        assert_eq!(portfolio.evaluate_exits(29, 1.0, 100.0, 50.0, &rules()), 0);
        // Day 30: holding equals the maximum, which closes the position.
        assert_eq!(portfolio.evaluate_exits(30, 1.0, 100.0, 50.0, &rules()), 1);
        assert_eq!(
            portfolio.closed_trades()[0].exit_reason,
            ExitReason::MaxHoldingPeriod
        );
        assert_eq!(portfolio.closed_trades()[0].holding_days, 30);
    }

    #[test]
    fn test_stop_loss_beats_strategy_exit() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 2.0),
            Regime::HighCorrelation,
        );

        // ShortALongB loses when A rallies: A +10%, B flat gives -2000 on
        // 20k notional, well past the 10% of capital stop.
        let closed = portfolio.evaluate_exits(3, 0.1, 110.0, 50.0, &rules());
        assert_eq!(closed, 1);
        assert_eq!(portfolio.closed_trades()[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_mean_reversion_target_exit() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 1.0),
            Regime::HighCorrelation,
        );

        assert_eq!(portfolio.evaluate_exits(3, 1.0, 100.0, 50.0, &rules()), 0);
        assert_eq!(portfolio.evaluate_exits(4, 0.4, 100.0, 50.0, &rules()), 1);
        assert_eq!(
            portfolio.closed_trades()[0].exit_reason,
            ExitReason::MeanReversionTarget
        );
    }

    #[test]
    fn test_momentum_reversal_exit() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            momentum_entry(),
            sized(10_000.0, 1.0),
            Regime::LowCorrelation,
        );

        // Same sign: stays open.
        assert_eq!(portfolio.evaluate_exits(2, 3.0, 100.0, 50.0, &rules()), 0);
        // Sign flip closes.
        assert_eq!(portfolio.evaluate_exits(3, -0.2, 100.0, 50.0, &rules()), 1);
        assert_eq!(
            portfolio.closed_trades()[0].exit_reason,
            ExitReason::MomentumReversal
        );
    }

    #[test]
    fn test_equity_identity_on_curve() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::default());
        portfolio.open_position(
            0,
            100.0,
            50.0,
            2.5,
            mr_entry(),
            sized(10_000.0, 2.0),
            Regime::HighCorrelation,
        );
        portfolio.record_equity(0, 101.0, 50.0);

        let point = portfolio.equity_curve().last().unwrap().clone();
        let open_capital: f64 = portfolio
            .open_positions()
            .iter()
            .map(|p| p.capital_allocated)
            .sum();
        assert!(
            (point.equity - (point.cash + open_capital + point.unrealized_pnl)).abs() < 1e-9
        );
        assert_eq!(point.open_positions, 1);
    }

    #[test]
    fn test_drawdown_tracks_running_peak() {
        let mut portfolio = Portfolio::new(100_000.0, CostModel::zero());
        portfolio.record_equity(0, 100.0, 50.0);
        portfolio.open_position(
            1,
            100.0,
            50.0,
            -2.5,
            momentum_entry(),
            sized(10_000.0, 1.0),
            Regime::LowCorrelation,
        );
        // A drops 10%: -1000 unrealized
        portfolio.record_equity(1, 90.0, 50.0);

        let point = portfolio.equity_curve().last().unwrap();
        assert!((point.drawdown_pct - 1.0).abs() < 1e-9);
    }
}
