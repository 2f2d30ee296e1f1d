//! Property-based tests over randomly generated price paths.
//!
//! These verify that the engine's accounting and ledger invariants hold
//! for arbitrary inputs, not just hand-constructed scenarios.

use proptest::prelude::*;

use statarb::engine::{BacktestConfig, Engine};
use statarb::portfolio::CostModel;
use statarb::types::PairSeries;
use statarb::MAX_OPEN_POSITIONS;

fn quiet_config() -> BacktestConfig {
    BacktestConfig {
        show_progress: false,
        cost_model: CostModel::zero(),
        ..Default::default()
    }
}

/// Build a price path from a start price and a sequence of daily returns.
fn path(start: f64, returns: &[f64]) -> Vec<f64> {
    let mut prices = vec![start];
    for &r in returns {
        let next = prices[prices.len() - 1] * (1.0 + r);
        prices.push(next);
    }
    prices
}

/// Two legs of daily returns, long enough for the default window.
fn pair_strategy() -> impl Strategy<Value = PairSeries> {
    (
        proptest::collection::vec(-0.04f64..0.04, 80..150),
        proptest::collection::vec(-0.04f64..0.04, 80..150),
    )
        .prop_map(|(ra, rb)| {
            let len = ra.len().min(rb.len());
            let prices_a = path(100.0, &ra[..len]);
            let prices_b = path(80.0, &rb[..len]);
            PairSeries::new("AAA", "BBB", prices_a, prices_b).unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_and_accounting_invariants_hold(pair in pair_strategy()) {
        let result = Engine::new(quiet_config()).run(&pair).unwrap();

        prop_assert_eq!(result.equity_curve.len(), result.trading_days);

        for point in &result.equity_curve {
            prop_assert!(point.open_positions <= MAX_OPEN_POSITIONS);
            // Equity decomposes into cash, tied-up capital, and marks.
            let tied_up = point.equity - point.cash - point.unrealized_pnl;
            prop_assert!(tied_up >= -1e-9);
            if point.open_positions == 0 {
                prop_assert!((point.equity - point.cash).abs() < 1e-9);
                prop_assert_eq!(point.unrealized_pnl, 0.0);
            }
        }

        for trade in &result.trades {
            prop_assert!(trade.exit_day >= trade.entry_day);
            prop_assert_eq!(trade.holding_days, trade.exit_day - trade.entry_day);
            prop_assert!(trade.exit_day < result.trading_days);
            prop_assert!(trade.entry_zscore.abs() > result.config.entry_zscore);
            prop_assert!(trade.capital_allocated >= result.config.min_trade_value);
        }

        // Every position is closed by the end of the run.
        prop_assert_eq!(
            result.total_trades,
            result.winning_trades
                + result.losing_trades
                + result.trades.iter().filter(|t| t.net_pnl == 0.0).count()
        );
    }

    #[test]
    fn zero_cost_equity_reconciles(pair in pair_strategy()) {
        let result = Engine::new(quiet_config()).run(&pair).unwrap();

        let pnl_sum: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
        let expected = result.initial_capital + pnl_sum;
        prop_assert!(
            (result.final_equity - expected).abs() < 1e-6,
            "final {} vs reconciled {}",
            result.final_equity,
            expected
        );
    }

    #[test]
    fn runs_are_idempotent(pair in pair_strategy()) {
        let first = Engine::new(quiet_config()).run(&pair).unwrap();
        let second = Engine::new(quiet_config()).run(&pair).unwrap();

        prop_assert_eq!(first.equity_curve, second.equity_curve);
        prop_assert_eq!(first.total_trades, second.total_trades);
        for (a, b) in first.trades.iter().zip(&second.trades) {
            prop_assert_eq!(a.id, b.id);
            prop_assert_eq!(a.net_pnl, b.net_pnl);
            prop_assert_eq!(a.exit_reason, b.exit_reason);
        }
    }

    #[test]
    fn costs_only_reduce_final_equity(pair in pair_strategy()) {
        let free = Engine::new(quiet_config()).run(&pair).unwrap();

        let costly_config = BacktestConfig {
            show_progress: false,
            cost_model: CostModel::default(),
            ..Default::default()
        };
        let costly = Engine::new(costly_config).run(&pair).unwrap();

        // With identical trade sequences, costs strictly reduce the outcome.
        // Trade sequences can diverge once costs shift available cash, so
        // only compare when the sequences match.
        let same_sequence = free.total_trades == costly.total_trades
            && free
                .trades
                .iter()
                .zip(&costly.trades)
                .all(|(a, b)| a.entry_day == b.entry_day && a.exit_day == b.exit_day);
        if same_sequence && free.total_trades > 0 {
            prop_assert!(costly.final_equity < free.final_equity);
        }
    }
}
