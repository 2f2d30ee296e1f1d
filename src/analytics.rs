//! Result reporting and export.

use crate::engine::BacktestResult;
use crate::types::ClosedTrade;
use colored::Colorize;
use tabled::{builder::Builder, settings::Style};

/// Format results for terminal display.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Print a comprehensive results report to stdout.
    pub fn print_report(result: &BacktestResult) {
        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " PAIRS BACKTEST RESULTS ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();

        // Overview
        println!("{}", "Overview".bold().underline());
        println!(
            "  Pair:            {} / {}",
            result.symbols[0], result.symbols[1]
        );
        println!("  Trading Days:    {}", result.trading_days);
        println!("  Hedge Ratio:     {:.4}", result.hedge_ratio);
        println!(
            "  Window:          {} days",
            result.config.correlation_window
        );
        println!();

        // Performance
        println!("{}", "Performance".bold().underline());
        println!("  Initial Capital: ${:>12.2}", result.initial_capital);
        println!(
            "  Final Equity:    ${:>12.2}  {}",
            result.final_equity,
            Self::format_pct_change(result.total_return_pct)
        );
        println!("  Total Return:    {:>12.2}%", result.total_return_pct);
        println!("  Max Drawdown:    {:>12.2}%", -result.max_drawdown_pct);
        println!();

        // Trade Statistics
        println!("{}", "Trade Statistics".bold().underline());
        println!("  Total Trades:    {:>12}", result.total_trades);
        println!(
            "  Winning Trades:  {:>12}  ({:.1}%)",
            result.winning_trades, result.win_rate
        );
        println!("  Losing Trades:   {:>12}", result.losing_trades);
        println!("  Average Win:     ${:>11.2}", result.avg_win);
        println!("  Average Loss:    ${:>11.2}", result.avg_loss);
        if result.profit_factor.is_finite() {
            println!("  Profit Factor:   {:>12.2}", result.profit_factor);
        } else {
            println!("  Profit Factor:   {:>12}", "inf");
        }
        println!();

        Self::print_regime_table(result);
        println!();
        println!("{}", "═".repeat(60).blue());
    }

    /// Print the per-regime breakdown as a table.
    pub fn print_regime_table(result: &BacktestResult) {
        println!("{}", "Regime Breakdown".bold().underline());

        let mut builder = Builder::new();
        builder.push_record(["Regime", "Days", "Days %", "Trades", "Total P&L", "Avg P&L"]);

        for stats in &result.regime_stats {
            builder.push_record([
                stats.regime.to_string(),
                stats.days.to_string(),
                format!("{:.1}%", stats.days_pct),
                stats.trades.to_string(),
                format!("{:+.2}", stats.total_pnl),
                format!("{:+.2}", stats.avg_pnl),
            ]);
        }

        let table = builder.build().with(Style::rounded()).to_string();
        println!("{}", table);
    }

    /// Print the most recent closed trades, newest last.
    pub fn print_trades(trades: &[ClosedTrade], limit: usize) {
        if trades.is_empty() {
            println!("No closed trades.");
            return;
        }

        let start = if limit > 0 && limit < trades.len() {
            trades.len() - limit
        } else {
            0
        };
        let shown = &trades[start..];

        let mut builder = Builder::new();
        builder.push_record([
            "#", "Strategy", "Direction", "Entry", "Exit", "Days", "Exit Reason", "P&L", "P&L %",
        ]);

        for trade in shown {
            builder.push_record([
                trade.id.to_string(),
                trade.strategy.to_string(),
                trade.direction.to_string(),
                trade.entry_day.to_string(),
                trade.exit_day.to_string(),
                trade.holding_days.to_string(),
                trade.exit_reason.to_string(),
                format!("{:+.2}", trade.net_pnl),
                format!("{:+.2}%", trade.pnl_pct),
            ]);
        }

        let table = builder.build().with(Style::rounded()).to_string();
        println!("{}", table);

        if start > 0 {
            println!("... {} earlier trades not shown", start);
        }
    }

    /// Export results to pretty-printed JSON.
    pub fn to_json(result: &BacktestResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Export the headline metrics as one CSV line.
    pub fn to_csv_line(result: &BacktestResult) -> String {
        format!(
            "{},{},{:.2},{:.2},{:.2},{:.4},{},{},{:.1},{:.2}",
            result.symbols[0],
            result.symbols[1],
            result.initial_capital,
            result.final_equity,
            result.total_return_pct,
            result.hedge_ratio,
            result.trading_days,
            result.total_trades,
            result.win_rate,
            result.max_drawdown_pct
        )
    }

    /// Get CSV header matching [`Self::to_csv_line`].
    pub fn csv_header() -> &'static str {
        "symbol_a,symbol_b,initial_capital,final_equity,total_return_pct,hedge_ratio,trading_days,total_trades,win_rate,max_drawdown_pct"
    }

    /// Format percentage change with color.
    fn format_pct_change(pct: f64) -> String {
        if pct >= 0.0 {
            format!("(+{:.2}%)", pct).green().to_string()
        } else {
            format!("({:.2}%)", pct).red().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BacktestConfig, Engine};
    use crate::portfolio::CostModel;
    use crate::types::PairSeries;

    fn sample_result() -> BacktestResult {
        let config = BacktestConfig {
            show_progress: false,
            cost_model: CostModel::zero(),
            ..Default::default()
        };
        let prices_a: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 4.0 + i as f64 * 0.05)
            .collect();
        let prices_b: Vec<f64> = (0..120)
            .map(|i| 60.0 + (i as f64 * 0.9).cos() * 2.0 + i as f64 * 0.03)
            .collect();
        let pair = PairSeries::new("GLD", "SLV", prices_a, prices_b).unwrap();
        Engine::new(config).run(&pair).unwrap()
    }

    #[test]
    fn test_json_export_round_trips() {
        let result = sample_result();
        let json = ResultFormatter::to_json(&result);
        assert!(json.contains("GLD"));

        let parsed: BacktestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_trades, result.total_trades);
        assert_eq!(parsed.trading_days, result.trading_days);
    }

    #[test]
    fn test_csv_line_matches_header() {
        let result = sample_result();
        let line = ResultFormatter::to_csv_line(&result);
        assert_eq!(
            line.split(',').count(),
            ResultFormatter::csv_header().split(',').count()
        );
        assert!(line.starts_with("GLD,SLV,"));
    }
}
