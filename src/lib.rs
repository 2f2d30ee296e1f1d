//! Statarb - a regime-adaptive pairs trading backtesting engine.
//!
//! # Overview
//!
//! Statarb backtests a two-legged statistical arbitrage strategy over daily
//! price data. It computes the log-price spread of the pair with a globally
//! fitted hedge ratio, classifies each day into a correlation regime, and
//! trades the spread with the strategy that regime selects:
//!
//! - **High correlation**: mean reversion, fading spread extremes
//! - **Low correlation**: momentum, following spread extremes
//! - **Transition**: no new entries
//!
//! Positions are managed by a small ledger with a fixed capacity, leverage
//! per strategy, fractional transaction costs, and prioritized exit rules
//! (holding period, stop loss, then the strategy's own exit).
//!
//! # Quick Start
//!
//! ```no_run
//! use statarb::{
//!     data::load_pair,
//!     engine::{BacktestConfig, Engine},
//! };
//!
//! let pair = load_pair("data/gld.csv", "data/slv.csv", "GLD", "SLV").unwrap();
//!
//! let config = BacktestConfig {
//!     initial_capital: 100_000.0,
//!     ..Default::default()
//! };
//! let result = Engine::new(config).run(&pair).unwrap();
//!
//! println!("Return: {:.2}%", result.total_return_pct);
//! println!("Trades: {}", result.total_trades);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Core data types (PairSeries, Position, ClosedTrade)
//! - [`stats`]: Correlation, regression, and z-score primitives
//! - [`series`]: Spread, rolling z-score, and rolling correlation
//! - [`regime`]: Correlation regime classification
//! - [`signal`]: Regime-conditioned entry signals
//! - [`sizing`]: Position sizing and leverage
//! - [`portfolio`]: Cash accounting and the position ledger
//! - [`engine`]: Backtest execution engine
//! - [`analytics`]: Result reporting and export
//! - [`data`]: CSV price loading
//! - [`config`]: TOML configuration file support

pub mod analytics;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod portfolio;
pub mod regime;
pub mod series;
pub mod signal;
pub mod sizing;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use engine::{BacktestConfig, BacktestResult, Engine};
pub use error::{BacktestError, Result};
pub use portfolio::{CostModel, ExitRules, Portfolio, MAX_OPEN_POSITIONS};
pub use regime::{Regime, RegimeBreakdown, RegimeClassifier};
pub use series::DerivedSeries;
pub use signal::{EntrySignal, Signal, SignalGenerator};
pub use sizing::{PositionSizer, SizedEntry};
pub use types::{ClosedTrade, Direction, EquityPoint, ExitReason, PairSeries, Position, StrategyKind};
