//! Series preprocessing: turns two raw price series into the day-aligned
//! spread z-score and rolling return correlation the simulation consumes.

use crate::error::{BacktestError, Result};
use crate::stats;
use crate::types::PairSeries;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-day derived statistics for a price pair.
///
/// `zscore` and `correlation` are equal-length and indexed by simulation
/// day; day `d` corresponds to raw price index `d + window`, the first
/// index at which both the spread window and the return-correlation
/// window are fully populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedSeries {
    /// OLS slope of log A on log B over the full series, fixed once.
    pub hedge_ratio: f64,
    /// Log-price spread `ln(a[t]) - hedge_ratio * ln(b[t])` for every raw day.
    pub spread: Vec<f64>,
    /// Rolling population z-score of the spread, one entry per simulation day.
    pub zscore: Vec<f64>,
    /// Rolling Pearson correlation of leg returns, one entry per simulation
    /// day. `None` marks a degenerate (zero-variance) window.
    pub correlation: Vec<Option<f64>>,
    /// Rolling window length used for both statistics.
    pub window: usize,
}

impl DerivedSeries {
    /// Compute derived statistics for a pair with rolling window `window`.
    pub fn compute(pair: &PairSeries, window: usize) -> Result<Self> {
        if window < 2 {
            return Err(BacktestError::ConfigError(format!(
                "correlation window must be at least 2, got {}",
                window
            )));
        }

        let n = pair.len();
        let required = window + 2;
        if n < required {
            return Err(BacktestError::InsufficientData {
                required,
                available: n,
            });
        }

        let log_a: Vec<f64> = pair.prices_a.iter().map(|p| p.ln()).collect();
        let log_b: Vec<f64> = pair.prices_b.iter().map(|p| p.ln()).collect();

        // Global hedge ratio: slope of log A regressed on log B. It is fixed
        // once over the full series, never re-estimated per window. A flat
        // leg B has no fit; fall back to a unit hedge so the run still
        // proceeds with neutral statistics.
        let hedge_ratio = match stats::linear_regression(&log_b, &log_a) {
            Some(fit) => fit.slope,
            None => {
                warn!(
                    symbol = %pair.symbol_b,
                    "zero log-price variance, falling back to unit hedge ratio"
                );
                1.0
            }
        };
        debug!(hedge_ratio, window, observations = n, "derived series fit");

        let spread: Vec<f64> = log_a
            .iter()
            .zip(&log_b)
            .map(|(&a, &b)| a - hedge_ratio * b)
            .collect();

        let returns_a = simple_returns(&pair.prices_a);
        let returns_b = simple_returns(&pair.prices_b);

        let days = n - window;
        let mut zscore = Vec::with_capacity(days);
        let mut correlation = Vec::with_capacity(days);

        for raw in window..n {
            // Spread window of `window` values ending at `raw`.
            let spread_window = &spread[raw + 1 - window..=raw];
            let mean = stats::mean(spread_window);
            let std = stats::std_dev(spread_window);
            zscore.push(stats::z_score(spread[raw], mean, std));

            // Return index i covers the move into raw day i + 1, so the
            // window of `window` returns ending at raw day `raw` is
            // returns[raw - window..raw].
            let corr_window_a = &returns_a[raw - window..raw];
            let corr_window_b = &returns_b[raw - window..raw];
            correlation.push(stats::correlation(corr_window_a, corr_window_b));
        }

        Ok(Self {
            hedge_ratio,
            spread,
            zscore,
            correlation,
            window,
        })
    }

    /// Number of simulation days with defined statistics.
    pub fn len(&self) -> usize {
        self.zscore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zscore.is_empty()
    }

    /// Raw price index backing simulation day `day`.
    pub fn raw_index(&self, day: usize) -> usize {
        day + self.window
    }
}

/// Simple returns `(p[t] - p[t-1]) / p[t-1]`, one entry per raw day after
/// the first.
fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PairSeries;

    fn pair_from(prices_a: Vec<f64>, prices_b: Vec<f64>) -> PairSeries {
        PairSeries::new("AAA", "BBB", prices_a, prices_b).unwrap()
    }

    #[test]
    fn test_insufficient_data() {
        let pair = pair_from(vec![100.0; 10], vec![100.0; 10]);
        let err = DerivedSeries::compute(&pair, 20).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData {
                required: 22,
                available: 10
            }
        ));
    }

    #[test]
    fn test_flat_series_falls_back_to_unit_hedge() {
        // Constant prices leave log B without variance: the hedge ratio
        // cannot be fitted, so it falls back to 1.0 and every statistic
        // stays neutral.
        let pair = pair_from(vec![100.0; 30], vec![100.0; 30]);
        let derived = DerivedSeries::compute(&pair, 5).unwrap();
        assert_eq!(derived.hedge_ratio, 1.0);
        assert!(derived.zscore.iter().all(|&z| z == 0.0));
        assert!(derived.correlation.iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_alignment_and_lengths() {
        let n = 50;
        let prices_a: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let prices_b: Vec<f64> = (0..n).map(|i| 80.0 + (i as f64 * 0.4).cos()).collect();
        let pair = pair_from(prices_a, prices_b);

        let derived = DerivedSeries::compute(&pair, 10).unwrap();
        assert_eq!(derived.len(), n - 10);
        assert_eq!(derived.zscore.len(), derived.correlation.len());
        assert_eq!(derived.spread.len(), n);
        assert_eq!(derived.raw_index(0), 10);
        assert_eq!(derived.raw_index(derived.len() - 1), n - 1);
    }

    #[test]
    fn test_identical_legs_hedge_ratio_one() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 * (1.0 + 0.01 * i as f64)).collect();
        let pair = pair_from(prices.clone(), prices);

        let derived = DerivedSeries::compute(&pair, 5).unwrap();
        assert!((derived.hedge_ratio - 1.0).abs() < 1e-9);
        // Spread is the regression intercept everywhere, so every rolling
        // window has zero std dev and z-score is defined as 0.
        for z in &derived.zscore {
            assert!(z.abs() < 1e-9);
        }
        // Identical returns correlate perfectly.
        for corr in &derived.correlation {
            assert!((corr.unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zscore_reacts_to_spread_spike() {
        let n = 40;
        let mut prices_a: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.9).sin()).collect();
        let prices_b: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.9).sin() * 0.5).collect();
        // Push leg A sharply away from the pair relationship on the last day.
        prices_a[n - 1] *= 1.2;
        let pair = pair_from(prices_a, prices_b);

        let derived = DerivedSeries::compute(&pair, 10).unwrap();
        let last = *derived.zscore.last().unwrap();
        assert!(last > 1.5, "expected a large positive z-score, got {}", last);
    }

    #[test]
    fn test_simple_returns() {
        let returns = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }
}
