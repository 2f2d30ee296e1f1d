//! Pure statistical functions used by the series preprocessor.
//!
//! All standard deviations are population (divide by N).

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divide by N).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N).
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation coefficient.
///
/// Returns `None` when the slices are empty, have mismatched lengths, or
/// either series has zero variance, so degenerate windows never surface
/// as NaN.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some(covariance / (var_x * var_y).sqrt())
}

/// Ordinary least squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub residuals: Vec<f64>,
}

/// Fit `y` on `x` via ordinary least squares.
///
/// Returns `None` when fewer than two points are given, lengths mismatch,
/// or `x` has zero variance.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<Regression> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        covariance += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
    }

    if var_x == 0.0 {
        return None;
    }

    let slope = covariance / var_x;
    let intercept = mean_y - slope * mean_x;
    let residuals = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| y - (slope * x + intercept))
        .collect();

    Some(Regression {
        slope,
        intercept,
        residuals,
    })
}

/// Standardize `value` against a mean and standard deviation.
///
/// Defined as 0.0 when `std_dev == 0` (guards divide-by-zero, not NaN).
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (value - mean) / std_dev
}
