//! Unit-root and seasonality tests used to choose differencing orders.

use crate::models::arima::{difference, seasonal_difference};
use crate::utils::ols::ols_fit;
use crate::utils::stats::{is_constant, variance};

/// Shortest series the ADF regression is run on.
const MIN_ADF_LEN: usize = 8;

/// Seasonal strength above which a seasonal difference is taken.
const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Result of a stationarity test.
#[derive(Debug, Clone)]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value (approximate)
    pub p_value: f64,
    /// Number of lagged differences in the regression
    pub lags: usize,
    /// Whether the unit-root null is rejected at 5%
    pub is_stationary: bool,
    /// Critical values at common significance levels
    pub critical_values: CriticalValues,
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Default)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

impl CriticalValues {
    /// MacKinnon (2010) response-surface critical values for the
    /// constant-only Dickey-Fuller regression with `nobs` observations.
    fn dickey_fuller_constant(nobs: usize) -> Self {
        let t = nobs as f64;
        let surface = |b0: f64, b1: f64, b2: f64| b0 + b1 / t + b2 / (t * t);
        Self {
            cv_1pct: surface(-3.43035, -6.5393, -16.786),
            cv_5pct: surface(-2.86154, -2.8903, -4.234),
            cv_10pct: surface(-2.56677, -1.5384, -2.809),
        }
    }
}

fn untestable(lags: usize) -> StationarityResult {
    StationarityResult {
        statistic: f64::NAN,
        p_value: f64::NAN,
        lags,
        is_stationary: false,
        critical_values: CriticalValues::default(),
    }
}

/// Augmented Dickey-Fuller test with a constant.
///
/// Regression: `Δy_t = α + β·y_{t-1} + Σ γ_i·Δy_{t-i} + ε_t`, `i = 1..=k`.
/// The null hypothesis is a unit root (`β = 0`); rejecting it at 5% marks the
/// series stationary. `max_lags` defaults to `⌊(n-1)^{1/3}⌋`.
pub fn adf_test(series: &[f64], max_lags: Option<usize>) -> StationarityResult {
    let n = series.len();
    if n < MIN_ADF_LEN {
        return untestable(0);
    }

    let default_lags = ((n - 1) as f64).powf(1.0 / 3.0).floor() as usize;
    let k = max_lags.unwrap_or(default_lags).min(n / 2 - 2);

    let diff = difference(series, 1);
    let mut rows = Vec::with_capacity(diff.len() - k);
    let mut y = Vec::with_capacity(diff.len() - k);
    for t in k..diff.len() {
        let mut row = Vec::with_capacity(k + 2);
        row.push(1.0);
        // diff[t] = series[t + 1] - series[t], so the lagged level is series[t]
        row.push(series[t]);
        for i in 1..=k {
            row.push(diff[t - i]);
        }
        rows.push(row);
        y.push(diff[t]);
    }

    let fit = match ols_fit(&rows, &y) {
        Ok(fit) => fit,
        Err(_) => return untestable(k),
    };

    // A perfect fit (e.g. an exact linear trend) leaves the t statistic as noise.
    let scale: f64 = y.iter().map(|v| v * v).sum();
    if fit.rss <= f64::EPSILON * scale {
        return untestable(k);
    }

    let statistic = fit.t_stat(1);
    if !statistic.is_finite() {
        return untestable(k);
    }

    let critical_values = CriticalValues::dickey_fuller_constant(y.len());
    let p_value = adf_p_value(statistic, &critical_values);
    let is_stationary = statistic < critical_values.cv_5pct;

    StationarityResult {
        statistic,
        p_value,
        lags: k,
        is_stationary,
        critical_values,
    }
}

/// Coarse p-value read off the critical values.
fn adf_p_value(stat: f64, cv: &CriticalValues) -> f64 {
    if stat < cv.cv_1pct {
        0.005
    } else if stat < cv.cv_5pct {
        0.01 + 0.04 * (stat - cv.cv_1pct) / (cv.cv_5pct - cv.cv_1pct)
    } else if stat < cv.cv_10pct {
        0.05 + 0.05 * (stat - cv.cv_5pct) / (cv.cv_10pct - cv.cv_5pct)
    } else if stat < 0.0 {
        0.10 + 0.80 * (stat - cv.cv_10pct) / -cv.cv_10pct
    } else {
        0.95
    }
}

/// Number of first differences needed to make `series` stationary.
///
/// Differences until the series is constant, the ADF test rejects a unit
/// root, or the series becomes too short to test, capped at `max_d`.
pub fn ndiffs(series: &[f64], max_d: usize) -> usize {
    let mut x = series.to_vec();
    for d in 0..max_d {
        if is_constant(&x) || x.len() < MIN_ADF_LEN || adf_test(&x, None).is_stationary {
            return d;
        }
        x = difference(&x, 1);
    }
    max_d
}

/// Strength of seasonality at `period`, in `[0, 1]`.
///
/// Classical decomposition: centred moving-average trend, per-phase mean
/// seasonal indices, remainder. Strength is
/// `max(0, 1 - var(remainder) / var(seasonal + remainder))`.
pub fn seasonal_strength(series: &[f64], period: usize) -> f64 {
    let n = series.len();
    if period < 2 || n < 2 * period {
        return 0.0;
    }

    let trend = centred_moving_average(series, period);
    let detrended: Vec<(usize, f64)> = (0..n)
        .filter(|&i| trend[i].is_finite())
        .map(|i| (i, series[i] - trend[i]))
        .collect();

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for &(i, v) in &detrended {
        sums[i % period] += v;
        counts[i % period] += 1;
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let centre = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|s| *s -= centre);

    let seasonal_plus_rem: Vec<f64> = detrended.iter().map(|&(_, v)| v).collect();
    let remainder: Vec<f64> = detrended
        .iter()
        .map(|&(i, v)| v - indices[i % period])
        .collect();

    let total = variance(&seasonal_plus_rem);
    if !(total > 0.0) {
        return 0.0;
    }
    (1.0 - variance(&remainder) / total).max(0.0)
}

fn centred_moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = vec![f64::NAN; n];
    let half = period / 2;
    if period % 2 == 1 {
        for i in half..n - half {
            out[i] = series[i - half..=i + half].iter().sum::<f64>() / period as f64;
        }
    } else {
        // 2 x m moving average: end points weighted by one half
        for i in half..n - half {
            let inner: f64 = series[i + 1 - half..i + half].iter().sum();
            let ends = 0.5 * (series[i - half] + series[i + half]);
            out[i] = (inner + ends) / period as f64;
        }
    }
    out
}

/// Number of seasonal differences at `period`, capped at `max_cap_d`.
pub fn nsdiffs(series: &[f64], period: usize, max_cap_d: usize) -> usize {
    let mut x = series.to_vec();
    for cap_d in 0..max_cap_d {
        if is_constant(&x) || seasonal_strength(&x, period) <= SEASONAL_STRENGTH_THRESHOLD {
            return cap_d;
        }
        x = seasonal_difference(&x, 1, period);
    }
    max_cap_d
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn white_noise(n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(42);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut series = vec![100.0; n];
        for i in 1..n {
            series[i] = series[i - 1] + 0.3 + rng.gen_range(-1.0..1.0);
        }
        series
    }

    #[test]
    fn adf_stationary_series() {
        let result = adf_test(&white_noise(200), None);

        assert!(result.statistic.is_finite());
        assert!(result.is_stationary);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn adf_random_walk_is_not_stationary() {
        let result = adf_test(&random_walk(300), None);

        assert!(result.statistic.is_finite());
        assert!(!result.is_stationary);
    }

    #[test]
    fn adf_short_series_is_untestable() {
        let result = adf_test(&[1.0, 2.0, 3.0], None);
        assert!(result.statistic.is_nan());
        assert!(!result.is_stationary);
    }

    #[test]
    fn adf_critical_values_are_ordered() {
        let result = adf_test(&white_noise(100), None);

        assert!(result.critical_values.cv_1pct < result.critical_values.cv_5pct);
        assert!(result.critical_values.cv_5pct < result.critical_values.cv_10pct);
    }

    #[test]
    fn ndiffs_linear_trend_needs_one() {
        let series: Vec<f64> = (10..=40).map(|v| v as f64).collect();
        assert_eq!(ndiffs(&series, 2), 1);
    }

    #[test]
    fn ndiffs_stationary_needs_none() {
        assert_eq!(ndiffs(&white_noise(200), 2), 0);
    }

    #[test]
    fn ndiffs_random_walk_needs_one() {
        assert_eq!(ndiffs(&random_walk(300), 2), 1);
    }

    #[test]
    fn ndiffs_respects_cap() {
        let series: Vec<f64> = (0..50).map(|i| (i * i * i) as f64).collect();
        assert!(ndiffs(&series, 1) <= 1);
        assert_eq!(ndiffs(&series, 0), 0);
    }

    #[test]
    fn seasonal_strength_detects_weekly_cycle() {
        let series: Vec<f64> = (0..140)
            .map(|i| 50.0 + 10.0 * (2.0 * PI * i as f64 / 7.0).sin())
            .collect();
        assert!(seasonal_strength(&series, 7) > 0.9);
        assert_eq!(nsdiffs(&series, 7, 1), 1);
    }

    #[test]
    fn seasonal_strength_ignores_noise() {
        let series = white_noise(140);
        assert!(seasonal_strength(&series, 7) < SEASONAL_STRENGTH_THRESHOLD);
        assert_eq!(nsdiffs(&series, 7, 1), 0);
    }

    #[test]
    fn seasonal_strength_short_series() {
        assert_eq!(seasonal_strength(&[1.0, 2.0, 3.0], 7), 0.0);
    }
}
