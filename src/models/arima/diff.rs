//! Differencing utilities for ARIMA models.
//!
//! Regular and seasonal differencing are both expressed through the
//! differencing polynomial `δ(B) = (1 - B)^d (1 - B^m)^D`. Its lag
//! coefficients drive both the forward transform and the integration of
//! forecasts back to the original scale.

/// Apply differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Differencing order (number of times to difference)
///
/// # Returns
/// The differenced series.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    if d == 0 || series.is_empty() {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply seasonal differencing to a time series.
///
/// # Arguments
/// * `series` - The input series
/// * `d` - Seasonal differencing order
/// * `period` - Seasonal period
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if d == 0 || period == 0 || series.len() <= period {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            break;
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Multiply two polynomials given by their coefficients in ascending powers.
pub(crate) fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Lag coefficients `δ_1..δ_k` of the differencing operator, so that
/// `w_t = y_t - Σ δ_i y_{t-i}` and, inversely, `y_t = w_t + Σ δ_i y_{t-i}`.
///
/// The result has length `d + D·m`; it is empty when no differencing is
/// applied.
pub fn differencing_polynomial(d: usize, cap_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..cap_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }
    poly.iter().skip(1).map(|c| -c).collect()
}

/// Apply the differencing operator with lag coefficients `delta`.
///
/// Output length is `series.len() - delta.len()` (empty if the series is
/// too short).
pub fn apply_differencing(series: &[f64], delta: &[f64]) -> Vec<f64> {
    let k = delta.len();
    if series.len() <= k {
        return vec![];
    }
    (k..series.len())
        .map(|t| {
            series[t]
                - delta
                    .iter()
                    .enumerate()
                    .map(|(i, c)| c * series[t - 1 - i])
                    .sum::<f64>()
        })
        .collect()
}

/// Extend `history` by integrating differenced values `w`.
///
/// Returns only the new values, `y_{n+h} = w_h + Σ δ_i y_{n+h-i}`.
pub fn integrate(w: &[f64], history: &[f64], delta: &[f64]) -> Vec<f64> {
    let mut extended = history.to_vec();
    extended.reserve(w.len());
    for &value in w {
        let t = extended.len();
        let carried: f64 = delta
            .iter()
            .enumerate()
            .map(|(i, c)| c * extended[t - 1 - i])
            .sum();
        extended.push(value + carried);
    }
    extended.split_off(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn difference_order_0() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(difference(&series, 0), series);
    }

    #[test]
    fn difference_order_1() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn difference_order_2() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        // First diff: [2, 3, 4, 5]
        assert_eq!(difference(&series, 2), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn difference_empty() {
        let series: Vec<f64> = vec![];
        assert!(difference(&series, 1).is_empty());
    }

    #[test]
    fn seasonal_difference_basic() {
        // Weekly pattern shifted up by 10 in the second week
        let series = vec![
            100.0, 120.0, 80.0, 90.0, 95.0, 70.0, 60.0, //
            110.0, 130.0, 90.0, 100.0, 105.0, 80.0, 70.0,
        ];
        assert_eq!(seasonal_difference(&series, 1, 7), vec![10.0; 7]);
    }

    #[test]
    fn seasonal_difference_order_0() {
        let series = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(seasonal_difference(&series, 0, 2), series);
    }

    #[test]
    fn polynomial_for_first_difference() {
        assert_eq!(differencing_polynomial(1, 0, 0), vec![1.0]);
        assert_eq!(differencing_polynomial(2, 0, 0), vec![2.0, -1.0]);
        assert!(differencing_polynomial(0, 0, 7).is_empty());
    }

    #[test]
    fn polynomial_for_seasonal_and_regular() {
        // (1 - B)(1 - B^3) = 1 - B - B^3 + B^4
        let delta = differencing_polynomial(1, 1, 3);
        assert_eq!(delta, vec![1.0, 0.0, 1.0, -1.0]);
    }

    #[test]
    fn apply_matches_sequential_differencing() {
        let series: Vec<f64> = (0..40)
            .map(|i| (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3 + (i % 7) as f64)
            .collect();
        let delta = differencing_polynomial(1, 1, 7);

        let direct = apply_differencing(&series, &delta);
        let sequential = difference(&seasonal_difference(&series, 1, 7), 1);

        assert_eq!(direct.len(), sequential.len());
        for (a, b) in direct.iter().zip(&sequential) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn integrate_reverses_difference() {
        let original = vec![10.0, 12.0, 15.0, 19.0, 24.0];
        let delta = differencing_polynomial(1, 0, 0);
        let integrated = integrate(&[6.0, 7.0], &original, &delta);

        // Continues from the last value: 24 + 6 = 30, 30 + 7 = 37
        assert_relative_eq!(integrated[0], 30.0, epsilon = 1e-10);
        assert_relative_eq!(integrated[1], 37.0, epsilon = 1e-10);
    }

    #[test]
    fn integrate_order_2_continues_quadratic() {
        let original: Vec<f64> = (0..6).map(|i| (i * i) as f64).collect();
        let delta = differencing_polynomial(2, 0, 0);
        let integrated = integrate(&[2.0, 2.0], &original, &delta);
        assert_eq!(integrated, vec![36.0, 49.0]);
    }

    #[test]
    fn integrate_without_differencing_is_identity() {
        assert_eq!(integrate(&[1.5, 2.5], &[9.0], &[]), vec![1.5, 2.5]);
    }
}
