//! Trailing window statistics used as descriptive trend indicators.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use serde::Serialize;

/// Trailing rolling mean.
///
/// Position `i` averages `series[i + 1 - window..=i]`; the first
/// `window - 1` positions are NaN.
pub fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum: f64 = series[..window].iter().sum();
    result[window - 1] = sum / window as f64;
    for i in window..n {
        sum += series[i] - series[i - window];
        result[i] = sum / window as f64;
    }

    result
}

/// Mean of the last `window` values (all of them if the slice is shorter).
pub fn trailing_mean(series: &[f64], window: usize) -> Result<f64> {
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if window == 0 {
        return Err(ForecastError::InvalidParameter(
            "trailing window must be positive".to_string(),
        ));
    }
    let tail = &series[series.len().saturating_sub(window)..];
    Ok(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// A moving average aligned with the series it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    /// Window length in days.
    pub window: usize,
    /// One value per input timestamp; NaN until the window is full.
    pub values: Vec<f64>,
}

/// Compute one trailing moving average per requested window.
pub fn moving_averages(series: &TimeSeries, windows: &[usize]) -> Result<Vec<MovingAverage>> {
    windows
        .iter()
        .map(|&window| {
            if window == 0 {
                return Err(ForecastError::InvalidParameter(
                    "moving average window must be positive".to_string(),
                ));
            }
            Ok(MovingAverage {
                window,
                values: rolling_mean(series.values(), window),
            })
        })
        .collect()
}
