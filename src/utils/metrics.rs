//! Accuracy metrics for forecast evaluation.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use serde::Serialize;

/// Mean absolute percentage error, in percent.
///
/// `100 · mean(|actual - predicted| / |actual|)`.
///
/// # Errors
/// `EmptyData` for empty input, `DimensionMismatch` for unequal lengths,
/// `MissingValues` for a non-finite actual and `ZeroActual` when any actual
/// is zero.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let mut sum = 0.0;
    for (i, (&a, &p)) in actual.iter().zip(predicted).enumerate() {
        if !a.is_finite() {
            return Err(ForecastError::MissingValues(format!(
                "actual value at position {} is missing",
                i
            )));
        }
        if a == 0.0 {
            return Err(ForecastError::ZeroActual(format!("position {}", i)));
        }
        sum += ((a - p) / a).abs();
    }

    Ok(100.0 * sum / actual.len() as f64)
}

/// MAPE of a forecast against actual values on the timestamps both share.
///
/// # Errors
/// `EmptyData` when no forecast date is present in `actual`; otherwise the
/// same failures as [`mape`], reported by date.
pub fn mape_overlap(forecast: &Forecast, actual: &TimeSeries) -> Result<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for (date, &predicted) in forecast.timestamps().iter().zip(forecast.point()) {
        let Some(a) = actual.value_at(*date) else {
            continue;
        };
        if !a.is_finite() {
            return Err(ForecastError::MissingValues(format!(
                "actual value on {} is missing",
                date
            )));
        }
        if a == 0.0 {
            return Err(ForecastError::ZeroActual(date.to_string()));
        }
        sum += ((a - predicted) / a).abs();
        count += 1;
    }

    if count == 0 {
        return Err(ForecastError::EmptyData);
    }

    Ok(100.0 * sum / count as f64)
}

/// Accuracy metrics for evaluating forecast performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Calculate accuracy metrics between actual and predicted values.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let pairs = || actual.iter().zip(predicted.iter());

    let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let rmse = (pairs().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n).sqrt();
    let smape = pairs()
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        * 100.0
        / n;

    Ok(AccuracyMetrics {
        mae,
        rmse,
        mape: mape(actual, predicted).ok(),
        smape,
    })
}
