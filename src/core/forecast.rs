//! Forecast result structure for holding predictions.

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Point forecasts with a confidence band for consecutive future days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    timestamps: Vec<NaiveDate>,
    point: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    level: f64,
}

impl Forecast {
    /// Assemble a forecast, checking that all columns line up and that every
    /// bound brackets its point estimate.
    pub fn new(
        timestamps: Vec<NaiveDate>,
        point: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Result<Self> {
        let n = timestamps.len();
        for len in [point.len(), lower.len(), upper.len()] {
            if len != n {
                return Err(ForecastError::DimensionMismatch {
                    expected: n,
                    got: len,
                });
            }
        }

        for i in 0..n {
            if !(lower[i] <= point[i] && point[i] <= upper[i]) {
                return Err(ForecastError::InvalidParameter(format!(
                    "interval [{}, {}] does not bracket {} at {}",
                    lower[i], upper[i], point[i], timestamps[i]
                )));
            }
        }

        Ok(Self {
            timestamps,
            point,
            lower,
            upper,
            level,
        })
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Point predictions.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Confidence level of the band, e.g. `0.95`.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Width of the band at each step.
    pub fn interval_widths(&self) -> Vec<f64> {
        self.upper
            .iter()
            .zip(&self.lower)
            .map(|(u, l)| u - l)
            .collect()
    }

    /// Row-wise view of the forecast.
    pub fn entries(&self) -> Vec<ForecastPoint> {
        (0..self.horizon())
            .map(|i| ForecastPoint {
                date: self.timestamps[i],
                point: self.point[i],
                lower: self.lower[i],
                upper: self.upper[i],
            })
            .collect()
    }
}
