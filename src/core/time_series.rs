//! Daily time series with calendar-date timestamps.

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};

/// A univariate series of `(date, value)` pairs.
///
/// Timestamps are strictly increasing. Missing values are represented as
/// `NaN` until the series has been normalized; see
/// [`normalize_daily`](crate::transform::normalize_daily).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series, validating lengths and timestamp ordering.
    pub fn new(timestamps: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        for w in timestamps.windows(2) {
            if w[1] <= w[0] {
                return Err(ForecastError::TimestampError(format!(
                    "timestamps must be strictly increasing ({} follows {})",
                    w[1], w[0]
                )));
            }
        }

        Ok(Self { timestamps, values })
    }

    /// Create a contiguous daily series starting at `start`.
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let timestamps = daily_range(start, values.len())?;
        Ok(Self { timestamps, values })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Value observed on `date`, if the date is part of the index.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.timestamps
            .binary_search(&date)
            .ok()
            .map(|idx| self.values[idx])
    }

    /// True if any value is NaN or infinite.
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// True if every consecutive pair of timestamps is exactly one day apart.
    pub fn is_daily_contiguous(&self) -> bool {
        self.timestamps
            .windows(2)
            .all(|w| (w[1] - w[0]).num_days() == 1)
    }

    /// Sub-series over `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "slice [{}, {}) out of range for series of length {}",
                start,
                end,
                self.len()
            )));
        }
        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Split into `[0, at)` and `[at, len)`.
    pub fn split_at(&self, at: usize) -> Result<(TimeSeries, TimeSeries)> {
        Ok((self.slice(0, at)?, self.slice(at, self.len())?))
    }

    /// The last `n` observations (the whole series if shorter).
    pub fn tail(&self, n: usize) -> TimeSeries {
        let start = self.len().saturating_sub(n);
        TimeSeries {
            timestamps: self.timestamps[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// The `horizon` calendar days following the last timestamp.
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let last = self.last_timestamp().ok_or(ForecastError::EmptyData)?;
        let start = last
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ForecastError::TimestampError(format!("no day after {}", last)))?;
        daily_range(start, horizon)
    }
}

/// `len` consecutive calendar days beginning at `start`.
pub(crate) fn daily_range(start: NaiveDate, len: usize) -> Result<Vec<NaiveDate>> {
    let mut out = Vec::with_capacity(len);
    let mut day = start;
    for i in 0..len {
        if i > 0 {
            day = day.succ_opt().ok_or_else(|| {
                ForecastError::TimestampError(format!("calendar overflow after {}", day))
            })?;
        }
        out.push(day);
    }
    Ok(out)
}

/// Linear interpolation across interior runs of NaN.
///
/// Runs touching either end have no neighbour on one side and stay NaN.
pub(crate) fn interpolate_interior(values: &[f64]) -> Vec<f64> {
    let mut result = values.to_vec();
    let n = result.len();

    let mut i = 0;
    while i < n {
        if !result[i].is_nan() {
            i += 1;
            continue;
        }

        let start = i;
        while i < n && result[i].is_nan() {
            i += 1;
        }
        let end = i;

        if start == 0 || end == n {
            continue;
        }

        let left = result[start - 1];
        let right = result[end];
        let segments = (end - start + 1) as f64;
        for (j, idx) in (start..end).enumerate() {
            let t = (j + 1) as f64 / segments;
            result[idx] = left + t * (right - left);
        }
    }

    result
}
