//! Conversion of irregular trading-day rows into a contiguous daily series.
//!
//! Market data arrives one row per trading day. Models downstream expect one
//! value per calendar day, so the rows are reindexed onto every day between
//! the first and last date and the gaps are filled by linear interpolation
//! between the nearest known neighbours.

use crate::core::{daily_range, interpolate_interior, PriceField, RawObservation, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use tracing::debug;

/// Normalize raw observations into a daily series of the chosen column.
///
/// Rows may arrive unsorted. When two rows share a date the later one in the
/// input wins. Non-finite values count as missing.
///
/// # Errors
/// `InsufficientData` with fewer than two observations (or two distinct
/// dates), `MissingValues` when every value is missing or the first or last
/// day has no value.
pub fn normalize_daily(observations: &[RawObservation], field: PriceField) -> Result<TimeSeries> {
    if observations.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: observations.len(),
        });
    }

    let points: Vec<(NaiveDate, f64)> = observations
        .iter()
        .map(|obs| (obs.date, obs.field(field)))
        .collect();

    reindex_daily(points)
}

/// Re-apply daily reindexing and interpolation to an existing series.
///
/// A series that is already contiguous and complete comes back unchanged.
pub fn normalize_series(series: &TimeSeries) -> Result<TimeSeries> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: series.len(),
        });
    }

    let points = series
        .timestamps()
        .iter()
        .copied()
        .zip(series.values().iter().copied())
        .collect();

    reindex_daily(points)
}

fn reindex_daily(mut points: Vec<(NaiveDate, f64)>) -> Result<TimeSeries> {
    // Stable sort keeps input order among equal dates, so the last row wins below.
    points.sort_by_key(|(date, _)| *date);

    let first = points[0].0;
    let last = points[points.len() - 1].0;
    let span = (last - first).num_days() as usize + 1;

    if span < 2 {
        return Err(ForecastError::InsufficientData { needed: 2, got: 1 });
    }

    let timestamps = daily_range(first, span)?;
    let mut values = vec![f64::NAN; span];
    for (date, value) in points {
        let idx = (date - first).num_days() as usize;
        values[idx] = if value.is_finite() { value } else { f64::NAN };
    }

    let known = values.iter().filter(|v| v.is_finite()).count();
    if known == 0 {
        return Err(ForecastError::MissingValues(
            "every value in the window is missing".to_string(),
        ));
    }
    if values[0].is_nan() {
        return Err(ForecastError::MissingValues(format!(
            "no value on {} and no earlier neighbour to interpolate from",
            first
        )));
    }
    if values[span - 1].is_nan() {
        return Err(ForecastError::MissingValues(format!(
            "no value on {} and no later neighbour to interpolate from",
            last
        )));
    }

    let values = interpolate_interior(&values);
    debug!(
        start = %first,
        end = %last,
        days = span,
        filled = span - known,
        "normalized daily series"
    );

    TimeSeries::new(timestamps, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> RawObservation {
        RawObservation::new(date, close - 1.0, close + 1.0, close - 2.0, close, 1_000.0)
    }

    #[test]
    fn fills_weekend_gap_linearly() {
        // Friday 2024-01-05 to Monday 2024-01-08
        let rows = vec![bar(day(2024, 1, 5), 100.0), bar(day(2024, 1, 8), 103.0)];
        let ts = normalize_daily(&rows, PriceField::Close).unwrap();

        assert_eq!(ts.len(), 4);
        assert!(ts.is_daily_contiguous());
        assert!(!ts.has_missing_values());
        assert_relative_eq!(ts.values()[1], 101.0, epsilon = 1e-12);
        assert_relative_eq!(ts.values()[2], 102.0, epsilon = 1e-12);
    }

    #[test]
    fn sorts_unordered_rows() {
        let rows = vec![
            bar(day(2024, 1, 3), 3.0),
            bar(day(2024, 1, 1), 1.0),
            bar(day(2024, 1, 2), 2.0),
        ];
        let ts = normalize_daily(&rows, PriceField::Close).unwrap();
        assert_eq!(ts.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(ts.first_timestamp(), Some(day(2024, 1, 1)));
    }

    #[test]
    fn later_duplicate_wins() {
        let rows = vec![
            bar(day(2024, 1, 1), 1.0),
            bar(day(2024, 1, 2), 2.0),
            bar(day(2024, 1, 2), 2.5),
        ];
        let ts = normalize_daily(&rows, PriceField::Close).unwrap();
        assert_eq!(ts.values(), &[1.0, 2.5]);
    }

    #[test]
    fn selects_requested_column() {
        let rows = vec![bar(day(2024, 1, 1), 10.0), bar(day(2024, 1, 2), 20.0)];
        let ts = normalize_daily(&rows, PriceField::High).unwrap();
        assert_eq!(ts.values(), &[11.0, 21.0]);
    }

    #[test]
    fn single_observation_is_a_data_error() {
        let rows = vec![bar(day(2024, 1, 1), 10.0)];
        let err = normalize_daily(&rows, PriceField::Close).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { needed: 2, got: 1 });
    }

    #[test]
    fn same_day_twice_is_too_short() {
        let rows = vec![bar(day(2024, 1, 1), 10.0), bar(day(2024, 1, 1), 11.0)];
        assert!(matches!(
            normalize_daily(&rows, PriceField::Close),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn all_missing_is_a_data_error() {
        let rows = vec![
            bar(day(2024, 1, 1), f64::NAN),
            bar(day(2024, 1, 2), f64::NAN),
        ];
        assert!(matches!(
            normalize_daily(&rows, PriceField::Close),
            Err(ForecastError::MissingValues(_))
        ));
    }

    #[test]
    fn missing_edge_value_is_a_data_error() {
        let rows = vec![
            bar(day(2024, 1, 1), f64::NAN),
            bar(day(2024, 1, 2), 2.0),
            bar(day(2024, 1, 3), 3.0),
        ];
        assert!(matches!(
            normalize_daily(&rows, PriceField::Close),
            Err(ForecastError::MissingValues(_))
        ));
    }

    #[test]
    fn normalizing_twice_is_identity() {
        let rows = vec![
            bar(day(2024, 1, 1), 10.0),
            bar(day(2024, 1, 4), 13.0),
            bar(day(2024, 1, 5), 12.0),
            bar(day(2024, 1, 9), 16.0),
        ];
        let once = normalize_daily(&rows, PriceField::Close).unwrap();
        let twice = normalize_series(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_series_fills_gappy_series() {
        let ts = TimeSeries::new(vec![day(2024, 1, 1), day(2024, 1, 3)], vec![1.0, 3.0]).unwrap();
        let filled = normalize_series(&ts).unwrap();
        assert_eq!(filled.values(), &[1.0, 2.0, 3.0]);
    }
}
