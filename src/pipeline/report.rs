//! Run results in plain, serializable numbers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{Forecast, ForecastPoint, RawObservation, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::ModelOrder;
use crate::transform::MovingAverage;

/// Summary of the last trading day inside the training window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviousDayInfo {
    pub previous_close: f64,
    pub previous_open: f64,
    pub previous_high: f64,
    pub volume: f64,
}

impl PreviousDayInfo {
    /// Take the latest raw row dated on or before `training_end`.
    ///
    /// Rows may be unsorted.
    pub fn from_observations(rows: &[RawObservation], training_end: NaiveDate) -> Result<Self> {
        let row = rows
            .iter()
            .filter(|r| r.date <= training_end)
            .max_by_key(|r| r.date)
            .ok_or_else(|| {
                ForecastError::NotFound(format!("no trading day on or before {}", training_end))
            })?;

        Ok(Self {
            previous_close: row.close,
            previous_open: row.open,
            previous_high: row.high,
            volume: row.volume,
        })
    }
}

/// One line in a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    fn from_series(label: &str, series: &TimeSeries) -> Self {
        Self {
            label: label.to_string(),
            dates: series.timestamps().to_vec(),
            values: series.values().to_vec(),
        }
    }

    fn from_forecast(label: &str, forecast: &Forecast) -> Self {
        Self {
            label: label.to_string(),
            dates: forecast.timestamps().to_vec(),
            values: forecast.point().to_vec(),
        }
    }
}

/// Shaded confidence band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBand {
    pub level: f64,
    pub dates: Vec<NaiveDate>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Data for a single chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub title: String,
    pub series: Vec<ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<ChartBand>,
}

/// The four charts of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    /// Normalized price history.
    pub history: ChartPanel,
    /// Training window, forecast and its band.
    pub forecast: ChartPanel,
    /// Price with its moving averages.
    pub moving_averages: ChartPanel,
    /// Full history followed by the forecast.
    pub trend_forecast: ChartPanel,
}

impl ChartSet {
    pub(crate) fn build(
        history: &TimeSeries,
        training: &TimeSeries,
        forecast: &Forecast,
        indicators: &[MovingAverage],
    ) -> Self {
        let band = ChartBand {
            level: forecast.level(),
            dates: forecast.timestamps().to_vec(),
            lower: forecast.lower().to_vec(),
            upper: forecast.upper().to_vec(),
        };

        let mut averages = vec![ChartSeries::from_series("price", history)];
        averages.extend(indicators.iter().map(|ma| ChartSeries {
            label: format!("MAV_{}", ma.window),
            dates: history.timestamps().to_vec(),
            values: ma.values.clone(),
        }));

        Self {
            history: ChartPanel {
                title: "Price history".to_string(),
                series: vec![ChartSeries::from_series("price", history)],
                band: None,
            },
            forecast: ChartPanel {
                title: "Forecast".to_string(),
                series: vec![
                    ChartSeries::from_series("training", training),
                    ChartSeries::from_forecast("forecast", forecast),
                ],
                band: Some(band),
            },
            moving_averages: ChartPanel {
                title: "Moving averages".to_string(),
                series: averages,
                band: None,
            },
            trend_forecast: ChartPanel {
                title: "Trend and forecast".to_string(),
                series: vec![
                    ChartSeries::from_series("history", history),
                    ChartSeries::from_forecast("forecast", forecast),
                ],
                band: None,
            },
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub previous_day_info: PreviousDayInfo,
    pub forecast: Vec<ForecastPoint>,
    pub confidence_level: f64,
    /// MAPE in percent against the held-out tail; `None` when there was no
    /// overlap to score.
    pub accuracy_metric: Option<f64>,
    pub model: ModelOrder,
    pub aic: f64,
    pub training_end: NaiveDate,
    pub indicators: Vec<MovingAverage>,
    pub charts: ChartSet,
}

impl ForecastReport {
    /// Serialize to the request-boundary JSON shape.
    ///
    /// Non-finite numbers (the warm-up part of a moving average) become `null`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ForecastError::InvalidParameter(format!("report serialization: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::moving_averages;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn previous_day_is_last_row_inside_training_window() {
        let rows = vec![
            RawObservation::new(date(3), 10.0, 12.0, 9.0, 11.0, 500.0),
            RawObservation::new(date(1), 8.0, 9.0, 7.0, 8.5, 300.0),
            RawObservation::new(date(5), 20.0, 21.0, 19.0, 20.5, 900.0),
        ];

        let info = PreviousDayInfo::from_observations(&rows, date(4)).unwrap();
        assert_eq!(info.previous_close, 11.0);
        assert_eq!(info.previous_open, 10.0);
        assert_eq!(info.previous_high, 12.0);
        assert_eq!(info.volume, 500.0);

        assert!(matches!(
            PreviousDayInfo::from_observations(&rows, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Err(ForecastError::NotFound(_))
        ));
    }

    #[test]
    fn chart_set_lines_up_with_inputs() {
        let history = TimeSeries::daily(date(1), (1..=12).map(f64::from).collect()).unwrap();
        let (training, _) = history.split_at(10).unwrap();
        let forecast = Forecast::new(
            training.future_timestamps(2).unwrap(),
            vec![11.0, 12.0],
            vec![10.0, 10.5],
            vec![12.0, 13.5],
            0.9,
        )
        .unwrap();
        let indicators = moving_averages(&history, &[3]).unwrap();

        let charts = ChartSet::build(&history, &training, &forecast, &indicators);

        assert_eq!(charts.history.series[0].values.len(), 12);
        assert_eq!(charts.forecast.series[0].dates.len(), 10);
        assert_eq!(charts.forecast.series[1].dates[0], date(11));
        let band = charts.forecast.band.as_ref().unwrap();
        assert_eq!(band.upper, vec![12.0, 13.5]);
        assert_eq!(band.level, 0.9);
        assert_eq!(charts.moving_averages.series[1].label, "MAV_3");
        assert_eq!(charts.moving_averages.series[1].values[2], 2.0);
        assert_eq!(charts.trend_forecast.series.len(), 2);
        assert!(charts.history.band.is_none());
    }
}
