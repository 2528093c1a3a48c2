//! End-to-end forecasting run.
//!
//! A run moves raw market rows through
//! `RAW -> NORMALIZED -> FITTED -> FORECASTED -> SCORED`:
//!
//! 1. fetch daily rows from a [`MarketDataSource`],
//! 2. normalize them to one value per calendar day,
//! 3. split off the held-out tail and select a model on the rest,
//! 4. forecast past the training window,
//! 5. score the forecast against the held-out tail,
//! 6. assemble indicators and chart data into a [`ForecastReport`].
//!
//! Any failure aborts the run with a [`PipelineError`] naming the stage. There
//! are no retries and no partial results.

mod config;
mod render;
mod report;

pub use config::{ExogenousPolicy, PipelineConfig};
pub use render::{ChartRenderer, JsonChartRenderer};
pub use report::{ChartBand, ChartPanel, ChartSeries, ChartSet, ForecastReport, PreviousDayInfo};

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::core::{Forecast, PriceField, RawObservation, TimeSeries};
use crate::error::{ErrorKind, ForecastError, Result};
use crate::models::arima::AutoARIMA;
use crate::models::Forecaster;
use crate::source::MarketDataSource;
use crate::transform::{moving_averages, normalize_daily};
use crate::utils::mape_overlap;

/// Step of a run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Request,
    Fetch,
    Normalize,
    Fit,
    Forecast,
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Request => "request",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Fit => "fit",
            Stage::Forecast => "forecast",
            Stage::Score => "score",
        };
        f.write_str(name)
    }
}

/// A failed run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} stage failed ({}): {source}", .source.kind())]
pub struct PipelineError {
    pub stage: Stage,
    pub source: ForecastError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: ForecastError) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Result type for pipeline runs.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

trait AtStage<T> {
    fn at(self, stage: Stage) -> PipelineResult<T>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError::new(stage, source))
    }
}

/// What to forecast.
///
/// Missing dates fall back to the configured default window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ForecastRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Ticker and date window after applying defaults.
    pub fn resolve(&self, config: &PipelineConfig) -> Result<(String, NaiveDate, NaiveDate)> {
        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "ticker must not be empty".to_string(),
            ));
        }
        let start = self.start_date.unwrap_or(config.default_start);
        let end = self.end_date.unwrap_or(config.default_end);
        if start > end {
            return Err(ForecastError::InvalidParameter(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok((ticker.to_string(), start, end))
    }
}

/// Runs the full forecasting workflow with one configuration.
#[derive(Debug, Clone, Default)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch history for the request and run the workflow on it.
    pub fn run(
        &self,
        source: &dyn MarketDataSource,
        request: &ForecastRequest,
    ) -> PipelineResult<ForecastReport> {
        self.config.validate().at(Stage::Request)?;
        let (ticker, start, end) = request.resolve(&self.config).at(Stage::Request)?;

        let span = info_span!("forecast", ticker = %ticker, source = source.name());
        let _guard = span.enter();

        let rows = source.daily_history(&ticker, start, end).at(Stage::Fetch)?;
        if rows.is_empty() {
            return Err(PipelineError::new(
                Stage::Fetch,
                ForecastError::NotFound(format!(
                    "no data for {} between {} and {}",
                    ticker, start, end
                )),
            ));
        }
        info!(rows = rows.len(), %start, %end, "fetched market data");

        self.run_on_observations(&rows)
    }

    /// Run the workflow on rows already in hand.
    pub fn run_on_observations(&self, rows: &[RawObservation]) -> PipelineResult<ForecastReport> {
        let config = &self.config;
        config.validate().at(Stage::Request)?;

        // 1) Normalize to one value per calendar day.
        let prices = normalize_daily(rows, config.price_field).at(Stage::Normalize)?;
        let volume = if config.volume_regressor {
            Some(normalize_daily(rows, PriceField::Volume).at(Stage::Normalize)?)
        } else {
            None
        };
        info!(
            days = prices.len(),
            first = ?prices.first_timestamp(),
            last = ?prices.last_timestamp(),
            "normalized daily series"
        );

        // 2) Split off the held-out tail.
        let n_train = (prices.len() as f64 * config.train_fraction).floor() as usize;
        let (training, held_out) = prices.split_at(n_train).at(Stage::Normalize)?;
        let training_volume = match &volume {
            Some(v) => Some(v.slice(0, n_train).at(Stage::Normalize)?),
            None => None,
        };
        debug!(train = training.len(), held_out = held_out.len(), "split series");

        // 3) Select and fit the model.
        let mut model = AutoARIMA::with_config(config.search.clone());
        model
            .fit(&training, training_volume.as_ref())
            .at(Stage::Fit)?;
        let order = model.selected_order().ok_or(ForecastError::FitRequired).at(Stage::Fit)?;
        let aic = model.aic().ok_or(ForecastError::FitRequired).at(Stage::Fit)?;
        info!(%order, aic, "selected model");

        // 4) Forecast past the training window.
        let future_volume = match &training_volume {
            Some(v) => Some(
                config
                    .exogenous_policy
                    .future_values(v, config.horizon)
                    .at(Stage::Forecast)?,
            ),
            None => None,
        };
        let forecast = model
            .predict_with_intervals(config.horizon, config.confidence_level, future_volume.as_ref())
            .at(Stage::Forecast)?;
        info!(horizon = forecast.horizon(), "forecast produced");

        // 5) Score against whatever part of the held-out tail the forecast covers.
        let accuracy_metric = score(&forecast, &held_out).at(Stage::Score)?;
        match accuracy_metric {
            Some(value) => info!(mape = value, "scored forecast"),
            None => info!("no held-out overlap; accuracy unavailable"),
        }

        // 6) Indicators, previous-day summary and charts.
        let training_end = training
            .last_timestamp()
            .ok_or(ForecastError::EmptyData)
            .at(Stage::Fit)?;
        let indicators =
            moving_averages(&prices, &config.moving_average_windows).at(Stage::Score)?;
        let previous_day_info =
            PreviousDayInfo::from_observations(rows, training_end).at(Stage::Score)?;
        let charts = ChartSet::build(&prices, &training, &forecast, &indicators);

        Ok(ForecastReport {
            previous_day_info,
            forecast: forecast.entries(),
            confidence_level: forecast.level(),
            accuracy_metric,
            model: order,
            aic,
            training_end,
            indicators,
            charts,
        })
    }
}

fn score(forecast: &Forecast, held_out: &TimeSeries) -> Result<Option<f64>> {
    if held_out.is_empty() {
        return Ok(None);
    }
    match mape_overlap(forecast, held_out) {
        Ok(value) => Ok(Some(value)),
        Err(ForecastError::EmptyData) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::AutoARIMAConfig;
    use crate::source::InMemorySource;

    fn rows(n: usize) -> Vec<RawObservation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                let date = start + chrono::Duration::days(i as i64);
                let volume = 1_000.0 + (i % 5) as f64;
                RawObservation::new(date, close - 0.5, close + 1.0, close - 1.0, close, volume)
            })
            .collect()
    }

    fn quick_config() -> PipelineConfig {
        PipelineConfig::default()
            .with_horizon(5)
            .with_train_fraction(0.9)
            .with_volume_regressor(false)
            .with_search(
                AutoARIMAConfig::default()
                    .with_max_orders(1, 1, 1)
                    .with_differencing(1),
            )
    }

    #[test]
    fn stage_error_message_names_stage_and_kind() {
        let err = PipelineError::new(Stage::Fetch, ForecastError::Upstream("timeout".into()));
        assert_eq!(
            err.to_string(),
            "fetch stage failed (UpstreamError): market data provider failed: timeout"
        );
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn request_defaults_come_from_config() {
        let config = PipelineConfig::default();
        let (ticker, start, end) = ForecastRequest::new(" ACME ").resolve(&config).unwrap();
        assert_eq!(ticker, "ACME");
        assert_eq!(start, config.default_start);
        assert_eq!(end, config.default_end);

        let bad = ForecastRequest::new("ACME").with_window(end, start);
        assert!(bad.resolve(&config).is_err());
    }

    #[test]
    fn request_json_allows_missing_fields() {
        let request: ForecastRequest = serde_json::from_str(r#"{"start_date": "2020-01-01"}"#).unwrap();
        assert_eq!(request.ticker, "");
        assert!(request.end_date.is_none());
    }

    #[test]
    fn empty_ticker_fails_before_fetch() {
        let pipeline = ForecastPipeline::new(quick_config());
        let err = pipeline
            .run(&InMemorySource::new(), &ForecastRequest::new(""))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Request);
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn linear_run_scores_held_out_tail() {
        let pipeline = ForecastPipeline::new(quick_config());
        let report = pipeline.run_on_observations(&rows(50)).unwrap();

        assert_eq!(report.forecast.len(), 5);
        assert_eq!(report.training_end, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert_eq!(report.model.d, 1);
        assert_eq!(report.previous_day_info.previous_close, 144.0);

        let mape = report.accuracy_metric.unwrap();
        assert!(mape < 1.0, "mape = {}", mape);
        assert_eq!(report.indicators.len(), 2);
    }

    #[test]
    fn full_training_window_leaves_accuracy_unavailable() {
        let config = quick_config().with_train_fraction(1.0);
        let report = ForecastPipeline::new(config).run_on_observations(&rows(40)).unwrap();
        assert!(report.accuracy_metric.is_none());
        assert!(report.to_json().unwrap().contains("\"accuracy_metric\":null"));
    }
}
