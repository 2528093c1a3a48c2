//! Pipeline configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{PriceField, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::AutoARIMAConfig;
use crate::transform::trailing_mean;

/// How future values of the volume regressor are filled in.
///
/// True future volume is unknown at forecast time, so any policy here is an
/// approximation; realized forecast error is larger than it would be with
/// the actual future values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExogenousPolicy {
    /// Repeat the mean of the last `window` training values.
    TrailingMean { window: usize },
}

impl Default for ExogenousPolicy {
    fn default() -> Self {
        ExogenousPolicy::TrailingMean { window: 30 }
    }
}

impl ExogenousPolicy {
    /// Future regressor values for the `horizon` days after `history`.
    pub fn future_values(&self, history: &TimeSeries, horizon: usize) -> Result<TimeSeries> {
        match *self {
            ExogenousPolicy::TrailingMean { window } => {
                let level = trailing_mean(history.values(), window)?;
                TimeSeries::new(history.future_timestamps(horizon)?, vec![level; horizon])
            }
        }
    }
}

const DEFAULT_START: NaiveDate = match NaiveDate::from_ymd_opt(2018, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default start date"),
};

const DEFAULT_END: NaiveDate = match NaiveDate::from_ymd_opt(2025, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default end date"),
};

/// Settings for one forecasting run.
///
/// Every field has a default, so a JSON document only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column modelled as the target.
    pub price_field: PriceField,
    /// Share of the normalized series used for fitting; the rest is held out
    /// for scoring.
    pub train_fraction: f64,
    /// Forecast horizon in days.
    pub horizon: usize,
    /// Confidence level of the forecast interval.
    pub confidence_level: f64,
    /// Moving average windows reported as trend indicators.
    pub moving_average_windows: Vec<usize>,
    /// Use daily volume as an exogenous regressor.
    pub volume_regressor: bool,
    /// Fill-in rule for future volume.
    pub exogenous_policy: ExogenousPolicy,
    /// Start of the history window when the request names none.
    pub default_start: NaiveDate,
    /// End of the history window when the request names none.
    pub default_end: NaiveDate,
    /// Order search settings.
    pub search: AutoARIMAConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            price_field: PriceField::Close,
            train_fraction: 0.95,
            horizon: 30,
            confidence_level: 0.95,
            moving_average_windows: vec![10, 50],
            volume_regressor: true,
            exogenous_policy: ExogenousPolicy::default(),
            default_start: DEFAULT_START,
            default_end: DEFAULT_END,
            search: AutoARIMAConfig::default()
                .with_max_orders(7, 2, 7)
                .with_seasonal_period(7)
                .with_seasonal_differencing(1),
        }
    }
}

impl PipelineConfig {
    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the training share of the series.
    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    /// Set the confidence level.
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    /// Enable or disable the volume regressor.
    pub fn with_volume_regressor(mut self, enabled: bool) -> Self {
        self.volume_regressor = enabled;
        self
    }

    /// Replace the order search settings.
    pub fn with_search(mut self, search: AutoARIMAConfig) -> Self {
        self.search = search;
        self
    }

    /// Set the default history window.
    pub fn with_default_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.default_start = start;
        self.default_end = end;
        self
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ForecastError::InvalidParameter(format!("pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_fraction must lie in (0, 1], got {}",
                self.train_fraction
            )));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence_level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.moving_average_windows.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "moving average windows must be positive".to_string(),
            ));
        }
        if self.default_start > self.default_end {
            return Err(ForecastError::InvalidParameter(format!(
                "default window starts after it ends ({} > {})",
                self.default_start, self.default_end
            )));
        }
        let ExogenousPolicy::TrailingMean { window } = self.exogenous_policy;
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "exogenous trailing window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::arima::Differencing;

    #[test]
    fn defaults_follow_daily_stock_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.train_fraction, 0.95);
        assert_eq!(config.horizon, 30);
        assert_eq!(config.moving_average_windows, vec![10, 50]);
        assert_eq!(config.search.seasonal_period, 7);
        assert_eq!(config.search.cap_d, Differencing::Fixed(1));
        assert_eq!(config.default_start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(config.default_end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config = PipelineConfig::from_json(
            r#"{
                "horizon": 7,
                "price_field": "open",
                "volume_regressor": false,
                "exogenous_policy": {"kind": "trailing_mean", "window": 5},
                "search": {"max_p": 2, "stepwise": false}
            }"#,
        )
        .unwrap();

        assert_eq!(config.horizon, 7);
        assert_eq!(config.price_field, PriceField::Open);
        assert!(!config.volume_regressor);
        assert_eq!(config.exogenous_policy, ExogenousPolicy::TrailingMean { window: 5 });
        assert_eq!(config.search.max_p, 2);
        assert!(!config.search.stepwise);
        assert_eq!(config.train_fraction, 0.95);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(PipelineConfig::from_json(r#"{"horizon": 0}"#).is_err());
        assert!(PipelineConfig::default().with_train_fraction(0.0).validate().is_err());
        assert!(PipelineConfig::default().with_confidence_level(1.0).validate().is_err());
        assert!(PipelineConfig::from_json("not json").is_err());
    }

    #[test]
    fn trailing_mean_policy_repeats_recent_level() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let history = TimeSeries::daily(start, vec![100.0, 200.0, 300.0, 500.0]).unwrap();
        let policy = ExogenousPolicy::TrailingMean { window: 2 };

        let future = policy.future_values(&history, 3).unwrap();
        assert_eq!(future.values(), &[400.0, 400.0, 400.0]);
        assert_eq!(
            future.first_timestamp(),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
    }
}
