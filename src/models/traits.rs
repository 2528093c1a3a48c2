//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;

/// Common interface for forecasting models with an optional exogenous
/// regressor.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the series. `exog`, when given, must share the
    /// series' timestamps.
    fn fit(&mut self, series: &TimeSeries, exog: Option<&TimeSeries>) -> Result<()>;

    /// Forecast `horizon` days past the training window with a two-sided
    /// interval at confidence `level`.
    ///
    /// Models fitted with a regressor need `future_exog` covering exactly
    /// the forecast dates.
    fn predict_with_intervals(
        &self,
        horizon: usize,
        level: f64,
        future_exog: Option<&TimeSeries>,
    ) -> Result<Forecast>;

    /// Get the fitted values (in-sample one-step predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}
