//! ARIMA and SARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - [`SARIMAX`]: seasonal ARIMA errors around an optional exogenous regression
//! - [`AutoARIMA`]: stepwise or exhaustive order selection by AIC
//! - differencing helpers shared with the stationarity tests

mod auto_arima;
mod diff;
mod model;

pub use auto_arima::{
    fit_candidate, AutoARIMA, AutoARIMAConfig, CandidateFit, Differencing, BASELINE_ORDER,
};
pub use diff::{
    apply_differencing, difference, differencing_polynomial, integrate, seasonal_difference,
};
pub use model::{ModelOrder, SARIMAX};
