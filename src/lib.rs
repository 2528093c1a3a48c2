//! # quotecast
//!
//! Daily stock price forecasting.
//!
//! Raw trading-day rows are normalized to a contiguous daily series, a
//! seasonal ARIMA model with an optional exogenous regressor is selected by
//! AIC, and the fitted model forecasts the following days with Gaussian
//! prediction intervals. Forecasts are scored by MAPE against held-out data.
//!
//! [`pipeline::ForecastPipeline`] ties the steps together; each step is also
//! usable on its own.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Forecast, PriceField, RawObservation, TimeSeries};
    pub use crate::error::{ErrorKind, ForecastError, Result};
    pub use crate::models::arima::{AutoARIMA, AutoARIMAConfig, ModelOrder, SARIMAX};
    pub use crate::models::Forecaster;
    pub use crate::pipeline::{ForecastPipeline, ForecastReport, ForecastRequest, PipelineConfig};
    pub use crate::source::{InMemorySource, MarketDataSource};
    pub use crate::utils::{calculate_metrics, mape, mape_overlap, AccuracyMetrics};
}
