//! Core data structures for daily price forecasting.

mod forecast;
mod observation;
mod time_series;

pub use forecast::{Forecast, ForecastPoint};
pub use observation::{PriceField, RawObservation};
pub use time_series::TimeSeries;

pub(crate) use time_series::{daily_range, interpolate_interior};
