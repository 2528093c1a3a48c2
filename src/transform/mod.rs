//! Transformations from raw market rows to model-ready series.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use quotecast::core::{PriceField, RawObservation};
//! use quotecast::transform::{normalize_daily, rolling_mean};
//!
//! let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
//! let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
//! let rows = vec![
//!     RawObservation::new(friday, 99.0, 101.0, 98.0, 100.0, 1e6),
//!     RawObservation::new(monday, 100.0, 104.0, 99.0, 103.0, 1e6),
//! ];
//!
//! let daily = normalize_daily(&rows, PriceField::Close).unwrap();
//! assert_eq!(daily.values(), &[100.0, 101.0, 102.0, 103.0]);
//!
//! let mav = rolling_mean(daily.values(), 2);
//! assert_eq!(mav[3], 102.5);
//! ```

pub mod normalize;
pub mod window;

pub use normalize::{normalize_daily, normalize_series};
pub use window::{moving_averages, rolling_mean, trailing_mean, MovingAverage};
