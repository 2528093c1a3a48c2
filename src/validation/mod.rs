//! Statistical tests used to choose differencing orders.
//!
//! # Example
//!
//! ```
//! use quotecast::validation::{adf_test, ndiffs};
//!
//! let trend: Vec<f64> = (0..60).map(|i| 10.0 + 0.5 * i as f64).collect();
//! assert_eq!(ndiffs(&trend, 2), 1);
//!
//! let result = adf_test(&[1.0, 2.0, 3.0], None);
//! assert!(!result.is_stationary);
//! ```

pub mod stationarity;

pub use stationarity::{
    adf_test, ndiffs, nsdiffs, seasonal_strength, CriticalValues, StationarityResult,
};
