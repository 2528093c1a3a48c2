//! Error types for the quotecast library.

use std::fmt;
use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Coarse classification of a [`ForecastError`].
///
/// Callers branch on this rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed, insufficient or misaligned input.
    Data,
    /// No candidate model could be fitted.
    Convergence,
    /// The order search ran out of time without a usable model.
    Timeout,
    /// A collaborator (market data provider) failed.
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Data => "DataError",
            ErrorKind::Convergence => "ConvergenceError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Upstream => "UpstreamError",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during forecasting operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Missing values that cannot be filled.
    #[error("missing values: {0}")]
    MissingValues(String),

    /// A zero actual value makes a percentage error undefined.
    #[error("actual value is zero at {0}; percentage error is undefined")]
    ZeroActual(String),

    /// The requested symbol or window has no data.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Every candidate order failed to fit.
    #[error("no candidate model converged: {0}")]
    Convergence(String),

    /// The search deadline passed before any candidate converged.
    #[error("order search exceeded its deadline after {elapsed_ms} ms with no converged model")]
    Timeout { elapsed_ms: u128 },

    /// Market data provider failure, passed through unchanged.
    #[error("market data provider failed: {0}")]
    Upstream(String),
}

impl ForecastError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::Convergence(_) => ErrorKind::Convergence,
            ForecastError::Timeout { .. } => ErrorKind::Timeout,
            ForecastError::Upstream(_) => ErrorKind::Upstream,
            _ => ErrorKind::Data,
        }
    }
}
