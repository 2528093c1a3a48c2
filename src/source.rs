//! Market data collaborators.
//!
//! The pipeline never performs I/O itself; it asks a [`MarketDataSource`] for
//! raw daily rows. Provider failures should be reported as
//! [`ForecastError::Upstream`](crate::error::ForecastError::Upstream) and are
//! passed through without retry.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::core::RawObservation;
use crate::error::Result;

/// Source of historical daily price rows.
pub trait MarketDataSource: Send + Sync {
    /// Provider name, used in logs.
    fn name(&self) -> &str;

    /// Daily rows for `symbol` with `start <= date <= end`.
    ///
    /// An unknown symbol or an empty window yields an empty vector.
    fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>>;
}

/// Market data held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: HashMap<String, Vec<RawObservation>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the rows for `symbol`.
    pub fn insert(&mut self, symbol: impl Into<String>, mut rows: Vec<RawObservation>) {
        rows.sort_by_key(|r| r.date);
        self.rows.insert(symbol.into(), rows);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_symbol(mut self, symbol: impl Into<String>, rows: Vec<RawObservation>) -> Self {
        self.insert(symbol, rows);
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }
}

impl MarketDataSource for InMemorySource {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>> {
        Ok(self
            .rows
            .get(symbol)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= start && r.date <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
