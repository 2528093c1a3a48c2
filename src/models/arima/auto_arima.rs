//! Automatic ARIMA and SARIMA model selection.
//!
//! Differencing orders are chosen first (fixed by configuration or by unit
//! root / seasonal strength tests), then `(p, q)` and `(P, Q)` are searched by
//! AIC. The stepwise search is a frontier search over the bounded order
//! lattice: it fits a handful of seed orders, then repeatedly fits the
//! unvisited `±1` neighbours of the current best and stops at the first batch
//! that brings no improvement. Candidates in a batch are fitted in parallel.
//!
//! Every candidate is scored on the same observations: the likelihood starts
//! after the longest differencing plus AR span any candidate can have. The
//! [`BASELINE_ORDER`] is scored alongside as a sanity bound. It can be
//! selected, but the frontier never expands from it, so every other selected
//! order lies in the configured space.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::seasonal_difference;
use crate::models::arima::model::{check_exog_alignment, ModelOrder, SARIMAX};
use crate::models::Forecaster;
use crate::validation::stationarity::{ndiffs, nsdiffs};

/// Shortest non-seasonal series the search accepts.
const MIN_OBSERVATIONS: usize = 10;

/// Order always fitted alongside the searched candidates.
pub const BASELINE_ORDER: ModelOrder = ModelOrder {
    p: 1,
    d: 1,
    q: 0,
    cap_p: 0,
    cap_d: 0,
    cap_q: 0,
    s: 0,
};

/// How a differencing order is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Differencing {
    /// Detect from the data.
    #[default]
    Auto,
    /// Use the given order.
    Fixed(usize),
}

/// Configuration for AutoARIMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoARIMAConfig {
    /// Maximum non-seasonal AR order to consider.
    pub max_p: usize,
    /// Maximum non-seasonal MA order to consider.
    pub max_q: usize,
    /// Maximum non-seasonal differencing order (auto detection only).
    pub max_d: usize,
    /// Maximum seasonal AR order.
    pub max_cap_p: usize,
    /// Maximum seasonal MA order.
    pub max_cap_q: usize,
    /// Maximum seasonal differencing order (auto detection only).
    pub max_cap_d: usize,
    /// Seasonal period (0 or 1 for non-seasonal).
    pub seasonal_period: usize,
    /// Non-seasonal differencing.
    pub d: Differencing,
    /// Seasonal differencing.
    pub cap_d: Differencing,
    /// Use stepwise search (faster) vs exhaustive.
    pub stepwise: bool,
    /// Time budget for the whole search, measured from the start of `fit`.
    pub deadline: Option<Duration>,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_cap_p: 2,
            max_cap_q: 2,
            max_cap_d: 1,
            seasonal_period: 0,
            d: Differencing::Auto,
            cap_d: Differencing::Auto,
            stepwise: true,
            deadline: None,
        }
    }
}

impl AutoARIMAConfig {
    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// Set maximum seasonal orders.
    pub fn with_seasonal_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_cap_p = max_p;
        self.max_cap_d = max_d;
        self.max_cap_q = max_q;
        self
    }

    /// Set seasonal period.
    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    /// Fix the non-seasonal differencing order.
    pub fn with_differencing(mut self, d: usize) -> Self {
        self.d = Differencing::Fixed(d);
        self
    }

    /// Fix the seasonal differencing order.
    pub fn with_seasonal_differencing(mut self, cap_d: usize) -> Self {
        self.cap_d = Differencing::Fixed(cap_d);
        self
    }

    /// Stop searching once `deadline` has elapsed.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use exhaustive search instead of stepwise.
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }

    fn is_seasonal(&self) -> bool {
        self.seasonal_period > 1
    }
}

/// Outcome of fitting a single candidate order.
#[derive(Debug, Clone)]
pub enum CandidateFit {
    /// The fit converged with a finite AIC.
    Converged {
        order: ModelOrder,
        model: Box<SARIMAX>,
        aic: f64,
    },
    /// The fit failed; `reason` is the error message.
    Failed {
        order: ModelOrder,
        reason: String,
    },
}

impl CandidateFit {
    /// The candidate's order, converged or not.
    pub fn order(&self) -> ModelOrder {
        match self {
            CandidateFit::Converged { order, .. } | CandidateFit::Failed { order, .. } => *order,
        }
    }

    /// AIC of a converged fit; `+inf` for a failed one.
    pub fn aic(&self) -> f64 {
        match self {
            CandidateFit::Converged { aic, .. } => *aic,
            CandidateFit::Failed { .. } => f64::INFINITY,
        }
    }

    /// Whether the fit produced a usable model.
    pub fn is_converged(&self) -> bool {
        matches!(self, CandidateFit::Converged { .. })
    }
}

/// Fit one candidate order, scoring the likelihood from observation
/// `conditioning` onwards (see [`SARIMAX::with_conditioning`]).
pub fn fit_candidate(
    order: ModelOrder,
    series: &TimeSeries,
    exog: Option<&TimeSeries>,
    conditioning: usize,
) -> CandidateFit {
    let mut model = SARIMAX::new(order).with_conditioning(conditioning);
    match model.fit(series, exog) {
        Ok(()) => match model.aic() {
            Some(aic) if aic.is_finite() => CandidateFit::Converged {
                order,
                model: Box::new(model),
                aic,
            },
            _ => CandidateFit::Failed {
                order,
                reason: "non-finite AIC".to_string(),
            },
        },
        Err(e) => CandidateFit::Failed {
            order,
            reason: e.to_string(),
        },
    }
}

/// Best model found by a search.
#[derive(Debug, Clone)]
struct Selection {
    order: ModelOrder,
    model: Box<SARIMAX>,
    aic: f64,
}

/// Bookkeeping for one order search.
struct Search<'a> {
    series: &'a TimeSeries,
    exog: Option<&'a TimeSeries>,
    conditioning: usize,
    started: Instant,
    deadline: Option<Duration>,
    visited: HashSet<ModelOrder>,
    scores: Vec<(ModelOrder, f64)>,
    failures: Vec<String>,
    /// Best candidate inside the configured space.
    best: Option<Selection>,
    /// Baseline fit, kept only when it lies outside the configured space.
    baseline: Option<Selection>,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(
        series: &'a TimeSeries,
        exog: Option<&'a TimeSeries>,
        conditioning: usize,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            series,
            exog,
            conditioning,
            started: Instant::now(),
            deadline,
            visited: HashSet::new(),
            scores: Vec::new(),
            failures: Vec::new(),
            best: None,
            baseline: None,
            timed_out: false,
        }
    }

    fn best_order(&self) -> Option<ModelOrder> {
        self.best.as_ref().map(|b| b.order)
    }

    /// Fit every unvisited order of the batch in parallel and return the
    /// converged ones.
    fn fit_batch(&mut self, orders: Vec<ModelOrder>) -> Vec<Selection> {
        let fresh: Vec<ModelOrder> = orders
            .into_iter()
            .filter(|o| self.visited.insert(*o))
            .collect();
        if fresh.is_empty() {
            return Vec::new();
        }

        let (series, exog, conditioning) = (self.series, self.exog, self.conditioning);
        let (started, deadline) = (self.started, self.deadline);
        let fits: Vec<Option<CandidateFit>> = fresh
            .par_iter()
            .map(|&order| {
                if deadline.is_some_and(|limit| started.elapsed() >= limit) {
                    return None;
                }
                Some(fit_candidate(order, series, exog, conditioning))
            })
            .collect();

        let mut converged = Vec::new();
        for (order, fit) in fresh.into_iter().zip(fits) {
            match fit {
                None => {
                    debug!(%order, "candidate skipped at deadline");
                    self.timed_out = true;
                }
                Some(CandidateFit::Converged { order, model, aic }) => {
                    debug!(%order, aic, "candidate fitted");
                    self.scores.push((order, aic));
                    converged.push(Selection { order, model, aic });
                }
                Some(CandidateFit::Failed { order, reason }) => {
                    warn!(%order, %reason, "candidate skipped");
                    self.scores.push((order, f64::INFINITY));
                    self.failures.push(format!("{}: {}", order, reason));
                }
            }
        }
        converged
    }

    /// Fit a batch of orders from the configured space.
    ///
    /// Returns true if the best in-space model improved.
    fn evaluate(&mut self, orders: Vec<ModelOrder>) -> bool {
        let mut improved = false;
        for fit in self.fit_batch(orders) {
            if self.best.as_ref().map_or(true, |b| fit.aic < b.aic) {
                self.best = Some(fit);
                improved = true;
            }
        }
        improved
    }

    /// Score an order outside the configured space as a sanity bound. It
    /// competes in the final selection but is never expanded.
    fn evaluate_bound(&mut self, order: ModelOrder) {
        self.baseline = self.fit_batch(vec![order]).pop();
    }

    fn into_selection(self) -> Result<(Selection, Vec<(ModelOrder, f64)>)> {
        let elapsed_ms = self.started.elapsed().as_millis();
        if self.timed_out {
            warn!(elapsed_ms = elapsed_ms as u64, "order search deadline reached");
        }
        let mut scores = self.scores;
        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let best = match (self.best, self.baseline) {
            (Some(best), Some(baseline)) if baseline.aic < best.aic => {
                debug!(order = %baseline.order, "baseline beats configured candidates");
                Some(baseline)
            }
            (Some(best), _) => Some(best),
            (None, baseline) => baseline,
        };
        match best {
            Some(best) => Ok((best, scores)),
            None if self.timed_out => Err(ForecastError::Timeout { elapsed_ms }),
            None => Err(ForecastError::Convergence(self.failures.join("; "))),
        }
    }
}

/// Automatic ARIMA/SARIMA model selection.
///
/// Automatically selects the best ARIMA(p, d, q) or SARIMA(p, d, q)(P, D, Q)\[s\]
/// specification by AIC, optionally with one exogenous regressor. The
/// [`BASELINE_ORDER`] is always fitted too, so the selected model is never
/// worse than it. Any other selected order has the chosen `d` and `D`, the
/// configured seasonal period and orders within the configured bounds.
#[derive(Debug, Clone)]
pub struct AutoARIMA {
    /// Configuration.
    config: AutoARIMAConfig,
    /// Selected model.
    selected: Option<Selection>,
    /// All fitted models and their scores, best first.
    model_scores: Vec<(ModelOrder, f64)>,
}

impl AutoARIMA {
    /// Create a new AutoARIMA with default configuration.
    pub fn new() -> Self {
        Self::with_config(AutoARIMAConfig::default())
    }

    /// Create AutoARIMA with custom configuration.
    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self {
            config,
            selected: None,
            model_scores: Vec::new(),
        }
    }

    /// Create AutoARIMA with seasonal period.
    pub fn seasonal(period: usize) -> Self {
        Self::with_config(AutoARIMAConfig::default().with_seasonal_period(period))
    }

    pub fn config(&self) -> &AutoARIMAConfig {
        &self.config
    }

    /// Get the selected order including seasonal components.
    pub fn selected_order(&self) -> Option<ModelOrder> {
        self.selected.as_ref().map(|s| s.order)
    }

    /// The fitted model for the selected order.
    pub fn model(&self) -> Option<&SARIMAX> {
        self.selected.as_ref().map(|s| s.model.as_ref())
    }

    /// AIC of the selected model.
    pub fn aic(&self) -> Option<f64> {
        self.selected.as_ref().map(|s| s.aic)
    }

    /// Get all model scores; failed candidates score `+inf`.
    pub fn model_scores(&self) -> &[(ModelOrder, f64)] {
        &self.model_scores
    }

    fn candidate(&self, p: usize, d: usize, q: usize, cap_p: usize, cap_d: usize, cap_q: usize) -> ModelOrder {
        if self.config.is_seasonal() {
            ModelOrder::seasonal(p, d, q, cap_p, cap_d, cap_q, self.config.seasonal_period)
        } else {
            ModelOrder::new(p, d, q)
        }
    }

    /// Seed orders of the stepwise search, clipped to the configured bounds.
    fn seeds(&self, d: usize, cap_d: usize) -> Vec<ModelOrder> {
        let c = &self.config;
        let seeds: &[(usize, usize, usize, usize)] = if c.is_seasonal() {
            &[(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)]
        } else {
            &[(2, 2, 0, 0), (0, 0, 0, 0), (1, 0, 0, 0), (0, 1, 0, 0)]
        };
        seeds
            .iter()
            .map(|&(p, q, cap_p, cap_q)| {
                self.candidate(
                    p.min(c.max_p),
                    d,
                    q.min(c.max_q),
                    cap_p.min(c.max_cap_p),
                    cap_d,
                    cap_q.min(c.max_cap_q),
                )
            })
            .collect()
    }

    /// Orders one step away from `order` in p, q, P or Q, within bounds.
    fn neighbours(&self, order: ModelOrder) -> Vec<ModelOrder> {
        let c = &self.config;
        let step = |value: usize, max: usize| -> Vec<usize> {
            let mut out = Vec::with_capacity(2);
            if let Some(down) = value.checked_sub(1) {
                out.push(down);
            }
            if value < max {
                out.push(value + 1);
            }
            out
        };

        let mut out = Vec::new();
        for p in step(order.p, c.max_p) {
            out.push(ModelOrder { p, ..order });
        }
        for q in step(order.q, c.max_q) {
            out.push(ModelOrder { q, ..order });
        }
        if order.s > 1 {
            for cap_p in step(order.cap_p, c.max_cap_p) {
                out.push(ModelOrder { cap_p, ..order });
            }
            for cap_q in step(order.cap_q, c.max_cap_q) {
                out.push(ModelOrder { cap_q, ..order });
            }
        }
        out
    }

    /// Every order within bounds.
    fn exhaustive_candidates(&self, d: usize, cap_d: usize) -> Vec<ModelOrder> {
        let c = &self.config;
        let (max_cap_p, max_cap_q) = if c.is_seasonal() {
            (c.max_cap_p, c.max_cap_q)
        } else {
            (0, 0)
        };
        let mut candidates = Vec::new();
        for p in 0..=c.max_p {
            for q in 0..=c.max_q {
                for cap_p in 0..=max_cap_p {
                    for cap_q in 0..=max_cap_q {
                        candidates.push(self.candidate(p, d, q, cap_p, cap_d, cap_q));
                    }
                }
            }
        }
        candidates
    }

    /// Whether `order` lies in the configured search space for the chosen
    /// differencing orders.
    fn in_space(&self, order: ModelOrder, d: usize, cap_d: usize) -> bool {
        let c = &self.config;
        let seasonal_part = if c.is_seasonal() {
            order.s == c.seasonal_period
                && order.cap_d == cap_d
                && order.cap_p <= c.max_cap_p
                && order.cap_q <= c.max_cap_q
        } else {
            order.s == 0 && order.cap_p == 0 && order.cap_d == 0 && order.cap_q == 0
        };
        order.d == d && order.p <= c.max_p && order.q <= c.max_q && seasonal_part
    }

    /// Leading observations excluded from every candidate's likelihood: the
    /// longest differencing plus AR span in the search space or the baseline.
    fn conditioning(&self, d: usize, cap_d: usize) -> usize {
        let c = &self.config;
        let widest = if c.is_seasonal() {
            let s = c.seasonal_period;
            ModelOrder::seasonal(c.max_p, d, 0, c.max_cap_p, cap_d, 0, s)
        } else {
            ModelOrder::new(c.max_p, d, 0)
        };
        let span = |o: ModelOrder| o.d + o.cap_d * o.s + o.ar_span();
        span(widest).max(span(BASELINE_ORDER))
    }

    /// Fit the baseline, as a regular candidate when it lies in the
    /// configured space and as a sanity bound otherwise.
    fn evaluate_baseline(&self, search: &mut Search<'_>, d: usize, cap_d: usize) {
        if self.in_space(BASELINE_ORDER, d, cap_d) {
            search.evaluate(vec![BASELINE_ORDER]);
        } else {
            search.evaluate_bound(BASELINE_ORDER);
        }
    }

    fn stepwise_search(&self, search: &mut Search<'_>, d: usize, cap_d: usize) {
        self.evaluate_baseline(search, d, cap_d);
        search.evaluate(self.seeds(d, cap_d));

        while !search.timed_out {
            let Some(current) = search.best_order() else {
                break;
            };
            if !search.evaluate(self.neighbours(current)) {
                break;
            }
        }
    }

    fn differencing_orders(&self, values: &[f64]) -> (usize, usize) {
        let c = &self.config;
        let period = c.seasonal_period;
        let cap_d = if c.is_seasonal() {
            match c.cap_d {
                Differencing::Fixed(v) => v,
                Differencing::Auto => nsdiffs(values, period, c.max_cap_d),
            }
        } else {
            0
        };
        let d = match c.d {
            Differencing::Fixed(v) => v,
            Differencing::Auto => ndiffs(&seasonal_difference(values, cap_d, period), c.max_d),
        };
        (d, cap_d)
    }
}

impl Default for AutoARIMA {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoARIMA {
    fn fit(&mut self, series: &TimeSeries, exog: Option<&TimeSeries>) -> Result<()> {
        self.selected = None;
        self.model_scores.clear();

        let values = series.values();
        let s = self.config.seasonal_period;
        let min_required = if self.config.is_seasonal() {
            3 * s // At least 3 seasonal cycles for SARIMA
        } else {
            MIN_OBSERVATIONS
        };
        if values.len() < min_required {
            return Err(ForecastError::InsufficientData {
                needed: min_required,
                got: values.len(),
            });
        }
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues(
                "target series contains missing values".to_string(),
            ));
        }
        if let Some(x) = exog {
            check_exog_alignment(series, x)?;
        }

        let (d, cap_d) = self.differencing_orders(values);
        let conditioning = self.conditioning(d, cap_d);
        info!(
            d,
            cap_d,
            period = s,
            conditioning,
            stepwise = self.config.stepwise,
            exog = exog.is_some(),
            "starting order search"
        );

        let mut search = Search::new(series, exog, conditioning, self.config.deadline);
        if self.config.stepwise {
            self.stepwise_search(&mut search, d, cap_d);
        } else {
            self.evaluate_baseline(&mut search, d, cap_d);
            search.evaluate(self.exhaustive_candidates(d, cap_d));
        }

        let (selection, scores) = search.into_selection()?;
        info!(
            order = %selection.order,
            aic = selection.aic,
            candidates = scores.len(),
            "order search finished"
        );
        self.model_scores = scores;
        self.selected = Some(selection);
        Ok(())
    }

    fn predict_with_intervals(
        &self,
        horizon: usize,
        level: f64,
        future_exog: Option<&TimeSeries>,
    ) -> Result<Forecast> {
        self.model()
            .ok_or(ForecastError::FitRequired)?
            .predict_with_intervals(horizon, level, future_exog)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.model()?.fitted_values()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.model()?.residuals()
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        TimeSeries::daily(start, values).unwrap()
    }

    fn linear() -> TimeSeries {
        make_series((10..=40).map(|v| v as f64).collect())
    }

    fn noisy_walk(n: usize, seed: u64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = vec![100.0; n];
        for t in 1..n {
            values[t] = values[t - 1] + 0.2 + rng.gen_range(-1.0..1.0);
        }
        make_series(values)
    }

    #[test]
    fn config_builders() {
        let config = AutoARIMAConfig::default()
            .with_max_orders(3, 1, 2)
            .with_seasonal_period(7)
            .with_seasonal_orders(1, 1, 1)
            .with_differencing(1)
            .with_deadline(Duration::from_secs(5))
            .exhaustive();

        assert_eq!(config.max_p, 3);
        assert_eq!(config.max_q, 2);
        assert_eq!(config.seasonal_period, 7);
        assert_eq!(config.d, Differencing::Fixed(1));
        assert_eq!(config.cap_d, Differencing::Auto);
        assert_eq!(config.deadline, Some(Duration::from_secs(5)));
        assert!(!config.stepwise);
    }

    #[test]
    fn config_loads_from_partial_json() {
        let config: AutoARIMAConfig =
            serde_json::from_str(r#"{"max_p": 2, "d": {"fixed": 1}, "cap_d": "auto"}"#).unwrap();
        assert_eq!(config.max_p, 2);
        assert_eq!(config.max_q, 5);
        assert_eq!(config.d, Differencing::Fixed(1));
        assert!(config.stepwise);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn linear_series_selects_random_walk_with_drift() {
        let mut model = AutoARIMA::new();
        model.fit(&linear(), None).unwrap();

        let order = model.selected_order().unwrap();
        assert_eq!(order.d, 1);
        assert_eq!((order.p, order.q), (0, 0));

        let forecast = model.predict_with_intervals(5, 0.95, None).unwrap();
        for (h, p) in forecast.point().iter().enumerate() {
            assert_relative_eq!(*p, 41.0 + h as f64, epsilon = 1e-4);
        }
    }

    #[test]
    fn stepwise_visits_fewer_orders_than_exhaustive() {
        let ts = noisy_walk(120, 9);
        let config = AutoARIMAConfig::default().with_max_orders(2, 2, 2);

        let mut stepwise = AutoARIMA::with_config(config.clone());
        stepwise.fit(&ts, None).unwrap();
        let mut exhaustive = AutoARIMA::with_config(config.exhaustive());
        exhaustive.fit(&ts, None).unwrap();

        // 3 x 3 grid, plus the baseline unless the grid already holds it
        assert!(exhaustive.model_scores().len() >= 9);
        assert!(stepwise.model_scores().len() <= exhaustive.model_scores().len());
        assert!(exhaustive.aic().unwrap() <= stepwise.aic().unwrap() + 1e-9);
    }

    #[test]
    fn selection_is_never_worse_than_baseline() {
        let ts = noisy_walk(150, 4);
        let mut model = AutoARIMA::with_config(AutoARIMAConfig::default().with_max_orders(2, 2, 2));
        model.fit(&ts, None).unwrap();

        let baseline = model
            .model_scores()
            .iter()
            .find(|(order, _)| *order == BASELINE_ORDER)
            .map(|(_, aic)| *aic)
            .unwrap();
        assert!(baseline.is_finite());
        assert!(model.aic().unwrap() <= baseline);
    }

    fn assert_in_space_or_baseline(model: &AutoARIMA, check: impl Fn(&ModelOrder) -> bool) {
        for (order, _) in model.model_scores() {
            assert!(
                *order == BASELINE_ORDER || check(order),
                "{} scored outside the configured space",
                order
            );
        }
        let selected = model.selected_order().unwrap();
        assert!(selected == BASELINE_ORDER || check(&selected));
    }

    #[test]
    fn fixed_stationary_search_does_not_expand_from_baseline() {
        let ts = noisy_walk(150, 12);
        let config = AutoARIMAConfig::default()
            .with_max_orders(2, 0, 2)
            .with_differencing(0);
        let mut model = AutoARIMA::with_config(config);
        model.fit(&ts, None).unwrap();

        // (1,1,0) is scored, but none of its d = 1 neighbours are.
        assert!(model.model_scores().iter().any(|(o, _)| *o == BASELINE_ORDER));
        assert_in_space_or_baseline(&model, |o| o.d == 0 && o.p <= 2 && o.q <= 2 && o.s == 0);
    }

    #[test]
    fn seasonal_stepwise_stays_in_seasonal_space() {
        let ts = noisy_walk(140, 3);
        let config = AutoARIMAConfig::default()
            .with_max_orders(2, 1, 2)
            .with_seasonal_period(7)
            .with_seasonal_orders(1, 1, 1)
            .with_differencing(1)
            .with_seasonal_differencing(1);
        let mut model = AutoARIMA::with_config(config);
        model.fit(&ts, None).unwrap();

        assert_in_space_or_baseline(&model, |o| {
            o.d == 1 && o.cap_d == 1 && o.s == 7 && o.p <= 2 && o.q <= 2 && o.cap_p <= 1 && o.cap_q <= 1
        });
    }

    #[test]
    fn baseline_bound_is_selected_only_when_best() {
        let ts = noisy_walk(120, 6);
        let mut search = Search::new(&ts, None, 3, None);
        search.evaluate_bound(BASELINE_ORDER);
        assert!(search.best_order().is_none());

        search.evaluate(vec![ModelOrder::new(0, 0, 0)]);
        assert_eq!(search.best_order(), Some(ModelOrder::new(0, 0, 0)));

        // A trending walk is far better described by the differenced baseline.
        let (selection, scores) = search.into_selection().unwrap();
        assert_eq!(selection.order, BASELINE_ORDER);
        assert_eq!(scores.len(), 2);
    }

    fn wide_walk(seed: u64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut level = 100.0;
        let values: Vec<f64> = (0..300)
            .map(|_| {
                level += rng.gen_range(-3.0..3.0);
                level
            })
            .collect();
        make_series(values)
    }

    #[test]
    fn random_walk_selection_stays_close_to_pure_walk() {
        let ts = wide_walk(11);
        let config = AutoARIMAConfig::default()
            .with_max_orders(3, 1, 3)
            .with_differencing(1);
        let mut model = AutoARIMA::with_config(config);
        model.fit(&ts, None).unwrap();

        let walk = model
            .model_scores()
            .iter()
            .find(|(order, _)| *order == ModelOrder::new(0, 1, 0))
            .map(|(_, aic)| *aic)
            .unwrap();
        let selected = model.aic().unwrap();
        assert!(selected <= walk);
        assert!(walk - selected < 8.0, "selected {} vs walk {}", selected, walk);
    }

    #[test]
    fn seasonal_terms_do_not_win_on_a_random_walk() {
        let ts = wide_walk(31);

        // Largest span in this comparison: d = 1 plus two weekly AR lags.
        let conditioning = 1 + 14;
        let plain = fit_candidate(ModelOrder::new(0, 1, 0), &ts, None, conditioning);
        let seasonal = fit_candidate(
            ModelOrder::seasonal(0, 1, 0, 2, 0, 0, 7),
            &ts,
            None,
            conditioning,
        );
        assert!(plain.is_converged() && seasonal.is_converged());
        assert!(
            seasonal.aic() > plain.aic() - 10.0,
            "seasonal {} vs plain {}",
            seasonal.aic(),
            plain.aic()
        );
    }

    #[test]
    fn scores_are_sorted_best_first() {
        let mut model = AutoARIMA::with_config(AutoARIMAConfig::default().with_max_orders(2, 2, 2));
        model.fit(&noisy_walk(100, 2), None).unwrap();

        let scores = model.model_scores();
        assert_eq!(scores[0].1, model.aic().unwrap());
        for w in scores.windows(2) {
            assert!(w[0].1 <= w[1].1);
        }
    }

    #[test]
    fn seasonal_search_uses_fixed_seasonal_differencing() {
        let mut rng = StdRng::seed_from_u64(8);
        let pattern = [2.0, 4.0, -1.0, 0.0, 3.0, -5.0, 1.0];
        let values: Vec<f64> = (0..84)
            .map(|i| 20.0 + pattern[i % 7] + rng.gen_range(-0.3..0.3))
            .collect();
        let config = AutoARIMAConfig::default()
            .with_max_orders(1, 1, 1)
            .with_seasonal_period(7)
            .with_seasonal_orders(1, 1, 1)
            .with_differencing(0)
            .with_seasonal_differencing(1);

        let mut model = AutoARIMA::with_config(config);
        model.fit(&make_series(values), None).unwrap();
        // Only the baseline may lack the fixed seasonal differencing.
        assert_in_space_or_baseline(&model, |o| o.d == 0 && o.cap_d == 1 && o.s == 7);
    }

    #[test]
    fn exogenous_length_mismatch_is_data_error() {
        let mut model = AutoARIMA::new();
        let exog = make_series(vec![1.0; 30]);
        let err = model.fit(&linear(), Some(&exog)).unwrap_err();
        assert!(matches!(err, ForecastError::DimensionMismatch { expected: 31, got: 30 }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }

    #[test]
    fn zero_deadline_times_out() {
        let config = AutoARIMAConfig::default().with_deadline(Duration::ZERO);
        let mut model = AutoARIMA::with_config(config);
        let err = model.fit(&linear(), None).unwrap_err();
        assert!(matches!(err, ForecastError::Timeout { .. }));
        assert!(model.selected_order().is_none());
    }

    #[test]
    fn all_failed_candidates_is_convergence_error() {
        let ts = make_series(vec![1.0, 2.0, 4.0, 3.0, 5.0]);
        let mut search = Search::new(&ts, None, 0, None);
        search.evaluate(vec![ModelOrder::new(3, 1, 3), ModelOrder::new(4, 1, 0)]);

        let err = search.into_selection().unwrap_err();
        assert!(matches!(err, ForecastError::Convergence(_)));
    }

    #[test]
    fn visited_orders_are_not_refitted() {
        let ts = linear();
        let mut search = Search::new(&ts, None, 0, None);
        assert!(search.evaluate(vec![ModelOrder::new(0, 1, 0)]));
        assert!(!search.evaluate(vec![ModelOrder::new(0, 1, 0)]));
        assert_eq!(search.scores.len(), 1);
    }

    #[test]
    fn conditioning_covers_widest_candidate() {
        let plain = AutoARIMA::with_config(AutoARIMAConfig::default().with_max_orders(3, 2, 3));
        assert_eq!(plain.conditioning(1, 0), 4);
        // The baseline spans two observations even when p is capped at 0.
        let tiny = AutoARIMA::with_config(AutoARIMAConfig::default().with_max_orders(0, 0, 1));
        assert_eq!(tiny.conditioning(0, 0), 2);

        let weekly = AutoARIMA::with_config(
            AutoARIMAConfig::default()
                .with_max_orders(7, 1, 7)
                .with_seasonal_period(7)
                .with_seasonal_orders(2, 1, 2),
        );
        assert_eq!(weekly.conditioning(1, 1), 1 + 7 + 7 + 14);
    }

    #[test]
    fn neighbours_stay_within_bounds() {
        let model = AutoARIMA::with_config(AutoARIMAConfig::default().with_max_orders(1, 2, 1));
        let around = model.neighbours(ModelOrder::new(1, 1, 0));
        assert!(around.contains(&ModelOrder::new(0, 1, 0)));
        assert!(around.contains(&ModelOrder::new(1, 1, 1)));
        assert!(around.iter().all(|o| o.p <= 1 && o.q <= 1 && o.d == 1));
    }

    #[test]
    fn short_series_is_rejected() {
        let mut model = AutoARIMA::new();
        let err = model.fit(&make_series(vec![1.0, 2.0, 3.0]), None).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = AutoARIMA::new();
        assert_eq!(
            model.predict_with_intervals(3, 0.95, None).unwrap_err(),
            ForecastError::FitRequired
        );
    }
}
