//! Seasonal ARIMA with an optional exogenous regressor (regression with
//! SARIMA errors).
//!
//! With `δ(B) = (1 - B)^d (1 - B^m)^D`, the differenced target `w = δ(B) y`
//! and differenced regressor `x̃ = δ(B) x` satisfy
//!
//! ```text
//! w_t = μ + β·x̃_t + u_t,    φ(B) Φ(B^m) u_t = θ(B) Θ(B^m) e_t
//! ```
//!
//! Coefficients are estimated by conditional sum of squares (pre-sample
//! innovations set to zero) minimized with Nelder-Mead. The likelihood is
//! conditioned on the leading observations consumed by differencing and the
//! AR part; [`SARIMAX::with_conditioning`] extends that prefix so models of
//! different orders are scored on the same observations and their AICs are
//! comparable.

use std::f64::consts::PI;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{daily_range, Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{
    apply_differencing, differencing_polynomial, integrate, poly_mul,
};
use crate::models::Forecaster;
use crate::utils::ols::ols_fit;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, variance, z_for_level};

/// Bound on every AR/MA coefficient during estimation.
const COEF_BOUND: f64 = 0.99;

/// Innovation variance floor, relative to the mean square of the
/// differenced series. Keeps AIC finite for exactly-fitting models.
const VARIANCE_FLOOR: f64 = 1e-10;

/// Model order (p, d, q)(P, D, Q)\[s\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Seasonal period (0 for non-seasonal).
    pub s: usize,
}

impl ModelOrder {
    /// Non-seasonal order (p, d, q).
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            s: 0,
        }
    }

    /// Seasonal order (p, d, q)(P, D, Q)\[s\].
    pub fn seasonal(
        p: usize,
        d: usize,
        q: usize,
        cap_p: usize,
        cap_d: usize,
        cap_q: usize,
        s: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            s,
        }
    }

    /// Check if this is a seasonal model.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// Number of leading differenced observations consumed by the AR part.
    pub(crate) fn ar_span(&self) -> usize {
        self.p + self.cap_p * self.s
    }

    fn validate(&self) -> Result<()> {
        if (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0) && self.s < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal terms in {} need a seasonal period of at least 2",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(f, "({},{},{})[{}]", self.cap_p, self.cap_d, self.cap_q, self.s)?;
        }
        Ok(())
    }
}

/// Position of each estimated quantity in the optimizer's parameter vector:
/// `[μ?, β?, φ_1..φ_p, θ_1..θ_q, Φ_1..Φ_P, Θ_1..Θ_Q]`.
#[derive(Debug, Clone, Copy)]
struct Layout {
    mean: bool,
    exog: bool,
    p: usize,
    q: usize,
    cap_p: usize,
    cap_q: usize,
}

impl Layout {
    fn regression_len(&self) -> usize {
        self.mean as usize + self.exog as usize
    }

    fn len(&self) -> usize {
        self.regression_len() + self.p + self.q + self.cap_p + self.cap_q
    }

    fn unpack(&self, params: &[f64]) -> Coefficients {
        let mut rest = params;
        let mut take = |k: usize| {
            let (head, tail) = rest.split_at(k);
            rest = tail;
            head.to_vec()
        };
        let mu = take(self.mean as usize).first().copied().unwrap_or(0.0);
        let beta = take(self.exog as usize).first().copied().unwrap_or(0.0);
        Coefficients {
            mu,
            beta,
            ar: take(self.p),
            ma: take(self.q),
            sar: take(self.cap_p),
            sma: take(self.cap_q),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Coefficients {
    mu: f64,
    beta: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sar: Vec<f64>,
    sma: Vec<f64>,
}

impl Coefficients {
    /// Lag coefficients of `φ(B)Φ(B^s)`, as in `u_t = Σ a_i u_{t-i} + ...`.
    fn full_ar(&self, s: usize) -> Vec<f64> {
        let regular = lag_polynomial(&self.ar, -1.0, 1);
        let seasonal = lag_polynomial(&self.sar, -1.0, s);
        polynomial_lags(&poly_mul(&regular, &seasonal), -1.0)
    }

    /// Lag coefficients of `θ(B)Θ(B^s)`, as in `... + e_t + Σ b_j e_{t-j}`.
    fn full_ma(&self, s: usize) -> Vec<f64> {
        let regular = lag_polynomial(&self.ma, 1.0, 1);
        let seasonal = lag_polynomial(&self.sma, 1.0, s);
        polynomial_lags(&poly_mul(&regular, &seasonal), 1.0)
    }
}

/// `1 + sign·Σ c_i B^{i·step}` in ascending powers.
fn lag_polynomial(coefs: &[f64], sign: f64, step: usize) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Inverse of [`lag_polynomial`] with `step = 1`.
fn polynomial_lags(poly: &[f64], sign: f64) -> Vec<f64> {
    poly.iter().skip(1).map(|c| sign * c).collect()
}

/// Regression errors `u` and innovations `e` for one set of coefficients.
/// Innovations before the AR span are zero.
fn innovations(
    w: &[f64],
    x: Option<&[f64]>,
    coefs: &Coefficients,
    s: usize,
) -> (Vec<f64>, Vec<f64>) {
    let phi = coefs.full_ar(s);
    let theta = coefs.full_ma(s);
    let n = w.len();

    let u: Vec<f64> = match x {
        Some(x) => w
            .iter()
            .zip(x)
            .map(|(wt, xt)| wt - coefs.mu - coefs.beta * xt)
            .collect(),
        None => w.iter().map(|wt| wt - coefs.mu).collect(),
    };

    let mut e = vec![0.0; n];
    for t in phi.len()..n {
        let mut pred = 0.0;
        for (i, a) in phi.iter().enumerate() {
            pred += a * u[t - 1 - i];
        }
        for (j, b) in theta.iter().enumerate().take(t) {
            pred += b * e[t - 1 - j];
        }
        e[t] = u[t] - pred;
    }
    (u, e)
}

/// Check that an exogenous series lines up with the target.
pub(crate) fn check_exog_alignment(series: &TimeSeries, exog: &TimeSeries) -> Result<()> {
    if exog.len() != series.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: series.len(),
            got: exog.len(),
        });
    }
    if exog.timestamps() != series.timestamps() {
        return Err(ForecastError::TimestampError(
            "exogenous timestamps do not match the target series".to_string(),
        ));
    }
    if exog.has_missing_values() {
        return Err(ForecastError::MissingValues(
            "exogenous series contains missing values".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct FitState {
    history: Vec<f64>,
    exog_history: Option<Vec<f64>>,
    last_timestamp: NaiveDate,
    delta: Vec<f64>,
    u: Vec<f64>,
    innovations: Vec<f64>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
}

/// Seasonal ARIMA forecasting model with an optional exogenous regressor.
#[derive(Debug, Clone)]
pub struct SARIMAX {
    order: ModelOrder,
    include_mean: bool,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    intercept: f64,
    exog_coef: Option<f64>,
    sigma2: f64,
    log_likelihood: Option<f64>,
    aic: Option<f64>,
    iterations: usize,
    conditioning: usize,
    state: Option<FitState>,
}

impl SARIMAX {
    /// Create an unfitted model.
    ///
    /// An intercept (the mean of the differenced series, i.e. a drift when
    /// `d + D = 1`) is estimated when `d + D < 2`.
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            include_mean: order.d + order.cap_d < 2,
            ar: vec![],
            ma: vec![],
            seasonal_ar: vec![],
            seasonal_ma: vec![],
            intercept: 0.0,
            exog_coef: None,
            sigma2: f64::NAN,
            log_likelihood: None,
            aic: None,
            iterations: 0,
            conditioning: 0,
            state: None,
        }
    }

    /// Override whether an intercept is estimated.
    pub fn with_mean(mut self, include_mean: bool) -> Self {
        self.include_mean = include_mean;
        self
    }

    /// Score the likelihood only from observation `conditioning` onwards
    /// (indices into the undifferenced series).
    ///
    /// A prefix shorter than the model's own differencing plus AR span has
    /// no effect. Fitting several orders with the same prefix puts their
    /// AICs on a common sample.
    pub fn with_conditioning(mut self, conditioning: usize) -> Self {
        self.conditioning = conditioning;
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Number of leading observations excluded from the likelihood.
    pub fn conditioning(&self) -> usize {
        self.conditioning
    }

    pub fn include_mean(&self) -> bool {
        self.include_mean
    }

    /// Non-seasonal AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Non-seasonal MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.seasonal_ar
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.seasonal_ma
    }

    /// Intercept of the differenced series (0 when not estimated).
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficient of the exogenous regressor, in its original units.
    pub fn exog_coefficient(&self) -> Option<f64> {
        self.exog_coef
    }

    /// Innovation variance.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    /// Optimizer iterations used by the last fit.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of estimated coefficients (excluding the innovation variance).
    pub fn num_params(&self) -> usize {
        self.layout(self.exog_coef.is_some()).len()
    }

    fn layout(&self, exog: bool) -> Layout {
        Layout {
            mean: self.include_mean,
            exog,
            p: self.order.p,
            q: self.order.q,
            cap_p: self.order.cap_p,
            cap_q: self.order.cap_q,
        }
    }

    fn coefficients(&self) -> Coefficients {
        Coefficients {
            mu: self.intercept,
            beta: self.exog_coef.unwrap_or(0.0),
            ar: self.ar.clone(),
            ma: self.ma.clone(),
            sar: self.seasonal_ar.clone(),
            sma: self.seasonal_ma.clone(),
        }
    }

    /// Starting point: OLS for the regression part, small values for ARMA.
    fn initial_parameters(layout: &Layout, w: &[f64], x: Option<&[f64]>) -> Vec<f64> {
        let mut initial = Vec::with_capacity(layout.len());

        if layout.regression_len() > 0 {
            let rows: Vec<Vec<f64>> = (0..w.len())
                .map(|t| {
                    let mut row = Vec::with_capacity(2);
                    if layout.mean {
                        row.push(1.0);
                    }
                    if let Some(x) = x {
                        row.push(x[t]);
                    }
                    row
                })
                .collect();
            match ols_fit(&rows, w) {
                Ok(fit) => initial.extend(fit.coefficients),
                Err(_) => {
                    if layout.mean {
                        initial.push(mean(w));
                    }
                    if layout.exog {
                        initial.push(0.0);
                    }
                }
            }
        }

        for count in [layout.p, layout.q] {
            initial.extend((0..count).map(|i| 0.1 / (i + 1) as f64));
        }
        for count in [layout.cap_p, layout.cap_q] {
            initial.extend(std::iter::repeat(0.1).take(count));
        }
        initial
    }

    /// Future values of the differenced regressor for `horizon` steps.
    fn future_regressor(
        &self,
        state: &FitState,
        horizon: usize,
        timestamps: &[NaiveDate],
        future_exog: Option<&TimeSeries>,
    ) -> Result<Vec<f64>> {
        match (&state.exog_history, future_exog) {
            (None, None) => Ok(vec![0.0; horizon]),
            (None, Some(_)) => Err(ForecastError::InvalidParameter(
                "model was fitted without an exogenous regressor".to_string(),
            )),
            (Some(_), None) => Err(ForecastError::MissingValues(
                "future exogenous values are required by this model".to_string(),
            )),
            (Some(history), Some(future)) => {
                if future.len() != horizon {
                    return Err(ForecastError::DimensionMismatch {
                        expected: horizon,
                        got: future.len(),
                    });
                }
                if future.timestamps() != timestamps {
                    return Err(ForecastError::TimestampError(
                        "future exogenous timestamps must follow the training window".to_string(),
                    ));
                }
                if future.has_missing_values() {
                    return Err(ForecastError::MissingValues(
                        "future exogenous series contains missing values".to_string(),
                    ));
                }
                let mut extended = history.clone();
                extended.extend_from_slice(future.values());
                let differenced = apply_differencing(&extended, &state.delta);
                Ok(differenced[differenced.len() - horizon..].to_vec())
            }
        }
    }

    /// MA(∞) weights `ψ_0..ψ_{horizon-1}` of the model including differencing.
    fn psi_weights(&self, delta: &[f64], horizon: usize) -> Vec<f64> {
        let coefs = self.coefficients();
        let s = self.order.s;
        let ar_poly = lag_polynomial(&coefs.full_ar(s), -1.0, 1);
        let diff_poly = lag_polynomial(delta, -1.0, 1);
        let combined = polynomial_lags(&poly_mul(&ar_poly, &diff_poly), -1.0);
        let theta = coefs.full_ma(s);

        let mut psi = vec![0.0; horizon];
        if horizon == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = theta.get(j - 1).copied().unwrap_or(0.0);
            for (i, a) in combined.iter().enumerate().take(j) {
                value += a * psi[j - 1 - i];
            }
            psi[j] = value;
        }
        psi
    }
}

impl Forecaster for SARIMAX {
    fn fit(&mut self, series: &TimeSeries, exog: Option<&TimeSeries>) -> Result<()> {
        let order = self.order;
        order.validate()?;

        let y = series.values();
        let last_timestamp = series.last_timestamp().ok_or(ForecastError::EmptyData)?;
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues(
                "target series contains missing values".to_string(),
            ));
        }
        if let Some(x) = exog {
            check_exog_alignment(series, x)?;
        }

        let delta = differencing_polynomial(order.d, order.cap_d, order.s);
        let layout = self.layout(exog.is_some());
        let own_span = order.ar_span();
        // First differenced index whose innovation enters the likelihood.
        let start = own_span.max(self.conditioning.saturating_sub(delta.len()));
        // At least two effective observations beyond the parameter count.
        let needed = delta.len() + start + layout.len() + 2;
        if y.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: y.len(),
            });
        }

        let w = apply_differencing(y, &delta);
        let x_diff = exog.map(|x| apply_differencing(x.values(), &delta));
        // Work with a unit-variance regressor; the coefficient is rescaled below.
        let x_scale = x_diff
            .as_deref()
            .map(|x| {
                let sd = variance(x).sqrt();
                if sd.is_finite() && sd > 0.0 {
                    sd
                } else {
                    1.0
                }
            })
            .unwrap_or(1.0);
        let x_scaled: Option<Vec<f64>> = x_diff
            .as_ref()
            .map(|x| x.iter().map(|v| v / x_scale).collect());

        let objective = |params: &[f64]| -> f64 {
            let coefs = layout.unpack(params);
            let (_, e) = innovations(&w, x_scaled.as_deref(), &coefs, order.s);
            e[start..].iter().map(|v| v * v).sum()
        };

        let (point, iterations) = if layout.len() == 0 {
            (vec![], 0)
        } else {
            let initial = Self::initial_parameters(&layout, &w, x_scaled.as_deref());
            let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); layout.regression_len()];
            bounds.resize(layout.len(), (-COEF_BOUND, COEF_BOUND));

            let config = NelderMeadConfig {
                max_iter: 1000 * layout.len().max(2),
                ..Default::default()
            };
            let result = nelder_mead(objective, &initial, Some(&bounds), &config);
            if !result.converged || !result.optimal_value.is_finite() {
                return Err(ForecastError::Convergence(format!(
                    "{} did not converge after {} iterations",
                    order, result.iterations
                )));
            }
            (result.optimal_point, result.iterations)
        };

        let coefs = layout.unpack(&point);
        let (u, e) = innovations(&w, x_scaled.as_deref(), &coefs, order.s);

        let n_eff = (w.len() - start) as f64;
        let css: f64 = e[start..].iter().map(|v| v * v).sum();
        let mean_square = w.iter().map(|v| v * v).sum::<f64>() / w.len() as f64;
        let sigma2 = (css / n_eff).max(VARIANCE_FLOOR * mean_square.max(1.0));
        if !sigma2.is_finite() {
            return Err(ForecastError::Convergence(format!(
                "{} produced a non-finite innovation variance",
                order
            )));
        }

        let k = (layout.len() + 1) as f64;
        let ll = -0.5 * n_eff * (1.0 + sigma2.ln() + (2.0 * PI).ln());

        // Rescale u to raw regressor units so forecasting uses exog_coef directly.
        let beta = coefs.beta / x_scale;

        let offset = delta.len() + own_span;
        let mut fitted = vec![f64::NAN; y.len()];
        let mut residuals = vec![f64::NAN; y.len()];
        for t in offset..y.len() {
            let innovation = e[t - delta.len()];
            fitted[t] = y[t] - innovation;
            residuals[t] = innovation;
        }

        self.intercept = coefs.mu;
        self.exog_coef = exog.map(|_| beta);
        self.ar = coefs.ar;
        self.ma = coefs.ma;
        self.seasonal_ar = coefs.sar;
        self.seasonal_ma = coefs.sma;
        self.sigma2 = sigma2;
        self.log_likelihood = Some(ll);
        self.aic = Some(-2.0 * ll + 2.0 * k);
        self.iterations = iterations;
        self.state = Some(FitState {
            history: y.to_vec(),
            exog_history: exog.map(|x| x.values().to_vec()),
            last_timestamp,
            delta,
            u,
            innovations: e,
            fitted,
            residuals,
        });

        Ok(())
    }

    fn predict_with_intervals(
        &self,
        horizon: usize,
        level: f64,
        future_exog: Option<&TimeSeries>,
    ) -> Result<Forecast> {
        let state = self.state.as_ref().ok_or(ForecastError::FitRequired)?;
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "forecast horizon must be positive".to_string(),
            ));
        }
        let z = z_for_level(level)?;

        let first = state.last_timestamp.succ_opt().ok_or_else(|| {
            ForecastError::TimestampError(format!("no day after {}", state.last_timestamp))
        })?;
        let timestamps = daily_range(first, horizon)?;
        let x_future = self.future_regressor(state, horizon, &timestamps, future_exog)?;

        let coefs = self.coefficients();
        let phi = coefs.full_ar(self.order.s);
        let theta = coefs.full_ma(self.order.s);

        let mut u = state.u.clone();
        let mut e = state.innovations.clone();
        let mut w_future = Vec::with_capacity(horizon);
        for x in x_future {
            let t = u.len();
            let mut next = 0.0;
            for (i, a) in phi.iter().enumerate() {
                next += a * u[t - 1 - i];
            }
            for (j, b) in theta.iter().enumerate().take(t) {
                next += b * e[t - 1 - j];
            }
            u.push(next);
            e.push(0.0);
            w_future.push(coefs.mu + coefs.beta * x + next);
        }

        let point = integrate(&w_future, &state.history, &state.delta);

        let psi = self.psi_weights(&state.delta, horizon);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, p) in point.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half_width = z * (self.sigma2 * cumulative).sqrt();
            lower.push(p - half_width);
            upper.push(p + half_width);
        }

        Forecast::new(timestamps, point, lower, upper, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.fitted.as_slice())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.residuals.as_slice())
    }

    fn name(&self) -> &str {
        "SARIMAX"
    }
}
