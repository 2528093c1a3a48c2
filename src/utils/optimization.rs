//! Derivative-free minimization used for model parameter estimation.

use std::cmp::Ordering;

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether a stopping tolerance was met before `max_iter`.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Relative tolerance on the spread of objective values in the simplex.
    pub f_tolerance: f64,
    /// Absolute tolerance on the simplex diameter.
    pub x_tolerance: f64,
    /// Initial simplex step, relative to the coordinate (absolute near zero).
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.1,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

/// Minimize `objective` starting from `initial`.
///
/// Points are clamped into `bounds` (one `(min, max)` per coordinate) before
/// every evaluation. Non-finite objective values are ranked worst, so an
/// objective may return `f64::INFINITY` to reject a region.
///
/// # Example
/// ```
/// use quotecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let eval = |point: Vec<f64>| -> Vertex {
        let point = clamp(point, bounds);
        let value = objective(&point);
        Vertex {
            value: if value.is_nan() { f64::INFINITY } else { value },
            point,
        }
    };

    let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
    simplex.push(eval(initial.to_vec()));
    for i in 0..n {
        let mut point = initial.to_vec();
        let step = if point[i].abs() > 1e-8 {
            config.initial_step * point[i].abs()
        } else {
            config.initial_step
        };
        point[i] += step;
        // Stepping outward may land on a bound; step inward instead.
        if let Some(b) = bounds {
            if i < b.len() && point[i] > b[i].1 {
                point[i] = initial[i] - step;
            }
        }
        simplex.push(eval(point));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));

        let best = simplex[0].value;
        let worst = simplex[n].value;
        let f_spread = (worst - best).abs();
        if f_spread.is_finite() && f_spread <= config.f_tolerance * (best.abs() + config.f_tolerance)
        {
            converged = true;
            break;
        }
        if diameter(&simplex) <= config.x_tolerance {
            converged = true;
            break;
        }

        let centroid = centroid(&simplex[..n]);
        let worst_point = simplex[n].point.clone();

        let reflected = eval(towards(&centroid, &worst_point, -REFLECT));
        if reflected.value < simplex[0].value {
            let expanded = eval(towards(&centroid, &reflected.point, EXPAND));
            simplex[n] = if expanded.value < reflected.value {
                expanded
            } else {
                reflected
            };
            continue;
        }
        if reflected.value < simplex[n - 1].value {
            simplex[n] = reflected;
            continue;
        }

        let contracted = if reflected.value < simplex[n].value {
            eval(towards(&centroid, &reflected.point, CONTRACT))
        } else {
            eval(towards(&centroid, &worst_point, CONTRACT))
        };
        if contracted.value < simplex[n].value.min(reflected.value) {
            simplex[n] = contracted;
            continue;
        }

        let anchor = simplex[0].point.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = towards(&anchor, &vertex.point, SHRINK);
            *vertex = eval(shrunk);
        }
    }

    let best = simplex
        .into_iter()
        .min_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal))
        .unwrap_or(Vertex {
            point: initial.to_vec(),
            value: f64::INFINITY,
        });

    NelderMeadResult {
        optimal_point: best.point,
        optimal_value: best.value,
        iterations,
        converged,
    }
}

/// `origin + t * (target - origin)`; negative `t` reflects through `origin`.
fn towards(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn centroid(vertices: &[Vertex]) -> Vec<f64> {
    let dim = vertices[0].point.len();
    let mut c = vec![0.0; dim];
    for v in vertices {
        for (acc, x) in c.iter_mut().zip(&v.point) {
            *acc += x;
        }
    }
    let k = vertices.len() as f64;
    c.iter_mut().for_each(|x| *x /= k);
    c
}

fn diameter(simplex: &[Vertex]) -> f64 {
    let first = &simplex[0].point;
    simplex[1..]
        .iter()
        .map(|v| {
            v.point
                .iter()
                .zip(first)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max)
}

fn clamp(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(b) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(b) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}
