//! ARIMA(p, d, q) fitted by conditional sum of squares.
//!
//! The series is differenced `d` times, centred on its sample mean when
//! `d == 0`, and the ARMA(p, q) part is estimated by minimising the sum of
//! squared one-step residuals over stationary/invertible parameters. Forecasts
//! run the recursion forward with future innovations at zero and are
//! integrated back to the original scale. Interval widths come from the
//! ψ-weights of the full `φ(B)(1−B)^d` polynomial.
//!
//! Everything here is deterministic: identical input gives bit-identical output.

use super::nelder_mead::NelderMead;
use super::transform::{constrain_ar, constrain_ma, from_partial, yule_walker_partials};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use thiserror::Error;

/// Model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Fewest observations the fit accepts: enough residuals left after the
    /// AR warm-up to outnumber the estimated coefficients.
    pub fn min_observations(&self) -> usize {
        self.d + 2 * self.p + self.q + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(2, 0, 2)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// Why a fit or forecast could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("ARIMA{order} needs at least {required} observations, got {actual}")]
    TooFewObservations {
        order: ArimaOrder,
        required: usize,
        actual: usize,
    },

    #[error("series has no variation after differencing")]
    ConstantSeries,

    #[error("series contains non-finite values")]
    NonFiniteInput,

    #[error("sum of squares did not evaluate to a finite value")]
    NonFiniteObjective,

    #[error("forecast horizon must be at least 1 step")]
    ZeroHorizon,

    #[error("confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidence(f64),

    #[error("forecast produced a non-finite value")]
    NonFiniteForecast,
}

/// Point forecasts with a two-sided interval, one entry per step ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalForecast {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl IntervalForecast {
    /// `(point, lower, upper)` at the final step.
    pub fn final_step(&self) -> Option<(f64, f64, f64)> {
        Some((
            *self.point.last()?,
            *self.lower.last()?,
            *self.upper.last()?,
        ))
    }
}

/// A fitted model, ready to forecast.
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    sigma2: f64,
    /// Differenced series minus `mean`.
    centred: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value of the series at each differencing level `0..d`.
    level_tails: Vec<f64>,
    iterations: usize,
    converged: bool,
}

/// Fit an ARIMA model of the given order.
pub fn fit(series: &[f64], order: ArimaOrder) -> Result<FittedArima, FitError> {
    fit_with(series, order, &NelderMead::default())
}

/// Fit with explicit optimiser settings.
pub fn fit_with(
    series: &[f64],
    order: ArimaOrder,
    optimizer: &NelderMead,
) -> Result<FittedArima, FitError> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput);
    }
    let required = order.min_observations();
    if series.len() < required {
        return Err(FitError::TooFewObservations {
            order,
            required,
            actual: series.len(),
        });
    }

    let mut level_tails = Vec::with_capacity(order.d);
    let mut working = series.to_vec();
    for _ in 0..order.d {
        level_tails.push(working[working.len() - 1]);
        working = working.windows(2).map(|w| w[1] - w[0]).collect();
    }

    let (lo, hi) = working
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let scale = lo.abs().max(hi.abs()).max(1.0);
    if hi - lo <= f64::EPSILON * scale {
        return Err(FitError::ConstantSeries);
    }

    let mean = if order.d == 0 {
        working.iter().sum::<f64>() / working.len() as f64
    } else {
        0.0
    };
    let centred: Vec<f64> = working.iter().map(|v| v - mean).collect();

    let (p, q) = (order.p, order.q);
    let mut start: Vec<f64> = yule_walker_partials(&centred, p)
        .into_iter()
        .map(|r| from_partial(r.clamp(-0.95, 0.95)))
        .collect();
    start.extend(std::iter::repeat(0.0).take(q));

    let objective = |x: &[f64]| {
        let ar = constrain_ar(&x[..p]);
        let ma = constrain_ma(&x[p..]);
        sum_of_squares(&centred, &ar, &ma)
    };
    let minimum = optimizer.minimize(objective, &start);
    if !minimum.value.is_finite() {
        return Err(FitError::NonFiniteObjective);
    }

    let ar = constrain_ar(&minimum.point[..p]);
    let ma = constrain_ma(&minimum.point[p..]);
    let residuals = css_residuals(&centred, &ar, &ma);
    let sigma2 = minimum.value / (centred.len() - p) as f64;
    if !sigma2.is_finite() {
        return Err(FitError::NonFiniteObjective);
    }

    Ok(FittedArima {
        order,
        ar,
        ma,
        mean,
        sigma2,
        centred,
        residuals,
        level_tails,
        iterations: minimum.iterations,
        converged: minimum.converged,
    })
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Innovation variance estimate.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// False when the optimiser hit its iteration budget.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Forecast `steps` ahead with a two-sided interval at `confidence`.
    pub fn forecast(&self, steps: usize, confidence: f64) -> Result<IntervalForecast, FitError> {
        if steps == 0 {
            return Err(FitError::ZeroHorizon);
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(FitError::InvalidConfidence(confidence));
        }

        let mut values = self.centred.clone();
        let mut shocks = self.residuals.clone();
        let mut point = Vec::with_capacity(steps);
        for _ in 0..steps {
            let next = one_step(&values, &shocks, &self.ar, &self.ma, values.len());
            values.push(next);
            shocks.push(0.0);
            point.push(next + self.mean);
        }

        for &tail in self.level_tails.iter().rev() {
            let mut acc = tail;
            for p in point.iter_mut() {
                acc += *p;
                *p = acc;
            }
        }

        let psi = self.psi_weights(steps);
        let z = z_score(confidence)?;
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(steps);
        let mut upper = Vec::with_capacity(steps);
        for (h, p) in point.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half_width = z * (self.sigma2 * cumulative).sqrt();
            lower.push(p - half_width);
            upper.push(p + half_width);
        }

        let all_finite = point
            .iter()
            .chain(&lower)
            .chain(&upper)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(FitError::NonFiniteForecast);
        }

        Ok(IntervalForecast {
            point,
            lower,
            upper,
        })
    }

    /// ψ-weights of the MA(∞) representation, `ψ_0 = 1`.
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // Polynomial 1 - φ_1 B - ... , then times (1 - B) d times.
        let mut poly: Vec<f64> = std::iter::once(1.0)
            .chain(self.ar.iter().map(|c| -c))
            .collect();
        for _ in 0..self.order.d {
            let mut next = poly.clone();
            next.push(0.0);
            for i in 1..next.len() {
                next[i] -= poly[i - 1];
            }
            poly = next;
        }
        let ar_full: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = vec![0.0; count];
        if count == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..count {
            let mut v = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for (i, a) in ar_full.iter().enumerate().take(j) {
                v += a * psi[j - 1 - i];
            }
            psi[j] = v;
        }
        psi
    }
}

/// Prediction for position `t` from everything before it.
fn one_step(values: &[f64], shocks: &[f64], ar: &[f64], ma: &[f64], t: usize) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .map(|(i, c)| c * values[t - 1 - i])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(j, _)| t > *j)
        .map(|(j, c)| c * shocks[t - 1 - j])
        .sum();
    ar_part + ma_part
}

/// Conditional residuals: zero during the first `p` observations.
fn css_residuals(centred: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut shocks = vec![0.0; centred.len()];
    for t in ar.len()..centred.len() {
        shocks[t] = centred[t] - one_step(centred, &shocks, ar, ma, t);
    }
    shocks
}

fn sum_of_squares(centred: &[f64], ar: &[f64], ma: &[f64]) -> f64 {
    css_residuals(centred, ar, ma)[ar.len()..]
        .iter()
        .map(|e| e * e)
        .sum()
}

/// Two-sided standard normal quantile.
fn z_score(confidence: f64) -> Result<f64, FitError> {
    let normal = Normal::new(0.0, 1.0).map_err(|_| FitError::InvalidConfidence(confidence))?;
    Ok(normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}
