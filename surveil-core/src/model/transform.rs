//! Parameter transforms keeping the fitted model stationary and invertible.
//!
//! The optimiser works on unbounded values. Each one is squashed into a
//! partial autocorrelation in `(-MAX_PARTIAL, MAX_PARTIAL)` and the set is
//! turned into polynomial coefficients with the Durbin–Levinson recursion,
//! which only ever yields polynomials with roots outside the unit circle.

/// Largest absolute partial autocorrelation the fit may reach.
pub const MAX_PARTIAL: f64 = 0.99;

/// Unbounded value → partial autocorrelation.
pub fn to_partial(x: f64) -> f64 {
    MAX_PARTIAL * x / (1.0 + x * x).sqrt()
}

/// Partial autocorrelation → unbounded value. Inputs at or beyond the bound
/// are pulled just inside it.
pub fn from_partial(r: f64) -> f64 {
    let s = (r / MAX_PARTIAL).clamp(-0.999_999, 0.999_999);
    s / (1.0 - s * s).sqrt()
}

/// Durbin–Levinson: partial autocorrelations → AR coefficients
/// `x_t = Σ φ_i x_{t-i} + e_t`.
pub fn partials_to_coefficients(partials: &[f64]) -> Vec<f64> {
    let mut phi = vec![0.0; partials.len()];
    for (k, &r) in partials.iter().enumerate() {
        let prev = phi.clone();
        phi[k] = r;
        for j in 0..k {
            phi[j] = prev[j] - r * prev[k - 1 - j];
        }
    }
    phi
}

/// Stationary AR coefficients from unbounded optimiser values.
pub fn constrain_ar(unconstrained: &[f64]) -> Vec<f64> {
    let partials: Vec<f64> = unconstrained.iter().map(|&x| to_partial(x)).collect();
    partials_to_coefficients(&partials)
}

/// Invertible MA coefficients `e_t + Σ θ_j e_{t-j}` from unbounded values.
pub fn constrain_ma(unconstrained: &[f64]) -> Vec<f64> {
    constrain_ar(unconstrained).into_iter().map(|c| -c).collect()
}

/// Yule–Walker partial autocorrelations up to `order`, via Levinson–Durbin
/// on the biased sample autocovariances of `data`.
///
/// Stops early (remaining partials zero) once the prediction error variance
/// collapses.
pub fn yule_walker_partials(data: &[f64], order: usize) -> Vec<f64> {
    let mut partials = vec![0.0; order];
    let n = data.len();
    if order == 0 || n <= order {
        return partials;
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
    let autocov: Vec<f64> = (0..=order)
        .map(|k| {
            centered[k..]
                .iter()
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();

    let mut phi: Vec<f64> = Vec::with_capacity(order);
    let mut error_var = autocov[0];
    for k in 1..=order {
        if error_var <= 1e-12 * autocov[0].max(f64::MIN_POSITIVE) {
            break;
        }
        let acc = autocov[k]
            - phi
                .iter()
                .enumerate()
                .map(|(j, c)| c * autocov[k - 1 - j])
                .sum::<f64>();
        let r = acc / error_var;
        let prev = phi.clone();
        phi.push(r);
        for j in 0..k - 1 {
            phi[j] = prev[j] - r * prev[k - 2 - j];
        }
        error_var *= 1.0 - r * r;
        partials[k - 1] = r;
    }
    partials
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Roots of `1 - a1 z - a2 z^2` lie outside the unit circle.
    fn ar2_is_stationary(a: &[f64]) -> bool {
        a[1].abs() < 1.0 && a[0] + a[1] < 1.0 && a[1] - a[0] < 1.0
    }

    #[test]
    fn partial_roundtrip() {
        for r in [-0.9, -0.3, 0.0, 0.45, 0.98] {
            assert!((to_partial(from_partial(r)) - r).abs() < 1e-9);
        }
    }

    #[test]
    fn partial_stays_bounded() {
        for x in [-1e9, -50.0, 0.0, 50.0, 1e9] {
            assert!(to_partial(x).abs() < 1.0);
        }
    }

    #[test]
    fn ar2_matches_closed_form() {
        let phi = partials_to_coefficients(&[0.5, -0.2]);
        assert!((phi[0] - 0.5 * 1.2).abs() < 1e-12);
        assert!((phi[1] + 0.2).abs() < 1e-12);
    }

    #[test]
    fn constrained_ar2_is_stationary() {
        for x in [[-40.0, 40.0], [40.0, 40.0], [3.0, -3.0], [0.1, 0.2]] {
            assert!(ar2_is_stationary(&constrain_ar(&x)));
        }
    }

    #[test]
    fn constrained_ma2_is_invertible() {
        for x in [[-40.0, 40.0], [40.0, -40.0], [0.7, 0.1]] {
            let theta = constrain_ma(&x);
            let as_ar: Vec<f64> = theta.iter().map(|t| -t).collect();
            assert!(ar2_is_stationary(&as_ar));
        }
    }

    #[test]
    fn yule_walker_recovers_ar1() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let mut x = vec![0.0_f64; 400];
        for t in 1..400 {
            x[t] = 0.6 * x[t - 1] + rng.gen_range(-0.5..0.5);
        }
        let partials = yule_walker_partials(&x, 2);
        assert!((partials[0] - 0.6).abs() < 0.15);
        assert!(partials[1].abs() < 0.2);
    }

    #[test]
    fn yule_walker_on_constant_is_zero() {
        assert_eq!(yule_walker_partials(&[5.0; 20], 2), vec![0.0, 0.0]);
    }
}
