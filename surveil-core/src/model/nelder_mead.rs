//! Deterministic Nelder–Mead simplex minimiser.
//!
//! Used for the conditional-sum-of-squares fit, where the objective is cheap,
//! low-dimensional and has no closed-form gradient.

/// Simplex search settings.
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub max_iter: usize,
    /// Tolerance on the spread of objective values across the simplex,
    /// scaled by `1 + |best|`.
    pub ftol: f64,
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            ftol: 1e-10,
            initial_step: 0.5,
        }
    }
}

/// Best point found by the search.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimise `f` starting at `start`. Non-finite objective values are
    /// treated as +inf so the simplex moves away from them.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let n = start.len();
        if n == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), eval(start)));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            let spread = worst - best;
            if spread.is_finite() && spread <= self.ftol * (1.0 + best.abs()) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let worst_point = simplex[n].0.clone();
            let second_worst = simplex[n - 1].1;

            let reflected = step_from(&centroid, &worst_point, -REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < best {
                let expanded = step_from(&centroid, &reflected, EXPAND);
                let f_expanded = eval(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < second_worst {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let (contracted, accept_below) = if f_reflected < worst {
                (step_from(&centroid, &reflected, CONTRACT), f_reflected)
            } else {
                (step_from(&centroid, &worst_point, CONTRACT), worst)
            };
            let f_contracted = eval(&contracted);
            if f_contracted < accept_below {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            // Shrink toward the best vertex.
            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = step_from(&anchor, &vertex.0, SHRINK);
                let value = eval(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (point, value) = simplex.swap_remove(0);
        Minimum {
            point,
            value,
            iterations,
            converged,
        }
    }
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dims = vertices[0].0.len();
    let mut c = vec![0.0; dims];
    for (v, _) in vertices {
        for (ci, vi) in c.iter_mut().zip(v) {
            *ci += vi;
        }
    }
    let k = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= k);
    c
}

/// `origin + coef * (towards - origin)`
fn step_from(origin: &[f64], towards: &[f64], coef: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(towards)
        .map(|(o, t)| o + coef * (t - o))
        .collect()
}
