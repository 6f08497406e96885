// src/algorithms/surrogate.rs

use crate::core::{Instance, LimeError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Default L2 penalty. Keeps one-hot text columns solvable when they are
/// collinear or outnumber the samples.
pub const DEFAULT_REGULARIZATION: f64 = 1e-3;

/// Penalty used when escalating from an unpenalized fit.
const MIN_JITTER: f64 = 1e-8;
const MAX_SOLVE_ATTEMPTS: usize = 8;
const VARIANCE_EPSILON: f64 = 1e-12;

/// Result of a surrogate fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateFit {
    /// One coefficient per encoded column.
    pub coefficients: Instance,
    pub intercept: f64,
    /// Weighted coefficient of determination of the surrogate on its own
    /// training data.
    pub weighted_r2: f64,
    /// The L2 penalty that was finally used.
    pub regularization: f64,
    /// True when no solve succeeded and all coefficients were zeroed.
    pub degraded: bool,
}

/// Weighted ridge regression, minimizing
/// `Σ wᵢ (yᵢ − b − xᵢ·β)² + λ‖β‖²`.
///
/// The intercept `b` is not penalized. Columns without weighted variance get a
/// zero coefficient. If the penalized normal equations still cannot be
/// factored the penalty is raised tenfold and retried; when every attempt
/// fails the fit degrades to zero coefficients instead of erroring.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRidge {
    regularization: f64,
    fit_intercept: bool,
}

impl Default for WeightedRidge {
    fn default() -> Self {
        WeightedRidge {
            regularization: DEFAULT_REGULARIZATION,
            fit_intercept: true,
        }
    }
}

impl WeightedRidge {
    pub fn new(regularization: f64, fit_intercept: bool) -> Self {
        WeightedRidge {
            regularization,
            fit_intercept,
        }
    }

    pub fn fit(&self, x: ArrayView2<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>) -> Result<SurrogateFit> {
        let (n_samples, n_features) = x.dim();
        if y.len() != n_samples || weights.len() != n_samples {
            return Err(LimeError::ShapeMismatch(format!(
                "surrogate got {} rows, {} targets and {} weights",
                n_samples,
                y.len(),
                weights.len()
            )));
        }

        let weights: Instance = weights.mapv(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
        let weight_sum = weights.sum();
        if n_samples == 0 || weight_sum <= f64::MIN_POSITIVE {
            return Ok(SurrogateFit {
                coefficients: Instance::zeros(n_features),
                intercept: y.mean().unwrap_or(0.0),
                weighted_r2: 0.0,
                regularization: self.regularization,
                degraded: n_samples > 0,
            });
        }

        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x.t().dot(&weights) / weight_sum;
            let y_mean = y.dot(&weights) / weight_sum;
            (x_mean, y_mean)
        } else {
            (Instance::zeros(n_features), 0.0)
        };

        let sqrt_w = weights.mapv(f64::sqrt).insert_axis(Axis(1));
        let x_weighted: Array2<f64> = (&x - &x_mean.view().insert_axis(Axis(0))) * &sqrt_w;
        let y_weighted: Instance = (&y - y_mean) * &sqrt_w.column(0);

        let active: Vec<usize> = (0..n_features)
            .filter(|&j| x_weighted.column(j).iter().map(|v| v * v).sum::<f64>() > VARIANCE_EPSILON)
            .collect();
        let x_active = x_weighted.select(Axis(1), &active);
        let gram = x_active.t().dot(&x_active);
        let moment = x_active.t().dot(&y_weighted);

        let mut coefficients = Instance::zeros(n_features);
        let mut regularization = self.regularization;
        let mut degraded = false;
        if !active.is_empty() {
            let mut solution = None;
            for _ in 0..MAX_SOLVE_ATTEMPTS {
                let mut penalized = gram.clone();
                penalized.diag_mut().mapv_inplace(|d| d + regularization);
                solution = solve_normal_equations(&penalized, &moment);
                if solution.is_some() {
                    break;
                }
                tracing::debug!(regularization, "Normal equations not factorable, raising penalty");
                regularization = if regularization > 0.0 { regularization * 10.0 } else { MIN_JITTER };
            }
            match solution {
                Some(beta) => {
                    for (&j, &b) in active.iter().zip(beta.iter()) {
                        coefficients[j] = b;
                    }
                }
                None => degraded = true,
            }
        }

        let intercept = if self.fit_intercept {
            y_mean - x_mean.dot(&coefficients)
        } else {
            0.0
        };
        let weighted_r2 = weighted_r2(x, y, weights.view(), &coefficients, intercept);

        Ok(SurrogateFit {
            coefficients,
            intercept,
            weighted_r2,
            regularization,
            degraded,
        })
    }
}

fn weighted_r2(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    coefficients: &Instance,
    intercept: f64,
) -> f64 {
    let weight_sum = weights.sum();
    let y_mean = y.dot(&weights) / weight_sum;
    let predictions = x.dot(coefficients) + intercept;
    let ss_res: f64 = (&y - &predictions).mapv(|r| r * r).dot(&weights);
    let ss_tot: f64 = y.mapv(|v| (v - y_mean).powi(2)).dot(&weights);
    if ss_tot > VARIANCE_EPSILON {
        1.0 - ss_res / ss_tot
    } else if ss_res <= VARIANCE_EPSILON {
        1.0
    } else {
        0.0
    }
}

#[cfg(feature = "linalg")]
fn solve_normal_equations(a: &Array2<f64>, b: &Instance) -> Option<Instance> {
    use ndarray_linalg::Solve;
    match a.solve(b) {
        Ok(solution) if solution.iter().all(|v| v.is_finite()) => Some(solution),
        _ => cholesky_solve(a, b),
    }
}

#[cfg(not(feature = "linalg"))]
fn solve_normal_equations(a: &Array2<f64>, b: &Instance) -> Option<Instance> {
    cholesky_solve(a, b)
}

/// Solves `a·x = b` for symmetric positive definite `a`. Returns `None` when
/// `a` is not numerically positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Instance) -> Option<Instance> {
    let n = a.nrows();
    let scale = a.diag().iter().fold(0.0f64, |m, &d| m.max(d.abs())).max(1.0);
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let partial: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let pivot = a[[i, i]] - partial;
                if !pivot.is_finite() || pivot <= VARIANCE_EPSILON * scale {
                    return None;
                }
                l[[i, i]] = pivot.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - partial) / l[[j, j]];
            }
        }
    }

    // forward: L·z = b
    let mut z = Instance::zeros(n);
    for i in 0..n {
        let partial: f64 = (0..i).map(|k| l[[i, k]] * z[k]).sum();
        z[i] = (b[i] - partial) / l[[i, i]];
    }
    // backward: Lᵀ·x = z
    let mut x = Instance::zeros(n);
    for i in (0..n).rev() {
        let partial: f64 = (i + 1..n).map(|k| l[[k, i]] * x[k]).sum();
        x[i] = (z[i] - partial) / l[[i, i]];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn recovers_exact_linear_relationship() -> Result<()> {
        // y = 1 + 2*x0 - 3*x1
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let y = array![1.0, 3.0, -2.0, 0.0, 2.0];
        let w = Array1::ones(5);
        let fit = WeightedRidge::new(0.0, true).fit(x.view(), y.view(), w.view())?;

        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], -3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.weighted_r2, 1.0, epsilon = 1e-9);
        assert!(!fit.degraded);
        Ok(())
    }

    #[test]
    fn weights_pull_the_fit_toward_heavy_samples() -> Result<()> {
        let x = array![[0.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 3.0];
        let heavy_last = WeightedRidge::new(0.0, true).fit(x.view(), y.view(), array![1.0, 1.0, 100.0].view())?;
        let heavy_middle = WeightedRidge::new(0.0, true).fit(x.view(), y.view(), array![1.0, 100.0, 1.0].view())?;
        assert!(heavy_last.coefficients[0] > heavy_middle.coefficients[0]);
        Ok(())
    }

    #[test]
    fn collinear_columns_do_not_fail() -> Result<()> {
        let x = array![[1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let y = array![1.0, 0.0, 1.0, 0.0];
        let w = Array1::ones(4);

        let fit = WeightedRidge::new(0.0, true).fit(x.view(), y.view(), w.view())?;
        assert!(fit.coefficients.iter().all(|c| c.is_finite()));
        assert!(fit.regularization > 0.0);
        assert_relative_eq!(fit.coefficients[0], fit.coefficients[1], epsilon = 1e-6);
        assert_relative_eq!(fit.coefficients.sum(), 1.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn zero_variance_columns_get_zero_coefficients() -> Result<()> {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let y = array![0.0, 1.0, 2.0];
        let fit = WeightedRidge::default().fit(x.view(), y.view(), Array1::ones(3).view())?;
        assert_eq!(fit.coefficients[0], 0.0);
        assert!(fit.coefficients[1] > 0.9);
        Ok(())
    }

    #[test]
    fn single_sample_is_degenerate_but_well_formed() -> Result<()> {
        let x = array![[1.0, 0.0, 1.0]];
        let y = array![0.7];
        let fit = WeightedRidge::default().fit(x.view(), y.view(), array![0.4].view())?;
        assert_eq!(fit.coefficients.to_vec(), vec![0.0, 0.0, 0.0]);
        assert_relative_eq!(fit.intercept, 0.7, epsilon = 1e-12);
        assert!(!fit.degraded);
        Ok(())
    }

    #[test]
    fn vanishing_weights_degrade_to_zero() -> Result<()> {
        let x = array![[1.0], [0.0]];
        let y = array![1.0, 0.0];
        let fit = WeightedRidge::default().fit(x.view(), y.view(), array![0.0, 0.0].view())?;
        assert!(fit.degraded);
        assert_eq!(fit.coefficients.to_vec(), vec![0.0]);
        Ok(())
    }

    #[test]
    fn empty_design_matrix() -> Result<()> {
        let x = Array2::<f64>::zeros((0, 2));
        let empty = Array1::<f64>::zeros(0);
        let fit = WeightedRidge::default().fit(x.view(), empty.view(), empty.view())?;
        assert_eq!(fit.coefficients.len(), 2);
        assert!(!fit.degraded);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let x = array![[1.0], [0.0]];
        let err = WeightedRidge::default()
            .fit(x.view(), array![1.0].view(), array![1.0, 1.0].view())
            .unwrap_err();
        assert!(matches!(err, LimeError::ShapeMismatch(_)));
    }

    #[test]
    fn cholesky_rejects_singular_matrices() {
        let singular = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(cholesky_solve(&singular, &array![1.0, 1.0]).is_none());
        let spd = array![[4.0, 2.0], [2.0, 3.0]];
        let x = cholesky_solve(&spd, &array![2.0, 1.0]).unwrap();
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
    }
}
