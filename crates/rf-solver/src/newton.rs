//! Newton solver with backtracking line search and a lower bound on unknowns.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Newton solver configuration.
#[derive(Clone, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm
    pub rel_tol: f64,
    /// Lower bound every unknown must respect (e.g. minimum pressure in Pa)
    pub min_value: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            abs_tol: 1e-6,
            rel_tol: 1e-10,
            min_value: 1.0,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of Newton iterations
    pub iterations: usize,
    /// Number of linear solves (one per iteration, counted separately so
    /// callers can report them like an iterative linear solver would)
    pub linear_solves: usize,
}

fn within_bounds(x: &DVector<f64>, min_value: f64) -> bool {
    x.iter().all(|v| v.is_finite() && *v >= min_value)
}

fn checked_norm(r: &DVector<f64>) -> SolverResult<f64> {
    let norm = r.norm();
    if norm.is_finite() {
        Ok(norm)
    } else {
        Err(SolverError::Numeric {
            what: "non-finite residual".to_string(),
        })
    }
}

/// Newton solver with line search and positivity constraints.
///
/// Errors are split so callers can classify them: `ConvergenceFailed` when the
/// iteration budget runs out or the line search stagnates, `Numeric` for a
/// singular Jacobian or non-finite residual, `InvalidState` when no damped step
/// keeps the unknowns above `min_value`.
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    if !within_bounds(&x0, config.min_value) {
        return Err(SolverError::InvalidState {
            what: "initial guess violates lower bound".to_string(),
        });
    }

    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = checked_norm(&r)?;
    let r0_norm = r_norm;
    let mut linear_solves = 0;

    for iter in 0..config.max_iterations {
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                linear_solves,
            });
        }

        let jac = jacobian_fn(&x)?;

        // Solve J * dx = -r
        let dx = jac
            .lu()
            .solve(&(-r.clone()))
            .ok_or_else(|| SolverError::Numeric {
                what: "Jacobian solve failed".to_string(),
            })?;
        linear_solves += 1;

        let mut alpha = 1.0;
        let mut accepted = None;
        let mut saw_feasible = false;
        for _ in 0..config.max_line_search_iters {
            let x_new = &x + alpha * &dx;
            if within_bounds(&x_new, config.min_value) {
                saw_feasible = true;
                let r_new = residual_fn(&x_new)?;
                let r_new_norm = checked_norm(&r_new)?;
                if r_new_norm < r_norm {
                    accepted = Some((x_new, r_new, r_new_norm));
                    break;
                }
            }
            alpha *= config.line_search_beta;
        }

        let Some((x_new, r_new, r_new_norm)) = accepted else {
            if !saw_feasible {
                return Err(SolverError::InvalidState {
                    what: format!("unknowns fell below {} at iteration {}", config.min_value, iter),
                });
            }
            return Err(SolverError::ConvergenceFailed {
                what: format!("line search stagnated, residual = {r_norm:e}"),
                iterations: iter + 1,
            });
        };

        x = x_new;
        r = r_new;
        r_norm = r_new_norm;
    }

    if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
            linear_solves,
        });
    }

    Err(SolverError::ConvergenceFailed {
        what: format!("maximum iterations reached, residual = {r_norm:e}"),
        iterations: config.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_residual(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
    }

    fn quadratic_jacobian(x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
    }

    #[test]
    fn simple_quadratic() {
        // Solve x^2 - 4 = 0, x > 0
        let x0 = DVector::from_element(1, 3.0);
        let config = NewtonConfig::default();
        let result = newton_solve(x0, quadratic_residual, quadratic_jacobian, &config).unwrap();

        assert!((result.x[0] - 2.0).abs() < 1e-6);
        assert!(result.iterations > 0);
        assert_eq!(result.iterations, result.linear_solves);
    }

    #[test]
    fn already_converged_needs_no_iterations() {
        let x0 = DVector::from_element(1, 2.0);
        let result = newton_solve(
            x0,
            quadratic_residual,
            quadratic_jacobian,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn iteration_budget_is_non_convergence() {
        let x0 = DVector::from_element(1, 1000.0);
        let config = NewtonConfig {
            max_iterations: 2,
            ..NewtonConfig::default()
        };
        let err = newton_solve(x0, quadratic_residual, quadratic_jacobian, &config).unwrap_err();
        assert!(err.is_non_convergence());
    }

    #[test]
    fn singular_jacobian_is_numeric_breakdown() {
        let x0 = DVector::from_element(1, 3.0);
        let zero_jac = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::zeros(1, 1))
        };
        let err =
            newton_solve(x0, quadratic_residual, zero_jac, &NewtonConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::Numeric { .. }));
        assert!(!err.is_non_convergence());
    }

    #[test]
    fn root_below_bound_is_invalid_state() {
        // Root at x = -2 only reachable by crossing the bound at 1.0.
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] + 2.0))
        };
        let jacobian = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 1.0))
        };
        let config = NewtonConfig {
            max_line_search_iters: 3,
            ..NewtonConfig::default()
        };
        let err = newton_solve(DVector::from_element(1, 3.0), residual, jacobian, &config)
            .unwrap_err();
        assert!(!err.is_non_convergence());
    }
}
