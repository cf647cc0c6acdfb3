//! Surface regression driver.
//!
//! Given a `FitRequest` (table + initial guess) we:
//! - measure the starting sum of squares
//! - hand the surface residuals (and, optionally, their Jacobian) to the solver
//! - turn the solver's final Jacobian into a coefficient covariance
//! - scale standard errors by `c = max(1, sqrt(SSE / dof))`

use nalgebra::{DMatrix, DVector};

use crate::domain::{COEFFICIENT_NAMES, Coefficient, FitRequest, FitResult, PARAM_COUNT, Table};
use crate::error::{AppError, ErrorKind};
use crate::models::{jacobian, residuals, sum_of_squares};
use crate::solver::{LeastSquaresSolver, ResidualModel, SolverSettings};

/// Driver options that affect how the solver is invoked.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub settings: SolverSettings,
    /// Supply the closed-form Jacobian instead of letting the solver difference.
    pub analytic_jacobian: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            settings: SolverSettings::default(),
            analytic_jacobian: true,
        }
    }
}

/// The surface model bound to one table, as seen by the solver.
pub struct SurfaceProblem<'a> {
    table: &'a Table,
    analytic_jacobian: bool,
}

impl<'a> SurfaceProblem<'a> {
    pub fn new(table: &'a Table, analytic_jacobian: bool) -> Self {
        Self {
            table,
            analytic_jacobian,
        }
    }
}

impl ResidualModel for SurfaceProblem<'_> {
    fn residual_count(&self) -> usize {
        self.table.rows()
    }

    fn param_count(&self) -> usize {
        PARAM_COUNT
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        residuals(self.table, params.as_slice())
    }

    fn jacobian(&self, _params: &DVector<f64>) -> Option<DMatrix<f64>> {
        self.analytic_jacobian.then(|| jacobian(self.table))
    }
}

/// Fit the surface to `request`'s table and attach the result to it.
///
/// `observer` receives `(evaluation, coefficients)` for every trial point.
pub fn fit_surface(
    request: &mut FitRequest,
    solver: &dyn LeastSquaresSolver,
    options: &FitOptions,
    observer: &mut dyn FnMut(usize, &[f64]),
) -> Result<FitResult, AppError> {
    let table = request.table();
    validate(table, request.initial_guess(), &options.settings)?;

    let guess = *request.initial_guess();
    let n = table.rows();
    let initial_sse = sum_of_squares(table, &guess);
    log::info!(
        "fitting {n} points from guess {:?} (|f| = {:.6e})",
        guess,
        initial_sse.sqrt()
    );

    let problem = SurfaceProblem::new(table, options.analytic_jacobian);
    let outcome = solver.solve(
        &problem,
        DVector::from_row_slice(&guess),
        &options.settings,
        observer,
    );

    if !outcome.converged() {
        return Err(AppError::new(
            ErrorKind::SolverDivergence,
            format!(
                "Fit did not converge after {} evaluations: {}",
                outcome.evaluations, outcome.stop
            ),
        ));
    }
    if outcome.params.len() != PARAM_COUNT || outcome.params.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(
            ErrorKind::SolverDivergence,
            "Solver returned non-finite coefficients.",
        ));
    }

    let final_sse = sum_of_squares(table, outcome.params.as_slice());
    let covariance = covariance_from_jacobian(&outcome.jacobian)?;

    let dof = n - PARAM_COUNT;
    let variance_scale = if dof > 0 {
        (final_sse / dof as f64).sqrt().max(1.0)
    } else {
        1.0
    };

    let mut coefficients = COEFFICIENT_NAMES.map(|name| Coefficient {
        name,
        value: 0.0,
        std_error: 0.0,
    });
    for (i, c) in coefficients.iter_mut().enumerate() {
        c.value = outcome.params[i];
        c.std_error = variance_scale * covariance[(i, i)].max(0.0).sqrt();
    }

    log::info!(
        "converged after {} evaluations ({}), |f| = {:.6e}",
        outcome.evaluations,
        outcome.stop,
        final_sse.sqrt()
    );

    let result = FitResult {
        coefficients,
        evaluations: outcome.evaluations,
        initial_sse,
        final_sse,
        stop_reason: outcome.stop.to_string(),
        dof,
        variance_scale,
        covariance: covariance
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect(),
    };
    request.attach_result(result.clone());
    Ok(result)
}

fn validate(table: &Table, guess: &[f64], settings: &SolverSettings) -> Result<(), AppError> {
    if table.cols() < 3 {
        return Err(AppError::invalid_argument(format!(
            "Surface fit needs 3 columns (response, p1, p2); table has {}.",
            table.cols()
        )));
    }
    if table.rows() < PARAM_COUNT {
        return Err(AppError::invalid_argument(format!(
            "Surface fit needs at least {PARAM_COUNT} rows; table has {}.",
            table.rows()
        )));
    }
    if table.as_slice().iter().any(|v| !v.is_finite()) {
        return Err(AppError::invalid_argument("Table contains non-finite values."));
    }
    if guess.iter().any(|v| !v.is_finite()) {
        return Err(AppError::invalid_argument("Initial guess must be finite."));
    }
    if settings.max_iterations == 0 {
        return Err(AppError::invalid_argument("Max iterations must be at least 1."));
    }
    for (name, tol) in [("xtol", settings.xtol), ("gtol", settings.gtol), ("ftol", settings.ftol)] {
        if !tol.is_finite() || tol < 0.0 {
            return Err(AppError::invalid_argument(format!(
                "`{name}` must be finite and >= 0 (got {tol})."
            )));
        }
    }
    Ok(())
}

/// `(JᵀJ)⁻¹` via the SVD of `J`, without regularisation.
///
/// Directions with singular value at round-off level are dropped (their
/// variance is reported as 0) rather than inverted.
pub fn covariance_from_jacobian(j: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
    let n = j.ncols();
    let svd = j.clone().svd(false, true);
    let v_t = svd.v_t.as_ref().ok_or_else(|| {
        AppError::new(ErrorKind::SolverDivergence, "SVD of the final Jacobian failed.")
    })?;

    let s_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let tol = s_max * f64::EPSILON * j.nrows().max(n) as f64;

    let mut cov = DMatrix::<f64>::zeros(n, n);
    for (k, &s) in svd.singular_values.iter().enumerate() {
        if s <= tol {
            log::warn!("final Jacobian is rank deficient (singular value {s:.3e} dropped)");
            continue;
        }
        let v = v_t.row(k);
        cov += (v.transpose() * v) / (s * s);
    }
    Ok(cov)
}
