//! Nonlinear least-squares solver seam.
//!
//! The regression driver only talks to [`LeastSquaresSolver`]; the default
//! implementation wraps the `levenberg-marquardt` crate. Anything that can
//! minimise `Σ rᵢ(x)²` from residual (and optionally Jacobian) callbacks can be
//! plugged in instead.

use nalgebra::{DMatrix, DVector};

pub mod finite_diff;
pub mod levenberg_marquardt;

pub use finite_diff::forward_difference_jacobian;
pub use levenberg_marquardt::LevenbergMarquardtSolver;

/// Residual callbacks for a least-squares problem.
pub trait ResidualModel {
    fn residual_count(&self) -> usize;

    fn param_count(&self) -> usize;

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Closed-form Jacobian, or `None` to let the solver difference numerically.
    fn jacobian(&self, params: &DVector<f64>) -> Option<DMatrix<f64>>;
}

/// Convergence limits.
#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    pub max_iterations: usize,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Gradient orthogonality tolerance.
    pub gtol: f64,
    /// Relative reduction tolerance on the sum of squares.
    pub ftol: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            xtol: 1e-8,
            gtol: 1e-8,
            ftol: 1e-8,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Residuals reached exactly zero.
    ResidualsZero,
    /// Step size below `xtol`.
    SmallStep,
    /// Relative reduction below `ftol`.
    SmallReduction,
    /// Residuals orthogonal to the Jacobian columns (`gtol`).
    SmallGradient,
    /// Iteration cap reached.
    IterationLimit,
    /// Numerical breakdown (non-finite values, bad dimensions, ...).
    Failure(String),
}

impl StopReason {
    pub fn converged(&self) -> bool {
        matches!(
            self,
            StopReason::ResidualsZero | StopReason::SmallStep | StopReason::SmallReduction | StopReason::SmallGradient
        )
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ResidualsZero => write!(f, "residuals are zero"),
            StopReason::SmallStep => write!(f, "small step size"),
            StopReason::SmallReduction => write!(f, "small reduction in sum of squares"),
            StopReason::SmallGradient => write!(f, "small gradient"),
            StopReason::IterationLimit => write!(f, "iteration limit reached"),
            StopReason::Failure(msg) => write!(f, "solver failure: {msg}"),
        }
    }
}

/// Raw solver output, before the driver turns it into a `FitResult`.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub params: DVector<f64>,
    /// Jacobian evaluated at `params`.
    pub jacobian: DMatrix<f64>,
    pub evaluations: usize,
    pub stop: StopReason,
}

impl SolverOutcome {
    pub fn converged(&self) -> bool {
        self.stop.converged()
    }
}

/// A nonlinear least-squares strategy.
///
/// `observer` is called with `(evaluation index, trial parameters)` each time
/// the solver moves to a new trial point. It sees the parameters read-only.
pub trait LeastSquaresSolver {
    fn solve(
        &self,
        model: &dyn ResidualModel,
        initial: DVector<f64>,
        settings: &SolverSettings,
        observer: &mut dyn FnMut(usize, &[f64]),
    ) -> SolverOutcome;
}
