//! Trust-region Levenberg–Marquardt via the `levenberg-marquardt` crate.
//!
//! The crate drives a stateful `LeastSquaresProblem`; we adapt any
//! [`ResidualModel`] to it and map its termination report back to
//! [`StopReason`].

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use super::{LeastSquaresSolver, ResidualModel, SolverOutcome, SolverSettings, StopReason, forward_difference_jacobian};

/// MINPACK-style Levenberg–Marquardt.
///
/// `max_iterations` maps to the crate's patience: at most
/// `max_iterations · (params + 1)` residual evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenbergMarquardtSolver;

impl LeastSquaresSolver for LevenbergMarquardtSolver {
    fn solve(
        &self,
        model: &dyn ResidualModel,
        initial: DVector<f64>,
        settings: &SolverSettings,
        observer: &mut dyn FnMut(usize, &[f64]),
    ) -> SolverOutcome {
        let problem = Problem {
            model,
            params: initial,
            evaluations: 0,
            observer,
        };

        let (problem, report) = LevenbergMarquardt::new()
            .with_xtol(settings.xtol)
            .with_gtol(settings.gtol)
            .with_ftol(settings.ftol)
            .with_patience(settings.max_iterations.max(1))
            .minimize(problem);

        let params = problem.params;
        let jacobian = model
            .jacobian(&params)
            .unwrap_or_else(|| forward_difference_jacobian(model, &params));

        SolverOutcome {
            params,
            jacobian,
            evaluations: report.number_of_evaluations,
            stop: stop_reason(&report.termination),
        }
    }
}

struct Problem<'m, 'o> {
    model: &'m dyn ResidualModel,
    params: DVector<f64>,
    evaluations: usize,
    observer: &'o mut dyn FnMut(usize, &[f64]),
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for Problem<'_, '_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params = x.clone();
        self.evaluations += 1;
        (self.observer)(self.evaluations, self.params.as_slice());
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let r = self.model.residuals(&self.params);
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let j = self
            .model
            .jacobian(&self.params)
            .unwrap_or_else(|| forward_difference_jacobian(self.model, &self.params));
        j.iter().all(|v| v.is_finite()).then_some(j)
    }
}

fn stop_reason(termination: &TerminationReason) -> StopReason {
    match termination {
        TerminationReason::ResidualsZero => StopReason::ResidualsZero,
        TerminationReason::Orthogonal => StopReason::SmallGradient,
        TerminationReason::Converged { xtol: true, .. } => StopReason::SmallStep,
        TerminationReason::Converged { .. } => StopReason::SmallReduction,
        TerminationReason::LostPatience => StopReason::IterationLimit,
        other => StopReason::Failure(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a·exp(-k·t), residual = y_obs - model.
    struct Decay {
        t: Vec<f64>,
        y: Vec<f64>,
        analytic: bool,
    }

    impl ResidualModel for Decay {
        fn residual_count(&self) -> usize {
            self.t.len()
        }

        fn param_count(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.t.len(),
                self.t.iter().zip(&self.y).map(|(&t, &y)| y - x[0] * (-x[1] * t).exp()),
            )
        }

        fn jacobian(&self, x: &DVector<f64>) -> Option<DMatrix<f64>> {
            if !self.analytic {
                return None;
            }
            let mut j = DMatrix::zeros(self.t.len(), 2);
            for (i, &t) in self.t.iter().enumerate() {
                let e = (-x[1] * t).exp();
                j[(i, 0)] = -e;
                j[(i, 1)] = x[0] * t * e;
            }
            Some(j)
        }
    }

    fn decay(analytic: bool) -> Decay {
        let t: Vec<f64> = (0..12).map(|i| i as f64 * 0.5).collect();
        let y = t.iter().map(|&t| 4.0 * (-0.7 * t).exp()).collect();
        Decay { t, y, analytic }
    }

    #[test]
    fn recovers_exponential_decay_with_and_without_jacobian() {
        for analytic in [true, false] {
            let model = decay(analytic);
            let mut seen = 0usize;
            let out = LevenbergMarquardtSolver.solve(
                &model,
                DVector::from_vec(vec![1.0, 0.1]),
                &SolverSettings::default(),
                &mut |_, _| seen += 1,
            );
            assert!(out.converged(), "stopped with {:?}", out.stop);
            assert!((out.params[0] - 4.0).abs() < 1e-5);
            assert!((out.params[1] - 0.7).abs() < 1e-5);
            assert_eq!(out.jacobian.nrows(), 12);
            assert_eq!(out.jacobian.ncols(), 2);
            assert!(seen > 0);
        }
    }

    #[test]
    fn tight_iteration_cap_is_reported() {
        let settings = SolverSettings {
            max_iterations: 1,
            ..SolverSettings::default()
        };
        let out = LevenbergMarquardtSolver.solve(
            &decay(true),
            DVector::from_vec(vec![1.0, 0.1]),
            &settings,
            &mut |_, _| {},
        );
        assert_eq!(out.stop, StopReason::IterationLimit);
        assert!(!out.converged());
    }
}
