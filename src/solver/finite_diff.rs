//! Numerical Jacobian for models without a closed form.

use nalgebra::{DMatrix, DVector};

use super::ResidualModel;

/// Forward-difference Jacobian of `model` at `params`.
///
/// Step per parameter is `sqrt(eps)·max(|xₖ|, 1)`.
pub fn forward_difference_jacobian(model: &dyn ResidualModel, params: &DVector<f64>) -> DMatrix<f64> {
    let m = model.residual_count();
    let n = params.len();
    let base = model.residuals(params);
    let mut j = DMatrix::<f64>::zeros(m, n);
    let scale = f64::EPSILON.sqrt();

    let mut trial = params.clone();
    for k in 0..n {
        let h = scale * params[k].abs().max(1.0);
        trial[k] = params[k] + h;
        let shifted = model.residuals(&trial);
        trial[k] = params[k];

        let column = (shifted - &base) / h;
        j.set_column(k, &column);
    }
    j
}
