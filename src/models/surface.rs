//! Quadratic surface in two predictors.
//!
//! ```text
//! predicted = b0·p1 + b1·p2 + b2·p1² + b3·p2² + b4
//! residual  = r - predicted
//! ```
//!
//! Table rows are read as `[r, p1, p2, ...]` everywhere in this module, for
//! the residuals and the Jacobian alike.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Coefficients, P1_COL, P2_COL, PARAM_COUNT, RESPONSE_COL, Table};

/// Predicted response at `(p1, p2)`.
pub fn predict(b: &[f64], p1: f64, p2: f64) -> f64 {
    b[0] * p1 + b[1] * p2 + b[2] * p1 * p1 + b[3] * p2 * p2 + b[4]
}

/// Signed residual `r - predicted` for one table row.
pub fn residual(b: &[f64], row: &[f64]) -> f64 {
    row[RESPONSE_COL] - predict(b, row[P1_COL], row[P2_COL])
}

/// Fill the Jacobian row `∂residual/∂b` for one table row.
///
/// The model is linear in `b`, so the row does not depend on the coefficients.
pub fn fill_jacobian_row(row: &[f64], out: &mut [f64]) {
    let p1 = row[P1_COL];
    let p2 = row[P2_COL];
    out[0] = -p1;
    out[1] = -p2;
    out[2] = -p1 * p1;
    out[3] = -p2 * p2;
    out[4] = -1.0;
}

/// Residuals for every row, in row order.
pub fn residuals(table: &Table, b: &[f64]) -> DVector<f64> {
    DVector::from_iterator(table.rows(), table.iter_rows().map(|row| residual(b, row)))
}

/// Analytic Jacobian of [`residuals`] (`rows × 5`).
pub fn jacobian(table: &Table) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(table.rows(), PARAM_COUNT);
    let mut buf = [0.0; PARAM_COUNT];
    for (i, row) in table.iter_rows().enumerate() {
        fill_jacobian_row(row, &mut buf);
        for (k, v) in buf.iter().enumerate() {
            j[(i, k)] = *v;
        }
    }
    j
}

/// Residual sum of squares at `b`.
pub fn sum_of_squares(table: &Table, b: &[f64]) -> f64 {
    table
        .iter_rows()
        .map(|row| {
            let r = residual(b, row);
            r * r
        })
        .sum()
}

/// Gnuplot-compatible formula with the coefficients substituted.
pub fn formula(b: &Coefficients, x: &str, y: &str) -> String {
    format!(
        "{:.10e}*{x} + {:.10e}*{y} + {:.10e}*{x}**2 + {:.10e}*{y}**2 + {:.10e}",
        b[0], b[1], b[2], b[3], b[4]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_formula() {
        let b = [2.0, 3.0, 0.5, 0.1, 1.0];
        // 2*1 + 3*2 + 0.5*1 + 0.1*4 + 1
        assert!((predict(&b, 1.0, 2.0) - 9.9).abs() < 1e-12);
    }

    #[test]
    fn residual_is_measured_minus_predicted() {
        let b = [1.0, 1.0, 0.0, 0.0, 0.0];
        assert!((residual(&b, &[10.0, 3.0, 4.0]) - 3.0).abs() < 1e-12);
        assert!((residual(&b, &[5.0, 3.0, 4.0]) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn jacobian_matches_central_differences() {
        let table = Table::from_rows(&[[3.0, 1.5, -2.0], [0.5, -0.7, 0.3], [8.0, 2.0, 2.5]]).unwrap();
        let b = [0.3, -1.2, 0.8, 0.05, 2.0];
        let j = jacobian(&table);
        let h = 1e-6;
        for k in 0..PARAM_COUNT {
            let mut up = b;
            let mut down = b;
            up[k] += h;
            down[k] -= h;
            let d = (residuals(&table, &up) - residuals(&table, &down)) / (2.0 * h);
            for i in 0..table.rows() {
                assert!(
                    (j[(i, k)] - d[i]).abs() < 1e-6,
                    "J[{i},{k}] = {} but finite difference gives {}",
                    j[(i, k)],
                    d[i]
                );
            }
        }
    }

    #[test]
    fn sum_of_squares_is_zero_on_the_surface() {
        let b = [2.0, 3.0, 0.5, 0.1, 1.0];
        let rows: Vec<[f64; 3]> = [(0.0, 0.0), (1.0, -1.0), (2.5, 3.0)]
            .iter()
            .map(|&(p1, p2)| [predict(&b, p1, p2), p1, p2])
            .collect();
        let table = Table::from_rows(&rows).unwrap();
        assert!(sum_of_squares(&table, &b) < 1e-20);
        assert!(sum_of_squares(&table, &[0.0; 5]) > 1.0);
    }

    #[test]
    fn formula_embeds_all_coefficients() {
        let f = formula(&[1.0, 2.0, 3.0, 4.0, 5.0], "x", "y");
        assert!(f.contains("*x**2"));
        assert!(f.contains("*y**2"));
        assert!(f.contains("5.0000000000e0"));
    }
}
