//! Reporting utilities: per-row residuals and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{Coefficients, FitResult, P1_COL, P2_COL, RESPONSE_COL, Table};
use crate::models::predict;

pub mod format;

pub use format::*;

/// Fitted value and residual for one table row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualRow {
    pub index: usize,
    pub response: f64,
    pub p1: f64,
    pub p2: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals for each row, in table order.
pub fn compute_residuals(table: &Table, fit: &FitResult) -> Vec<ResidualRow> {
    residuals_for(table, &fit.values())
}

pub fn residuals_for(table: &Table, b: &Coefficients) -> Vec<ResidualRow> {
    table
        .iter_rows()
        .enumerate()
        .map(|(index, row)| {
            let (response, p1, p2) = (row[RESPONSE_COL], row[P1_COL], row[P2_COL]);
            let fitted = predict(b, p1, p2);
            ResidualRow {
                index,
                response,
                p1,
                p2,
                fitted,
                residual: response - fitted,
            }
        })
        .collect()
}
