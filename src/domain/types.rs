//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during ingestion and fitting
//! - exported to JSON/CSV at the end of a run

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of free coefficients in the surface model.
pub const PARAM_COUNT: usize = 5;

/// Column holding the measured response.
pub const RESPONSE_COL: usize = 0;
/// Column holding the first predictor (`p1`).
pub const P1_COL: usize = 1;
/// Column holding the second predictor (`p2`).
pub const P2_COL: usize = 2;

/// Coefficients `b0..b4` of the surface model.
pub type Coefficients = [f64; PARAM_COUNT];

/// Display names for `b0..b4`, in vector order.
pub const COEFFICIENT_NAMES: [&str; PARAM_COUNT] = ["b0", "b1", "b2", "b3", "b4"];

/// What ingestion does with a field that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ParseFailurePolicy {
    /// Keep the row and store `0.0` in the bad slot.
    #[default]
    ZeroFill,
    /// Drop the whole row.
    SkipRow,
    /// Stop reading and return an error.
    Abort,
}

/// Dense row-major matrix of measurements.
///
/// Rows mirror file order. Column layout for fitting is
/// `[response, p1, p2, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Table {
    /// Build a table from row-major `data`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, AppError> {
        if cols == 0 {
            return Err(AppError::invalid_argument("Table must have at least one column."));
        }
        if data.len() != rows * cols {
            return Err(AppError::invalid_argument(format!(
                "Table data has {} values, expected {rows}x{cols}.",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a table from equally sized rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, AppError> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(AppError::invalid_argument(format!(
                    "Row {i} has {} fields, expected {cols}.",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_row_major(rows.len(), cols, data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.rows()`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.cols)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }
}

/// One fitted coefficient with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: &'static str,
    pub value: f64,
    pub std_error: f64,
}

/// Output of a converged surface fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub coefficients: [Coefficient; PARAM_COUNT],
    /// Residual evaluations performed by the solver.
    pub evaluations: usize,
    pub initial_sse: f64,
    pub final_sse: f64,
    /// Stopping reason reported by the solver.
    pub stop_reason: String,
    /// `rows - PARAM_COUNT`.
    pub dof: usize,
    /// `max(1, sqrt(final_sse / dof))`, applied to every standard error.
    pub variance_scale: f64,
    /// Unscaled `(JᵀJ)⁻¹`, row-major.
    pub covariance: Vec<Vec<f64>>,
}

impl FitResult {
    /// Euclidean norm of the residual vector at the initial guess.
    pub fn initial_norm(&self) -> f64 {
        self.initial_sse.sqrt()
    }

    /// Euclidean norm of the residual vector at the solution.
    pub fn final_norm(&self) -> f64 {
        self.final_sse.sqrt()
    }

    pub fn values(&self) -> Coefficients {
        let mut out = [0.0; PARAM_COUNT];
        for (slot, c) in out.iter_mut().zip(self.coefficients.iter()) {
            *slot = c.value;
        }
        out
    }

    /// `sqrt(final_sse / dof)`, the residual standard error before flooring.
    pub fn residual_std_error(&self) -> Option<f64> {
        (self.dof > 0).then(|| (self.final_sse / self.dof as f64).sqrt())
    }
}

/// Data plus starting point for a fit.
///
/// The driver borrows the table read-only and attaches its result here; the
/// table is never resized.
#[derive(Debug, Clone)]
pub struct FitRequest {
    table: Table,
    initial_guess: Coefficients,
    result: Option<FitResult>,
}

impl FitRequest {
    pub fn new(table: Table, initial_guess: Coefficients) -> Self {
        Self {
            table,
            initial_guess,
            result: None,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn initial_guess(&self) -> &Coefficients {
        &self.initial_guess
    }

    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    pub fn attach_result(&mut self, result: FitResult) {
        self.result = Some(result);
    }

    pub fn into_parts(self) -> (Table, Option<FitResult>) {
        (self.table, self.result)
    }
}

/// A full run’s configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub tuple_size: usize,
    pub comment_char: char,
    pub separator: char,
    pub on_parse_failure: ParseFailurePolicy,

    pub initial_guess: Coefficients,
    pub max_iterations: usize,
    pub xtol: f64,
    pub gtol: f64,
    pub ftol: f64,
    /// Use the closed-form Jacobian (otherwise finite differences).
    pub analytic_jacobian: bool,
    /// Write one trace line per solver evaluation.
    pub trace: bool,

    pub plot: bool,
    pub plot_output: Option<PathBuf>,
    pub gnuplot: String,
    pub svg_output: Option<PathBuf>,

    pub export_json: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
}
