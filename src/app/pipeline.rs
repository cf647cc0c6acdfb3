//! Shared "fit pipeline" logic used by the CLI and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! tuple file -> table -> fit -> residuals
//!
//! Callers then focus on presentation (printing, plotting, exports).

use crate::domain::{FitConfig, FitRequest, FitResult};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_surface};
use crate::io::ingest::{IngestOptions, IngestedTable, read_table};
use crate::report::ResidualRow;
use crate::solver::{LevenbergMarquardtSolver, SolverSettings};

/// All computed outputs of a single `surfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedTable,
    pub fit: FitResult,
    pub residuals: Vec<ResidualRow>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig, observer: &mut dyn FnMut(usize, &[f64])) -> Result<RunOutput, AppError> {
    // 1) Read the tuple file.
    let ingest = read_table(&config.input, config.tuple_size, &ingest_options(config))?;
    log::info!(
        "read {} rows from {} ({} lines, {} warnings)",
        ingest.rows_used,
        config.input.display(),
        ingest.lines_read,
        ingest.warnings.len()
    );

    // 2) Fit the surface.
    let mut request = FitRequest::new(ingest.table.clone(), config.initial_guess);
    let fit = fit_surface(&mut request, &LevenbergMarquardtSolver, &fit_options(config), observer)?;

    // 3) Per-row residuals.
    let residuals = crate::report::compute_residuals(request.table(), &fit);

    Ok(RunOutput {
        ingest,
        fit,
        residuals,
    })
}

pub fn ingest_options(config: &FitConfig) -> IngestOptions {
    IngestOptions {
        comment_char: config.comment_char,
        separator: config.separator,
        on_parse_failure: config.on_parse_failure,
    }
}

pub fn fit_options(config: &FitConfig) -> FitOptions {
    FitOptions {
        settings: SolverSettings {
            max_iterations: config.max_iterations,
            xtol: config.xtol,
            gtol: config.gtol,
            ftol: config.ftol,
        },
        analytic_jacobian: config.analytic_jacobian,
    }
}
