//! Export fit results.
//!
//! - JSON: coefficients, errors, covariance and solver diagnostics
//! - CSV: per-row fitted values and residuals, easy to consume in spreadsheets

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::FitResult;
use crate::error::AppError;
use crate::report::ResidualRow;

/// On-disk schema of `--export-json`.
#[derive(Debug, Serialize)]
pub struct FitExport<'a> {
    pub tool: &'static str,
    pub source: String,
    pub model: &'static str,
    pub fit: &'a FitResult,
    pub residual_std_error: Option<f64>,
}

/// Write the fit summary as pretty JSON.
pub fn write_fit_json(path: &Path, source: &Path, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let export = FitExport {
        tool: "surfit",
        source: source.display().to_string(),
        model: "r = b0*p1 + b1*p2 + b2*p1^2 + b3*p2^2 + b4",
        fit,
        residual_std_error: fit.residual_std_error(),
    };

    serde_json::to_writer_pretty(file, &export)
        .map_err(|e| AppError::io(format!("Failed to write fit JSON: {e}")))?;
    log::info!("wrote fit JSON to {}", path.display());
    Ok(())
}

/// Write one CSV line per row: `index,response,p1,p2,fitted,residual`.
pub fn write_residuals_csv(path: &Path, rows: &[ResidualRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create residual CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["index", "response", "p1", "p2", "fitted", "residual"])
        .map_err(|e| AppError::io(format!("Failed to write residual CSV header: {e}")))?;

    for r in rows {
        writer
            .write_record([
                r.index.to_string(),
                r.response.to_string(),
                r.p1.to_string(),
                r.p2.to_string(),
                format!("{:.10}", r.fitted),
                format!("{:.10}", r.residual),
            ])
            .map_err(|e| AppError::io(format!("Failed to write residual CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush residual CSV: {e}")))?;
    log::info!("wrote {} residual rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{COEFFICIENT_NAMES, Coefficient};

    fn fit() -> FitResult {
        FitResult {
            coefficients: COEFFICIENT_NAMES.map(|name| Coefficient {
                name,
                value: 2.0,
                std_error: 0.25,
            }),
            evaluations: 12,
            initial_sse: 50.0,
            final_sse: 2.0,
            stop_reason: "small step size".to_string(),
            dof: 2,
            variance_scale: 1.0,
            covariance: vec![vec![0.0; 5]; 5],
        }
    }

    #[test]
    fn fit_json_has_coefficients_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&path, Path::new("in.csv"), &fit()).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "surfit");
        assert_eq!(value["source"], "in.csv");
        assert_eq!(value["fit"]["evaluations"], 12);
        assert!(value["fit"].get("iterations").is_none());
        assert_eq!(value["fit"]["coefficients"][3]["name"], "b3");
        assert_eq!(value["fit"]["coefficients"][3]["std_error"], 0.25);
        assert_eq!(value["residual_std_error"], 1.0);
    }

    #[test]
    fn residual_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("res.csv");
        let rows = vec![ResidualRow {
            index: 0,
            response: 3.0,
            p1: 1.0,
            p2: 2.0,
            fitted: 2.5,
            residual: 0.5,
        }];
        write_residuals_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("index,response,p1,p2,fitted,residual"));
        assert_eq!(lines.next(), Some("0,3,1,2,2.5000000000,0.5000000000"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("res.csv");
        let err = write_residuals_csv(&path, &[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
