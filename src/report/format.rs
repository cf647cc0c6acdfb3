//! Human-readable run summaries.

use std::path::Path;

use crate::domain::{FitResult, Table};
use crate::io::ingest::IngestedTable;

/// Format the full run summary (input stats + fit diagnostics + coefficients).
pub fn format_fit_report(source: &Path, ingest: &IngestedTable, fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("=== surfit - quadratic surface fit ===\n");
    out.push_str(&format!("Input: {}\n", source.display()));
    out.push_str(&format!(
        "Rows: n={} (lines read={}, warnings={})\n",
        ingest.rows_used,
        ingest.lines_read,
        ingest.warnings.len()
    ));
    out.push_str("Model: r = b0*p1 + b1*p2 + b2*p1^2 + b3*p2^2 + b4\n");

    out.push_str("\nSolver diagnostics:\n");
    out.push_str(&format!("- status     : {}\n", fit.stop_reason));
    out.push_str(&format!("- evaluations: {}\n", fit.evaluations));
    out.push_str(&format!("- initial |f|: {:.6e}\n", fit.initial_norm()));
    out.push_str(&format!("- final   |f|: {:.6e}\n", fit.final_norm()));
    out.push_str(&format!("- SSE        : {:.6e}\n", fit.final_sse));
    match fit.residual_std_error() {
        Some(rse) => out.push_str(&format!("- chisq/dof  : {:.6e} (dof={})\n", rse * rse, fit.dof)),
        None => out.push_str("- chisq/dof  : n/a (dof=0)\n"),
    }
    out.push_str(&format!("- error scale: {:.6}\n", fit.variance_scale));

    out.push_str("\nCoefficients:\n");
    for c in &fit.coefficients {
        out.push_str(&format!("  {:<3} = {:>14.6} +/- {:<12.6}\n", c.name, c.value, c.std_error));
    }

    out
}

/// Format a parsed table, one bracketed row per line.
pub fn format_table(table: &Table) -> String {
    let mut out = String::new();
    for row in table.iter_rows() {
        out.push('[');
        for v in row {
            out.push_str(&format!(" {v:.6} "));
        }
        out.push_str("]\n");
    }
    out
}
