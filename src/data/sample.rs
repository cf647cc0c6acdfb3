//! Synthetic surface samples for demos and tests.
//!
//! Points lie on a regular `steps x steps` grid over the `p1`/`p2` ranges. Each
//! response is the model value plus optional Gaussian noise from a seeded RNG,
//! so the same `SampleSpec` always yields the same file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Coefficients, Table};
use crate::error::AppError;
use crate::models::predict;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub coefficients: Coefficients,
    pub p1_range: (f64, f64),
    pub p2_range: (f64, f64),
    /// Grid points per axis.
    pub steps: usize,
    /// Standard deviation of additive noise; `0.0` gives an exact surface.
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            coefficients: [2.0, 3.0, 0.5, 0.1, 1.0],
            p1_range: (-3.0, 3.0),
            p2_range: (-3.0, 3.0),
            steps: 7,
            noise_sd: 0.0,
            seed: 42,
        }
    }
}

/// Generate `[response, p1, p2]` rows, `p1` varying slowest.
pub fn generate_sample(spec: &SampleSpec) -> Result<Table, AppError> {
    if spec.steps < 2 {
        return Err(AppError::invalid_argument("Sample grid needs at least 2 steps per axis."));
    }
    for (name, (lo, hi)) in [("p1", spec.p1_range), ("p2", spec.p2_range)] {
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(AppError::invalid_argument(format!(
                "Invalid {name} range {lo}..{hi} for sample generation."
            )));
        }
    }
    if !(spec.noise_sd.is_finite() && spec.noise_sd >= 0.0) {
        return Err(AppError::invalid_argument("Noise standard deviation must be >= 0."));
    }
    if spec.coefficients.iter().any(|b| !b.is_finite()) {
        return Err(AppError::invalid_argument("Sample coefficients must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::invalid_argument(format!("Noise distribution error: {e}")))?;

    let axis = |(lo, hi): (f64, f64), i: usize| lo + (hi - lo) * i as f64 / (spec.steps - 1) as f64;

    let mut data = Vec::with_capacity(spec.steps * spec.steps * 3);
    for i in 0..spec.steps {
        let p1 = axis(spec.p1_range, i);
        for j in 0..spec.steps {
            let p2 = axis(spec.p2_range, j);
            let mut r = predict(&spec.coefficients, p1, p2);
            if spec.noise_sd > 0.0 {
                r += spec.noise_sd * normal.sample(&mut rng);
            }
            data.extend_from_slice(&[r, p1, p2]);
        }
    }

    Table::from_row_major(spec.steps * spec.steps, 3, data)
}

/// Write a sample table as comma-separated tuples with a `#` header.
pub fn write_sample(path: &Path, spec: &SampleSpec, table: &Table) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create sample file '{}': {e}", path.display())))?;

    let b = &spec.coefficients;
    writeln!(
        file,
        "# surfit sample: b = [{}, {}, {}, {}, {}], noise_sd = {}, seed = {}",
        b[0], b[1], b[2], b[3], b[4], spec.noise_sd, spec.seed
    )
    .and_then(|_| writeln!(file, "# response, p1, p2"))
    .map_err(|e| AppError::io(format!("Failed to write sample header: {e}")))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    for row in table.iter_rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| AppError::io(format!("Failed to write sample row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush sample file: {e}")))?;

    log::info!("wrote {} sample rows to {}", table.rows(), path.display());
    Ok(())
}
