//! Measured-vs-fitted parity chart rendered in-process with Plotters.
//!
//! Unlike the gnuplot path this needs no external program, so it is the
//! option of choice on machines without gnuplot. Points on the diagonal are
//! perfectly fitted.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{AppError, ErrorKind};
use crate::report::ResidualRow;

/// Draw `rows` as (measured, fitted) points plus the `y = x` reference line.
pub fn render_parity_svg(rows: &[ResidualRow], path: &Path, size: (u32, u32)) -> Result<(), AppError> {
    let (lo, hi) = bounds(rows)
        .ok_or_else(|| AppError::invalid_argument("Nothing to plot: no finite residual rows."))?;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("surfit: measured vs fitted", ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .x_desc("measured")
        .y_desc("fitted")
        .draw()
        .map_err(draw_error)?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], &BLACK))
        .map_err(draw_error)?;

    chart
        .draw_series(
            rows.iter()
                .filter(|r| r.response.is_finite() && r.fitted.is_finite())
                .map(|r| Circle::new((r.response, r.fitted), 3, BLUE.filled())),
        )
        .map_err(draw_error)?;

    root.present().map_err(draw_error)?;
    log::info!("wrote parity chart to {}", path.display());
    Ok(())
}

/// Shared axis range covering every measured and fitted value, padded 5%.
fn bounds(rows: &[ResidualRow]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for r in rows {
        for v in [r.response, r.fitted] {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let pad = ((hi - lo) * 0.05).max(1e-6);
    Some((lo - pad, hi + pad))
}

fn draw_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::new(ErrorKind::RendererFailure, format!("SVG rendering failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(response: f64, fitted: f64) -> ResidualRow {
        ResidualRow {
            index: 0,
            response,
            p1: 0.0,
            p2: 0.0,
            fitted,
            residual: response - fitted,
        }
    }

    #[test]
    fn bounds_cover_both_series_with_padding() {
        let (lo, hi) = bounds(&[row(1.0, 2.0), row(3.0, 0.0)]).unwrap();
        assert!(lo < 0.0 && hi > 3.0);
    }

    #[test]
    fn bounds_of_single_value_are_not_degenerate() {
        let (lo, hi) = bounds(&[row(2.0, 2.0)]).unwrap();
        assert!(hi > lo);
    }

    #[test]
    fn empty_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_parity_svg(&[], &dir.path().join("p.svg"), (400, 300)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn writes_an_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parity.svg");
        render_parity_svg(&[row(1.0, 1.1), row(2.0, 1.9), row(3.0, 3.0)], &path, (400, 300)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
    }
}
