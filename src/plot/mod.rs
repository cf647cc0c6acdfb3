//! Plot staging for external renderers.
//!
//! A render goes through three steps:
//! - write the measurement columns to a transient CSV file (`tempfile`)
//! - build a gnuplot script embedding the fitted surface and the file path
//! - hand the script to a [`Renderer`]
//!
//! The transient file is owned by a `NamedTempFile`, so it is removed when the
//! staging scope ends, whether or not the renderer succeeded.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{Coefficients, P1_COL, P2_COL, RESPONSE_COL, Table};
use crate::error::AppError;
use crate::models::formula;

pub mod gnuplot;
pub mod svg;

pub use gnuplot::GnuplotRenderer;
pub use svg::render_parity_svg;

/// Something that can execute a plotting script.
pub trait Renderer {
    fn render(&self, script: &str) -> Result<(), AppError>;
}

/// Where and how big the rendered image is.
#[derive(Debug, Clone, Default)]
pub struct PlotOptions {
    /// PNG output path; `None` renders on screen.
    pub output: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

impl PlotOptions {
    pub fn on_screen() -> Self {
        Self {
            output: None,
            width: 1024,
            height: 768,
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            output: Some(path.into()),
            ..Self::on_screen()
        }
    }
}

/// Stage `table`'s measurements, render the fitted surface, then clean up.
pub fn stage_and_render(
    table: &Table,
    coefficients: &Coefficients,
    renderer: &dyn Renderer,
    options: &PlotOptions,
) -> Result<(), AppError> {
    let staged = stage_data(table)?;
    let script = build_script(coefficients, staged.path(), options);
    log::debug!("staged {} rows at {}", table.rows(), staged.path().display());

    let rendered = renderer.render(&script);

    if let Err(e) = staged.close() {
        log::warn!("failed to remove transient plot data: {e}");
    }
    rendered
}

/// Write `[response, p1, p2]` for every row to a new temporary CSV file.
pub fn stage_data(table: &Table) -> Result<NamedTempFile, AppError> {
    if table.cols() < 3 {
        return Err(AppError::invalid_argument(format!(
            "Plotting needs 3 columns (response, p1, p2); table has {}.",
            table.cols()
        )));
    }

    let mut staged = tempfile::Builder::new()
        .prefix("surfit-")
        .suffix(".csv")
        .tempfile()
        .map_err(|e| AppError::io(format!("Failed to create transient plot data file: {e}")))?;

    {
        let mut writer = csv::Writer::from_writer(staged.as_file_mut());
        for row in table.iter_rows() {
            writer
                .write_record([row[RESPONSE_COL], row[P1_COL], row[P2_COL]].map(|v| v.to_string()))
                .map_err(|e| AppError::io(format!("Failed to write transient plot data: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::io(format!("Failed to flush transient plot data: {e}")))?;
    }
    staged
        .as_file_mut()
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush transient plot data: {e}")))?;

    Ok(staged)
}

/// Gnuplot script plotting the fitted surface over the staged data.
pub fn build_script(coefficients: &Coefficients, data: &Path, options: &PlotOptions) -> String {
    let data = quote(&data.to_string_lossy());
    let mut s = String::new();

    s.push_str("set datafile separator ','\n");
    if let Some(out) = &options.output {
        s.push_str(&format!(
            "set terminal pngcairo size {},{}\n",
            options.width.max(64),
            options.height.max(64)
        ));
        s.push_str(&format!("set output {}\n", quote(&out.to_string_lossy())));
    }
    s.push_str("set title 'surfit: r = b0*p1 + b1*p2 + b2*p1^2 + b3*p2^2 + b4'\n");
    s.push_str("set xlabel 'p1'\nset ylabel 'p2'\nset zlabel 'r'\n");
    s.push_str("set isosamples 40\nset hidden3d\n");
    s.push_str(&format!("f(x,y) = {}\n", formula(coefficients, "x", "y")));
    s.push_str(&format!(
        "splot f(x,y) title 'fit' with lines, {data} using 2:3:1 with points pointtype 7 title 'data'\n"
    ));
    if options.output.is_some() {
        s.push_str("unset output\n");
    }
    s
}

/// Single-quoted gnuplot string literal.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::ErrorKind;

    /// Records the script and whether the staged file existed while rendering.
    struct Recorder {
        fail: bool,
        seen: RefCell<Option<(String, PathBuf, bool)>>,
    }

    impl Renderer for Recorder {
        fn render(&self, script: &str) -> Result<(), AppError> {
            let path = PathBuf::from(splot_data_path(script));
            let existed = path.exists();
            *self.seen.borrow_mut() = Some((script.to_string(), path, existed));
            if self.fail {
                Err(AppError::new(ErrorKind::RendererFailure, "boom"))
            } else {
                Ok(())
            }
        }
    }

    /// The data file named in the `splot` command.
    fn splot_data_path(script: &str) -> &str {
        let splot = script.lines().find(|l| l.starts_with("splot")).unwrap();
        let start = splot.find(", '").unwrap() + 3;
        let len = splot[start..].find("' using").unwrap();
        &splot[start..start + len]
    }

    fn table() -> Table {
        Table::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn staged_file_holds_rows_in_order() {
        let staged = stage_data(&table()).unwrap();
        let text = std::fs::read_to_string(staged.path()).unwrap();
        assert_eq!(text, "1,2,3\n4,5,6\n");
    }

    #[test]
    fn script_embeds_formula_and_data_path() {
        let script = build_script(
            &[2.0, 3.0, 0.5, 0.1, 1.0],
            Path::new("/tmp/it's.csv"),
            &PlotOptions::to_file("/tmp/out.png"),
        );
        assert!(script.starts_with("set datafile separator ','\n"));
        assert!(script.lines().all(|l| !l.starts_with('#')));
        assert!(script.contains("f(x,y) = "));
        assert!(script.contains("*x**2"));
        assert!(script.contains("'/tmp/it''s.csv' using 2:3:1"));
        assert!(script.contains("set terminal pngcairo size 1024,768"));
        assert!(script.contains("set output '/tmp/out.png'"));
    }

    #[test]
    fn on_screen_script_has_no_terminal() {
        let script = build_script(&[0.0; 5], Path::new("d.csv"), &PlotOptions::on_screen());
        assert!(!script.contains("set terminal"));
        assert!(!script.contains("set output"));
    }

    #[test]
    fn transient_file_removed_after_success() {
        let recorder = Recorder {
            fail: false,
            seen: RefCell::new(None),
        };
        stage_and_render(&table(), &[1.0; 5], &recorder, &PlotOptions::on_screen()).unwrap();
        let (script, path, existed) = recorder.seen.into_inner().unwrap();
        assert!(script.contains("splot"));
        assert!(existed);
        assert!(!path.exists());
    }

    #[test]
    fn transient_file_removed_after_renderer_failure() {
        let recorder = Recorder {
            fail: true,
            seen: RefCell::new(None),
        };
        let err = stage_and_render(&table(), &[1.0; 5], &recorder, &PlotOptions::on_screen()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RendererFailure);
        let (_, path, existed) = recorder.seen.into_inner().unwrap();
        assert!(existed);
        assert!(!path.exists());
    }

    #[test]
    fn two_column_tables_cannot_be_staged() {
        let t = Table::from_rows(&[[1.0, 2.0]]).unwrap();
        assert_eq!(stage_data(&t).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
