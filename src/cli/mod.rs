//! Command-line parsing for the quadratic surface fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{Coefficients, PARAM_COUNT, ParseFailurePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "surfit", version, about = "Quadratic surface fitter (nonlinear least squares)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit r = b0*p1 + b1*p2 + b2*p1^2 + b3*p2^2 + b4 to a tuple file.
    Fit(FitArgs),
    /// Parse a tuple file and print the resulting table.
    Read(ReadArgs),
    /// Write synthetic surface data to a file.
    Sample(SampleArgs),
}

/// Options shared by every command that reads a tuple file.
#[derive(Debug, Parser, Clone)]
pub struct InputArgs {
    /// Tuple file: one row per line, comma-separated, `#` starts a comment.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Fields kept per row (short rows are zero-padded).
    #[arg(short = 't', long, default_value_t = 3)]
    pub tuple_size: usize,

    /// Character that starts a comment.
    #[arg(long, default_value_t = '#')]
    pub comment_char: char,

    /// Field separator.
    #[arg(long, default_value_t = ',')]
    pub separator: char,

    /// What to do with fields that are not numbers.
    #[arg(long, value_enum, default_value_t = ParseFailurePolicy::ZeroFill)]
    pub on_parse_failure: ParseFailurePolicy,
}

/// Options for `surfit fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Initial guess for b0..b4.
    #[arg(long, value_parser = parse_guess, default_value = "1,1,1,1,1")]
    pub guess: Coefficients,

    /// Solver patience (maximum residual evaluations scale).
    #[arg(long, default_value_t = 100)]
    pub max_iter: usize,

    /// Relative step-size tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub xtol: f64,

    /// Gradient orthogonality tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub gtol: f64,

    /// Relative reduction tolerance of the sum of squares.
    #[arg(long, default_value_t = 1e-8)]
    pub ftol: f64,

    /// Use forward finite differences instead of the closed-form Jacobian.
    #[arg(long)]
    pub numeric_jacobian: bool,

    /// Write diagnostics to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Suppress the per-evaluation coefficient trace.
    #[arg(long)]
    pub quiet_trace: bool,

    /// Render the fitted surface with gnuplot.
    #[arg(long)]
    pub plot: bool,

    /// Render to a PNG file instead of a window (implies --plot).
    #[arg(long, value_name = "PNG")]
    pub plot_output: Option<PathBuf>,

    /// Gnuplot executable.
    #[arg(long, env = "SURFIT_GNUPLOT", default_value = "gnuplot")]
    pub gnuplot: String,

    /// Write a measured-vs-fitted SVG chart.
    #[arg(long, value_name = "PATH")]
    pub svg: Option<PathBuf>,

    /// Export coefficients and diagnostics to JSON.
    #[arg(long, value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export per-row fitted values and residuals to CSV.
    #[arg(long, value_name = "PATH")]
    pub export_residuals: Option<PathBuf>,
}

/// Options for `surfit read`.
#[derive(Debug, Parser, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Options for `surfit sample`.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output file.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: PathBuf,

    /// True coefficients b0..b4.
    #[arg(long, value_parser = parse_guess, default_value = "2,3,0.5,0.1,1")]
    pub coefficients: Coefficients,

    /// Minimum of p1 and p2.
    #[arg(long, default_value_t = -3.0, allow_negative_numbers = true)]
    pub min: f64,

    /// Maximum of p1 and p2.
    #[arg(long, default_value_t = 3.0, allow_negative_numbers = true)]
    pub max: f64,

    /// Grid points per axis.
    #[arg(long, default_value_t = 7)]
    pub steps: usize,

    /// Standard deviation of Gaussian noise added to the response.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse `b0,b1,b2,b3,b4`.
pub fn parse_guess(s: &str) -> Result<Coefficients, String> {
    let values = s
        .split(',')
        .map(|t| {
            t.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}' is not a number: {e}", t.trim()))
        })
        .collect::<Result<Vec<f64>, String>>()?;

    let coefficients: Coefficients = values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {PARAM_COUNT} comma-separated values, got {}", v.len()))?;

    if coefficients.iter().any(|v| !v.is_finite()) {
        return Err("coefficients must be finite".to_string());
    }
    Ok(coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_parses_five_values() {
        assert_eq!(parse_guess("1, 2,3,4.5,-1").unwrap(), [1.0, 2.0, 3.0, 4.5, -1.0]);
        assert!(parse_guess("1,2,3,4").is_err());
        assert!(parse_guess("1,2,x,4,5").is_err());
        assert!(parse_guess("1,2,3,4,inf").is_err());
    }

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["surfit", "fit", "data.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.input.tuple_size, 3);
        assert_eq!(args.guess, [1.0; 5]);
        assert_eq!(args.max_iter, 100);
        assert_eq!(args.input.on_parse_failure, ParseFailurePolicy::ZeroFill);
        assert!(!args.numeric_jacobian);
        assert!(!args.plot);
    }

    #[test]
    fn fit_flags() {
        let cli = Cli::try_parse_from([
            "surfit",
            "fit",
            "d.csv",
            "--guess",
            "0,0,0,0,0",
            "--on-parse-failure",
            "skip-row",
            "--numeric-jacobian",
            "--export-json",
            "out.json",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.guess, [0.0; 5]);
        assert_eq!(args.input.on_parse_failure, ParseFailurePolicy::SkipRow);
        assert!(args.numeric_jacobian);
        assert_eq!(args.export_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn sample_accepts_negative_range() {
        let cli = Cli::try_parse_from(["surfit", "sample", "-o", "s.csv", "--min", "-5", "--noise", "0.1"]).unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.min, -5.0);
        assert_eq!(args.noise, 0.1);
    }
}
