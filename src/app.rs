//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up the diagnostic log destination
//! - runs ingest + fit
//! - prints the report and renders/exports on request

use std::fs::File;

use clap::Parser;

use crate::cli::{Command, FitArgs, ReadArgs, SampleArgs};
use crate::data::{SampleSpec, generate_sample, write_sample};
use crate::domain::FitConfig;
use crate::error::AppError;
use crate::io::ingest::{IngestOptions, read_table};
use crate::plot::{GnuplotRenderer, PlotOptions};

pub mod pipeline;

/// Entry point for the `surfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; anything it sets is only a default.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Read(args) => handle_read(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    init_logging(args.log.as_deref())?;
    let config = fit_config_from_args(&args);

    let mut trace = |evaluation: usize, b: &[f64]| {
        log::info!(target: "surfit::trace", "eval {evaluation:>4}: b = {}", format_vector(b));
    };
    let mut silent = |_: usize, _: &[f64]| {};
    let observer: &mut dyn FnMut(usize, &[f64]) = if config.trace { &mut trace } else { &mut silent };

    let run = pipeline::run_fit(&config, observer)?;

    println!(
        "{}",
        crate::report::format_fit_report(&config.input, &run.ingest, &run.fit)
    );

    // Optional exports.
    if let Some(path) = &config.export_json {
        crate::io::export::write_fit_json(path, &config.input, &run.fit)?;
    }
    if let Some(path) = &config.export_residuals {
        crate::io::export::write_residuals_csv(path, &run.residuals)?;
    }
    if let Some(path) = &config.svg_output {
        crate::plot::render_parity_svg(&run.residuals, path, (800, 600))?;
    }

    if config.plot {
        let options = match &config.plot_output {
            Some(path) => PlotOptions::to_file(path),
            None => PlotOptions::on_screen(),
        };
        let renderer = GnuplotRenderer::new(config.gnuplot.clone(), options.output.is_none());
        crate::plot::stage_and_render(&run.ingest.table, &run.fit.values(), &renderer, &options)?;
    }

    Ok(())
}

fn handle_read(args: ReadArgs) -> Result<(), AppError> {
    init_logging(None)?;
    let options = IngestOptions {
        comment_char: args.input.comment_char,
        separator: args.input.separator,
        on_parse_failure: args.input.on_parse_failure,
    };
    let ingest = read_table(&args.input.input, args.input.tuple_size, &options)?;
    print!("{}", crate::report::format_table(&ingest.table));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    init_logging(None)?;
    let spec = SampleSpec {
        coefficients: args.coefficients,
        p1_range: (args.min, args.max),
        p2_range: (args.min, args.max),
        steps: args.steps,
        noise_sd: args.noise,
        seed: args.seed,
    };
    let table = generate_sample(&spec)?;
    write_sample(&args.output, &spec, &table)
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        input: args.input.input.clone(),
        tuple_size: args.input.tuple_size,
        comment_char: args.input.comment_char,
        separator: args.input.separator,
        on_parse_failure: args.input.on_parse_failure,

        initial_guess: args.guess,
        max_iterations: args.max_iter,
        xtol: args.xtol,
        gtol: args.gtol,
        ftol: args.ftol,
        analytic_jacobian: !args.numeric_jacobian,
        trace: !args.quiet_trace,

        plot: args.plot || args.plot_output.is_some(),
        plot_output: args.plot_output.clone(),
        gnuplot: args.gnuplot.clone(),
        svg_output: args.svg.clone(),

        export_json: args.export_json.clone(),
        export_residuals: args.export_residuals.clone(),
    }
}

/// Route `log` output to `path` (truncated) or stdout. Level comes from
/// `RUST_LOG`, defaulting to `info`.
fn init_logging(path: Option<&std::path::Path>) -> Result<(), AppError> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp(None).format_module_path(false);

    match path {
        Some(p) => {
            let file = File::create(p)
                .map_err(|e| AppError::io(format!("Failed to create log file '{}': {e}", p.display())))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stdout);
        }
    }

    // Already initialised (e.g. under a test harness) is not an error.
    let _ = builder.try_init();
    Ok(())
}

fn format_vector(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.8e}")).collect();
    format!("[{}]", parts.join(", "))
}
