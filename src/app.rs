//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the session file
//! - computes plot products, statistics or simulated data
//! - prints tables and writes optional exports

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Command, FakeArgs, PlotArgs, StatArgs};
use crate::domain::PlotData;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `pha` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Plot(args) => handle_plot(args),
        Command::Stat(args) => handle_stat(args),
        Command::Fake(args) => handle_fake(args),
    }
}

/// `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let session = pipeline::load_session(&args.session, std::slice::from_ref(&args.id))?;
    let plots = pipeline::run_plot(&session, args.kind, &args.id, &args.bkg_id)?;

    for plot in &plots {
        println!("{}", crate::report::format_plot_table(plot));
    }
    export(&plots, args.export.as_ref(), args.export_json.as_ref())
}

fn handle_stat(args: StatArgs) -> Result<(), AppError> {
    let session = pipeline::load_session(&args.session, &args.id)?;
    let info = pipeline::run_stat(&session, &args.id)?;
    if info.is_empty() {
        return Err(AppError::new(3, "No data set has a source model"));
    }
    println!("{}", crate::report::format_stat_summary(&info));
    Ok(())
}

fn handle_fake(args: FakeArgs) -> Result<(), AppError> {
    let session = pipeline::load_session(&args.session, std::slice::from_ref(&args.id))?;
    let plot = pipeline::run_fake(&session, &args.id, args.seed)?;

    println!("{}", crate::report::format_plot_table(&plot));
    export(std::slice::from_ref(&plot), args.export.as_ref(), args.export_json.as_ref())
}

fn export(plots: &[PlotData], csv: Option<&PathBuf>, json: Option<&PathBuf>) -> Result<(), AppError> {
    if let Some(path) = csv {
        crate::io::export::write_plot_csv(path, plots)?;
    }
    if let Some(path) = json {
        crate::io::export::write_plot_json(path, plots)?;
    }
    Ok(())
}
