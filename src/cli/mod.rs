//! Command-line parsing for the `pha` tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the model and plot code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AnalysisUnit, DataId, PlotKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "pha", version, about = "PHA spectra with background models: plot products, statistics and simulation")]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute a plot product and print it as a table, optionally exporting it.
    Plot(PlotArgs),
    /// Compute the chi-square (Gehrels) statistic for one or all data sets.
    Stat(StatArgs),
    /// Simulate counts from the current model and print the resulting data plot.
    Fake(FakeArgs),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct SessionArgs {
    /// Session description (JSON).
    #[arg(short, long, value_name = "JSON")]
    pub session: PathBuf,

    /// Analysis unit applied to the selected data sets before evaluation.
    #[arg(short, long, value_enum)]
    pub analysis: Option<AnalysisUnit>,
}

/// Options for `pha plot`.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Data set identifier.
    #[arg(long, default_value = "1")]
    pub id: DataId,

    /// Background identifier (background plot kinds only).
    #[arg(long = "bkg-id", default_value = "1")]
    pub bkg_id: DataId,

    /// Which plot product to compute.
    #[arg(short, long, value_enum, default_value_t = PlotKind::Data)]
    pub kind: PlotKind,

    /// Export the plot values to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the plot values to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for `pha stat`.
#[derive(Debug, Args, Clone)]
pub struct StatArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Data set identifiers (all data sets with a source model when omitted).
    #[arg(long)]
    pub id: Vec<DataId>,
}

/// Options for `pha fake`.
#[derive(Debug, Args, Clone)]
pub struct FakeArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Data set identifier.
    #[arg(long, default_value = "1")]
    pub id: DataId,

    /// Random seed for the Poisson draws.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export the simulated data plot to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the simulated data plot to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plot_command() {
        let cli = Cli::parse_from([
            "pha", "plot", "--session", "s.json", "--id", "src", "--kind", "bkg-resid", "-a", "energy", "-v",
        ]);
        assert!(cli.verbose);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot command");
        };
        assert_eq!(args.id, DataId::from("src"));
        assert_eq!(args.bkg_id, DataId::Int(1));
        assert_eq!(args.kind, PlotKind::BkgResid);
        assert_eq!(args.session.analysis, Some(AnalysisUnit::Energy));
    }

    #[test]
    fn stat_accepts_several_ids() {
        let cli = Cli::parse_from(["pha", "stat", "-s", "s.json", "--id", "1", "--id", "2"]);
        let Command::Stat(args) = cli.command else {
            panic!("expected stat command");
        };
        assert_eq!(args.id, vec![DataId::Int(1), DataId::Int(2)]);
    }
}
