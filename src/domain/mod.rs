//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - dataset/background identifiers (`DataId`)
//! - configuration enums (`AnalysisUnit`, `PlotKind`)
//! - plot outputs (`PlotData`, `FitPlot`)

pub mod types;

pub use types::*;
