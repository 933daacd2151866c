//! `sherpa-pha` library crate.
//!
//! Background handling for PHA spectra: scaled background models summed into
//! the source model, response folding, and the plot products built on top.
//!
//! The binary (`pha`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model layer can be driven from other front-ends

pub mod app;
pub mod background;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod instrument;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod session;
pub mod stat;
