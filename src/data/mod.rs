//! Spectral data: PHA datasets and simulated counts.
//!
//! - `pha`: the dataset type, background scaling and analysis-unit views
//! - `fake`: Poisson realisations of a dataset's model

pub mod fake;
pub mod pha;

pub use fake::*;
pub use pha::*;
