//! Background handling for PHA datasets.
//!
//! - `sum`: scale and sum the background models of a dataset
//! - `compose`: add that sum to a source model and apply the response

pub mod compose;
pub mod sum;

pub use compose::*;
pub use sum::*;
