//! Model implementations.
//!
//! Models are evaluated through one trait so that background sums, response
//! folding and arithmetic expressions can be stacked freely.

pub mod basic;
pub mod model;

pub use basic::*;
pub use model::*;
