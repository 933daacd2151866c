//! Reporting utilities: number formatting and terminal tables.

pub mod format;

pub use format::*;
