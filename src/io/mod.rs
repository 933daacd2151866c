//! Input/output helpers.
//!
//! - session description JSON (`session_file`)
//! - plot exports (CSV/JSON) (`export`)

pub mod export;
pub mod session_file;

pub use export::*;
pub use session_file::*;
