//! Instrument responses: effective area (ARF), redistribution (RMF) and the
//! model wrapper that folds a source model through them.

pub mod arf;
pub mod response;
pub mod rmf;

pub use arf::*;
pub use response::*;
pub use rmf::*;
