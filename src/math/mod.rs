//! Mathematical utilities: scalar/array scale factors and the error-function
//! difference used by binned Gaussian integrals.

pub mod scale;
pub mod special;

pub use scale::*;
pub use special::*;
