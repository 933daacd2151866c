//! Scalar-or-array scale factors.
//!
//! PHA keywords such as BACKSCAL and AREASCAL are usually a single number but
//! may be given per channel. Ratios built from them inherit that shape, so
//! the arithmetic here broadcasts a scalar against an array the same way a
//! numeric array library would.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Scalar(1.0)
    }
}

impl From<f64> for Scale {
    fn from(value: f64) -> Self {
        Scale::Scalar(value)
    }
}

impl From<Vec<f64>> for Scale {
    fn from(value: Vec<f64>) -> Self {
        Scale::Array(value)
    }
}

impl Scale {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Scale::Scalar(v) => Some(*v),
            Scale::Array(_) => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Scale::Scalar(_))
    }

    /// Element-wise `self * other`.
    pub fn mul(&self, other: &Scale) -> Result<Scale, DataError> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise `self / other`.
    pub fn div(&self, other: &Scale) -> Result<Scale, DataError> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Element-wise `self + other`.
    pub fn add(&self, other: &Scale) -> Result<Scale, DataError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Multiply a per-bin array by this factor.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>, DataError> {
        match self {
            Scale::Scalar(s) => Ok(values.iter().map(|v| v * s).collect()),
            Scale::Array(a) => {
                if a.len() != values.len() {
                    return Err(DataError::SizeMismatch {
                        what: "scale factor",
                        left: a.len(),
                        right: values.len(),
                    });
                }
                Ok(values.iter().zip(a).map(|(v, s)| v * s).collect())
            }
        }
    }

    fn zip_with(&self, other: &Scale, f: impl Fn(f64, f64) -> f64) -> Result<Scale, DataError> {
        match (self, other) {
            (Scale::Scalar(a), Scale::Scalar(b)) => Ok(Scale::Scalar(f(*a, *b))),
            (Scale::Scalar(a), Scale::Array(b)) => Ok(Scale::Array(b.iter().map(|&y| f(*a, y)).collect())),
            (Scale::Array(a), Scale::Scalar(b)) => Ok(Scale::Array(a.iter().map(|&x| f(x, *b)).collect())),
            (Scale::Array(a), Scale::Array(b)) => {
                if a.len() != b.len() {
                    return Err(DataError::SizeMismatch {
                        what: "scale factor",
                        left: a.len(),
                        right: b.len(),
                    });
                }
                Ok(Scale::Array(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_broadcasts_against_array() {
        let s = Scale::Scalar(2.0);
        let a = Scale::Array(vec![1.0, 2.0, 4.0]);
        assert_eq!(s.div(&a).unwrap(), Scale::Array(vec![2.0, 1.0, 0.5]));
        assert_eq!(a.mul(&s).unwrap(), Scale::Array(vec![2.0, 4.0, 8.0]));
    }

    #[test]
    fn mismatched_arrays_are_rejected() {
        let a = Scale::Array(vec![1.0, 2.0]);
        let b = Scale::Array(vec![1.0, 2.0, 3.0]);
        assert!(matches!(a.add(&b), Err(DataError::SizeMismatch { .. })));
        assert!(a.apply(&[1.0]).is_err());
    }
}
