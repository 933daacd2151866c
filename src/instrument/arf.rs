//! Effective-area curves (ARF).

use crate::error::DataError;

/// Effective area per energy bin, in cm^2.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArf {
    pub name: String,
    pub energ_lo: Vec<f64>,
    pub energ_hi: Vec<f64>,
    pub specresp: Vec<f64>,
    /// Exposure the ARF was created for; applied when folding a model.
    pub exposure: Option<f64>,
}

impl DataArf {
    pub fn new(
        name: &str,
        energ_lo: Vec<f64>,
        energ_hi: Vec<f64>,
        specresp: Vec<f64>,
        exposure: Option<f64>,
    ) -> Result<Self, DataError> {
        if energ_lo.len() != energ_hi.len() {
            return Err(DataError::SizeMismatch {
                what: "ARF energy edges",
                left: energ_lo.len(),
                right: energ_hi.len(),
            });
        }
        if specresp.len() != energ_lo.len() {
            return Err(DataError::SizeMismatch {
                what: "ARF specresp",
                left: specresp.len(),
                right: energ_lo.len(),
            });
        }
        if energ_lo.iter().zip(&energ_hi).any(|(l, h)| !(l.is_finite() && h.is_finite() && h > l && *l >= 0.0)) {
            return Err(DataError::invalid("ARF energy grid", "bins must satisfy 0 <= lo < hi"));
        }
        Ok(Self {
            name: name.to_string(),
            energ_lo,
            energ_hi,
            specresp,
            exposure,
        })
    }

    pub fn len(&self) -> usize {
        self.specresp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specresp.is_empty()
    }

    /// Multiply per-bin photon fluxes by the effective area (and exposure).
    pub fn apply_arf(&self, src: &[f64]) -> Result<Vec<f64>, DataError> {
        if src.len() != self.len() {
            return Err(DataError::GridMismatch {
                expected: self.len(),
                got: src.len(),
            });
        }
        let exposure = self.exposure.unwrap_or(1.0);
        Ok(src
            .iter()
            .zip(&self.specresp)
            .map(|(s, a)| s * a * exposure)
            .collect())
    }
}
