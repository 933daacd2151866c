//! Redistribution matrices (RMF).
//!
//! The matrix is stored dense, channels × energies. Real RMFs are sparse,
//! but the grids handled here are small and a dense `DMatrix` keeps folding
//! a single matrix-vector product.

use nalgebra::{DMatrix, DVector};

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct DataRmf {
    pub name: String,
    pub energ_lo: Vec<f64>,
    pub energ_hi: Vec<f64>,
    /// Nominal energy bounds of each channel.
    pub e_min: Vec<f64>,
    pub e_max: Vec<f64>,
    /// Number of the first channel (TLMIN, usually 0 or 1).
    pub offset: i64,
    matrix: DMatrix<f64>,
}

impl DataRmf {
    pub fn new(
        name: &str,
        energ_lo: Vec<f64>,
        energ_hi: Vec<f64>,
        e_min: Vec<f64>,
        e_max: Vec<f64>,
        offset: i64,
        matrix: DMatrix<f64>,
    ) -> Result<Self, DataError> {
        if energ_lo.len() != energ_hi.len() {
            return Err(DataError::SizeMismatch {
                what: "RMF energy edges",
                left: energ_lo.len(),
                right: energ_hi.len(),
            });
        }
        if e_min.len() != e_max.len() {
            return Err(DataError::SizeMismatch {
                what: "RMF channel edges",
                left: e_min.len(),
                right: e_max.len(),
            });
        }
        if matrix.nrows() != e_min.len() || matrix.ncols() != energ_lo.len() {
            return Err(DataError::invalid(
                "RMF matrix",
                format!(
                    "shape {}x{} does not match {} channels x {} energies",
                    matrix.nrows(),
                    matrix.ncols(),
                    e_min.len(),
                    energ_lo.len()
                ),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            energ_lo,
            energ_hi,
            e_min,
            e_max,
            offset,
            matrix,
        })
    }

    /// A perfect response: energy bin `i` lands entirely in channel `i`.
    pub fn ideal(
        name: &str,
        energ_lo: Vec<f64>,
        energ_hi: Vec<f64>,
        offset: i64,
    ) -> Result<Self, DataError> {
        let n = energ_lo.len();
        let e_min = energ_lo.clone();
        let e_max = energ_hi.clone();
        Self::new(name, energ_lo, energ_hi, e_min, e_max, offset, DMatrix::identity(n, n))
    }

    /// Build from row-major channel rows (one `Vec` per channel).
    pub fn from_rows(
        name: &str,
        energ_lo: Vec<f64>,
        energ_hi: Vec<f64>,
        e_min: Vec<f64>,
        e_max: Vec<f64>,
        offset: i64,
        rows: &[Vec<f64>],
    ) -> Result<Self, DataError> {
        let ncols = energ_lo.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(DataError::SizeMismatch {
                what: "RMF matrix row",
                left: bad.len(),
                right: ncols,
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let matrix = DMatrix::from_row_slice(rows.len(), ncols, &flat);
        Self::new(name, energ_lo, energ_hi, e_min, e_max, offset, matrix)
    }

    pub fn nchan(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn nenergy(&self) -> usize {
        self.matrix.ncols()
    }

    /// Fold per-energy-bin values onto channels.
    pub fn apply_rmf(&self, src: &[f64]) -> Result<Vec<f64>, DataError> {
        if src.len() != self.nenergy() {
            return Err(DataError::GridMismatch {
                expected: self.nenergy(),
                got: src.len(),
            });
        }
        let folded = &self.matrix * DVector::from_column_slice(src);
        Ok(folded.iter().copied().collect())
    }
}
