//! Fit statistics.
//!
//! Only the chi-square statistic is provided, with Gehrels errors by default;
//! it is the statistic the residual-style plots (`delchi`, `chisqr`) are
//! defined with.
//!
//! Errors are passed in explicitly where the counts are not raw counts: a
//! background-subtracted spectrum keeps the errors of the counts it was
//! derived from.

use crate::data::gehrels_error;
use crate::error::DataError;

/// `Σ ((data - model) / σ)^2` with `σ = 1 + sqrt(data + 0.75)`.
pub fn chi2_gehrels(data: &[f64], model: &[f64]) -> Result<f64, DataError> {
    let errors: Vec<f64> = data.iter().map(|&d| gehrels_error(d)).collect();
    chi2(data, model, &errors)
}

/// `Σ ((data - model) / σ)^2` with the given per-bin errors.
pub fn chi2(data: &[f64], model: &[f64], errors: &[f64]) -> Result<f64, DataError> {
    Ok(delchi(data, model, errors)?.iter().map(|d| d * d).sum())
}

/// Per-bin `(data - model) / σ`.
pub fn delchi(data: &[f64], model: &[f64], errors: &[f64]) -> Result<Vec<f64>, DataError> {
    if data.len() != model.len() {
        return Err(DataError::SizeMismatch {
            what: "data/model",
            left: data.len(),
            right: model.len(),
        });
    }
    if data.len() != errors.len() {
        return Err(DataError::SizeMismatch {
            what: "data/errors",
            left: data.len(),
            right: errors.len(),
        });
    }
    Ok(data
        .iter()
        .zip(model)
        .zip(errors)
        .map(|((&d, &m), &e)| (d - m) / e)
        .collect())
}
