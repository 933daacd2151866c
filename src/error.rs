//! Error types.
//!
//! - `DataError` is the library error: datasets, models, responses and the
//!   session all return it.
//! - `AppError` is what the `pha` binary reports; it carries the process exit
//!   code.

use thiserror::Error;

/// Errors raised while building or evaluating PHA models and plot products.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// A background attached to the dataset has no model in the mapping.
    #[error("background model {key} for data set has not been set")]
    MissingBackgroundModel { key: String },

    /// `BackgroundSumModel` was built from an empty mapping.
    #[error("at least one background model is required")]
    EmptyBackgroundModels,

    /// The dataset has no background with this identifier.
    #[error("background data set {key} has not been set")]
    BackgroundNotFound { key: String },

    /// The dataset has no backgrounds at all.
    #[error("data set '{name}' does not have any associated backgrounds")]
    NoBackground { name: String },

    /// A session lookup failed.
    #[error("{what} {id} has not been set")]
    IdentifierNotFound { what: &'static str, id: String },

    /// No ARF or RMF is available for the dataset.
    #[error("no instrument response found for data set '{name}'")]
    NoResponse { name: String },

    /// No source model is registered for the dataset.
    #[error("model stack for data set {id} has not been set")]
    NoModel { id: String },

    /// A model was evaluated on a grid of the wrong length.
    #[error("grid mismatch: expected {expected} bins, got {got}")]
    GridMismatch { expected: usize, got: usize },

    /// Two arrays that must be aligned have different lengths.
    #[error("size mismatch for {what}: {left} vs {right}")]
    SizeMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// A value is out of its valid domain.
    #[error("invalid value for {what}: {detail}")]
    InvalidValue { what: &'static str, detail: String },
}

impl DataError {
    pub fn invalid(what: &'static str, detail: impl Into<String>) -> Self {
        DataError::InvalidValue {
            what,
            detail: detail.into(),
        }
    }

    /// Exit code used when the error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            DataError::IdentifierNotFound { .. }
            | DataError::BackgroundNotFound { .. }
            | DataError::NoModel { .. } => 3,
            _ => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
