//! Error types for dynfield

use thiserror::Error;

/// Dynfield error type
#[derive(Debug, Error)]
pub enum DynfieldError {
    /// A step with this name is already registered in the structure
    #[error("Trying to add step {0} to the neural structure twice")]
    DuplicateStep(String),

    /// Bad argument to a builder or connect call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Source step has more dimensions than the target and not enough are contracted
    #[error(
        "Connecting a step of dimensionality {source_dim} to a step of dimensionality \
         {target_dim} requires {required} contractions. Specify a list of contracted \
         dimension indices using `contract_dimensions`"
    )]
    ContractionMismatch {
        source_dim: usize,
        target_dim: usize,
        required: usize,
    },

    /// Invalid configuration (unknown kernel, unsupported dimensionality, bad bounds)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A value's axis count does not match the step or field geometry it is
    /// applied to. Inconsistent pattern definitions are `InvalidConfiguration`.
    #[error("Dimensionality mismatch: expected {expected}, got {actual}")]
    DimensionalityMismatch { expected: usize, actual: usize },

    /// Lookup by name or step pair had no match
    #[error("Not found: {0}")]
    NotFound(String),

    /// Architecture source could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Hot reload could not be merged into the live structure
    #[error("Reload error: {0}")]
    Reload(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<crate::ir::ParseError> for DynfieldError {
    fn from(e: crate::ir::ParseError) -> Self {
        Self::Parse {
            line: e.line,
            message: e.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, DynfieldError>;
