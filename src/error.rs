//! Error types shared across the crate

use thiserror::Error;

/// Errors raised by normalization and edge-filtering operations
#[derive(Error, Debug)]
pub enum HeteroError {
    /// Bad construction arguments: unrecognized norm kind, incompatible
    /// flag combination, or a violated one-node-per-cluster precondition
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Feature widths disagree across types, or an input's width differs
    /// from the resolved channel count
    #[error("shape mismatch for type '{ty}': expected {expected} channels, got {found}")]
    ShapeMismatch {
        ty: String,
        expected: usize,
        found: usize,
    },

    /// Call-site shape problem: unknown type key, index out of range, or
    /// parallel sequences of unequal length
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, HeteroError>;
