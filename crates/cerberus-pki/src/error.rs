//! PKI error types.

use thiserror::Error;

/// Result type for PKI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PKI error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// CA material on disk is missing, unreadable, or unparsable.
    #[error("failed to load CA material: {0}")]
    Load(String),

    /// Key generation, certificate building, signing, or persistence failed.
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// Certificate parsing failed.
    #[error("certificate parsing failed: {0}")]
    Parse(String),

    /// Issuance request validation failed.
    #[error("invalid request: {0}")]
    Validation(String),
}
