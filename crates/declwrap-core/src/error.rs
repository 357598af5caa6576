//! Generator error types.

/// Errors that can occur while parsing declarations or generating wrappers.
#[derive(Debug, thiserror::Error)]
pub enum DeclwrapError {
    /// A declaration line did not match the dialect (strict mode only).
    #[error("line {line}: {detail}")]
    Parse { line: usize, detail: String },

    /// A native type token could not be understood.
    #[error("invalid type: {detail}")]
    InvalidType { detail: String },

    /// Generator options are inconsistent.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, DeclwrapError>;
