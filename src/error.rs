//! Error types for the Palisade service.

use thiserror::Error;

/// Main error type for Palisade operations.
///
/// Policy rejections are deliberately not represented here: a refused
/// request is an ordinary [`Decision`](crate::ratelimit::Decision) value,
/// not a fault.
#[derive(Error, Debug)]
pub enum PalisadeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Palisade operations.
pub type Result<T> = std::result::Result<T, PalisadeError>;
