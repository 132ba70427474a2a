//! Error types for scenegeom

use thiserror::Error;

/// Main error type for scenegeom operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: usize, vertex_count: usize },

    #[error("Cache size {0} outside supported range 1..=64")]
    CacheSizeOutOfRange(usize),
}

/// Result type alias for scenegeom operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
