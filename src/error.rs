//! SHELF - Custom Error Types
//! Defines the error hierarchy for the write-back persistence engine.

use std::path::PathBuf;

use thiserror::Error;

/// Custom Result type for the Shelf engine.
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Error types for the Shelf persistence engine.
#[derive(Error, Debug)]
pub enum ShelfError {
    /// I/O errors from any step of reading, writing or renaming files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode/decode failure inside the serializer.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The on-disk file could not be understood (bad frame, checksum, UTF-8).
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// The underlying store failed while being enumerated for a snapshot.
    #[error("Iteration error: {0}")]
    Iteration(String),

    /// Failure reported by the underlying key-value store.
    #[error("Store error: {0}")]
    Store(String),

    /// Open refused because the file exists and exclusivity was requested.
    #[error("Can not create store at {0:?}: file already exists")]
    FileExists(PathBuf),

    /// Open refused because the file is missing and creation is disabled.
    #[error("Can not open store at {0:?}: file does not exist")]
    FileMissing(PathBuf),

    /// Operation attempted after `close`.
    #[error("Store is closed")]
    Closed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShelfError {
    /// True for the error kinds that can only come out of `open`.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            ShelfError::FileExists(_) | ShelfError::FileMissing(_) | ShelfError::Corruption(_)
        )
    }
}
