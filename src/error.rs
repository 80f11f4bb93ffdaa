//! Error types for the gallery renamer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gallery renamer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gallery renamer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source does not exist or is neither a file nor a directory: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to rename {from} to {to}: {message}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    #[error("Rename target already exists: {path}")]
    TargetExists { path: PathBuf },

    #[error("Registry was already populated for this session")]
    AlreadyPopulated,

    #[error("Backend is busy: {0}")]
    Busy(String),
}
