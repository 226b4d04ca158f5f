//! Error types for the fit engine.
//!
//! The fit strategies themselves never fail: every combination of items and
//! capacity has a well-defined (possibly empty) answer. `EngineError` covers
//! everything around them: rejecting invalid sizes at the boundary where an
//! item table is built, spanning preconditions, filesystem enumeration,
//! configuration and job lifecycle errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::JobState;

/// Errors raised by the engine outside of the fit hot path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source directory does not exist
    #[error("Source directory not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    /// Source directory is not accessible (permissions)
    #[error("Source directory access denied: {}", .path.display())]
    SourceAccessDenied { path: PathBuf, source: io::Error },

    /// Path is unusable for the requested operation
    #[error("Invalid path: {} ({reason})", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Failed to enumerate a directory
    #[error("Failed to enumerate directory: {}", .path.display())]
    EnumerationFailed { path: PathBuf, source: io::Error },

    /// Failed to read from a file
    #[error("Failed to read file: {}", .path.display())]
    ReadError { path: PathBuf, source: io::Error },

    /// An item was given a negative size
    #[error("Item {item} has negative size {size}")]
    NegativeSize { item: String, size: i64 },

    /// Capacity is negative, zero where items must be placed, or otherwise unusable
    #[error("Invalid capacity: {reason}")]
    InvalidCapacity { reason: String },

    /// Neither an explicit capacity nor a media type was configured
    #[error("No capacity configured: set a capacity or a media type")]
    MissingCapacity,

    /// Cushion percentage outside [0, 100)
    #[error("Invalid cushion {percent}%: must be at least 0 and below 100")]
    InvalidCushion { percent: f64 },

    /// Size text could not be parsed
    #[error("Invalid size '{input}': {reason}")]
    InvalidSize { input: String, reason: String },

    #[error("Unknown fit algorithm '{name}'")]
    UnknownAlgorithm { name: String },

    #[error("Unknown fit goal '{name}'")]
    UnknownGoal { name: String },

    #[error("Unknown media type '{name}'")]
    UnknownMediaType { name: String },

    #[error("Unknown checksum algorithm '{name}'")]
    UnknownChecksumAlgorithm { name: String },

    /// An item can never be placed on a volume of the given capacity
    #[error("Item {item} ({size} bytes) cannot fit in capacity {capacity}")]
    ItemTooLarge { item: String, size: u64, capacity: u64 },

    /// A span pass placed no items even though items remain
    #[error("After iteration {iteration}, unable to add any new items")]
    SpanStalled { iteration: usize },

    /// Failed to read the configuration file
    #[error("Failed to read config file: {}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    /// Configuration file is not valid TOML for this schema
    #[error("Failed to parse config file: {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Job operation attempted from the wrong lifecycle state
    #[error("Job must be in {expected:?} state to {operation}; current state: {actual:?}")]
    InvalidState {
        operation: &'static str,
        expected: JobState,
        actual: JobState,
    },
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::SourceAccessDenied { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::ReadError { source, .. }
            | Self::ConfigRead { source, .. } => source.raw_os_error().map(|e| e as u32),
            _ => None,
        }
    }
}
