//! Error type definitions for the texture cache inspector
//!
//! This module defines all error types used throughout the crate,
//! providing a hierarchical error system that keeps failure granularity
//! explicit: header problems are fatal for a scan, entry problems are not.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for cache inspection operations
///
/// Uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining from the layer-specific error enums below.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Binary layout errors from the index file
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Index path validation errors
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// File access errors
    #[error("I/O error: {0}")]
    Io(#[from] CacheIoError),

    /// Raster decoding errors from the external codec step
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The identifier has not been discovered by any prior scan
    #[error("Not found: texture {id} has not been seen by a scan")]
    NotFound { id: Uuid },

    /// No cache source is bound yet
    #[error("No cache source bound: call set_source first")]
    NoSource,
}

/// Binary layout errors for the fixed-size index structures
///
/// A truncated header makes the whole index untrustworthy; a truncated
/// entry only means there are no further valid entries.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Fewer bytes than the fixed header layout requires
    #[error("Truncated header: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// Fewer bytes than one fixed entry record requires
    #[error("Truncated entry: need {expected} bytes, got {actual}")]
    TruncatedEntry { expected: usize, actual: usize },
}

/// Index path validation errors
#[derive(Error, Debug)]
pub enum PathError {
    /// The path does not plausibly refer to a cache index file
    #[error("Invalid index path {path:?}: {reason}")]
    InvalidIndexPath { path: PathBuf, reason: String },
}

/// File access errors for the cache files
#[derive(Error, Debug)]
pub enum CacheIoError {
    /// A whole-file read failed
    #[error("Read failed for {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blob buffer is shorter than the requested head chunk requires
    #[error("Short read: ordinal {ordinal} needs {required} bytes, blob holds {available}")]
    ShortRead {
        ordinal: usize,
        required: usize,
        available: usize,
    },
}

/// Errors from the external decode-to-raster collaborator
///
/// These surface to consumers as "no image available for this identifier",
/// never as a scan abort.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Raster decode failed: {0}")]
    Raster(#[from] image::ImageError),

    #[error("Empty byte stream")]
    Empty,
}

impl PathError {
    /// Create an invalid index path error with a custom reason
    pub fn invalid_index_path<P: Into<PathBuf>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::InvalidIndexPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl CacheIoError {
    /// Create a read-failed error for a path
    pub fn read_failed<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }
}
