//! Centralized error handling for the texture cache inspector
//!
//! This module unifies the error types used across the crate and provides
//! consistent error reporting.
//!
//! # Error Categories
//!
//! - **Format Errors**: truncated or unparseable index header/entry records
//! - **Path Errors**: index paths that do not name a cache index file
//! - **I/O Errors**: unreadable cache files, blob files shorter than the index claims
//! - **Decode Errors**: raster decoding failures from the external codec step

pub mod types;

pub use types::*;

/// Convenience type alias for Results using CacheError
pub type CacheResult<T> = Result<T, CacheError>;

/// Convenience type alias for binary layout decoding Results
pub type FormatResult<T> = Result<T, FormatError>;
