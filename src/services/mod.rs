//! Service layer orchestrating cache reads into consumer-facing results
//!
//! Services own the mutable session state: the in-memory texture cache
//! and the binding to one on-disk cache source. The fetch service runs
//! scans on one task and hands results to consumers over a channel.

pub mod fetch;
pub mod texture_cache;

pub use fetch::{FetchService, RecencyWindow, ScanMode, ScanOptions, ScanSummary};
pub use texture_cache::TextureCacheMap;
