//! Fetch service: incremental, filtered scans of one bound cache source
//!
//! One logical worker drives a scan and streams each reconstructed
//! texture through an `mpsc` channel to a consumer running elsewhere.
//! The service is exclusively borrowed for the duration of a scan, so a
//! second scan or a source swap cannot land mid-flight; callers that
//! share a service across tasks serialize through that `&mut` access.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assemble::{self, ReconstructedImage};
use crate::errors::CacheError;
use crate::format::{self, HEADER_LEN};
use crate::models::CacheEntry;
use crate::reader::CacheReader;
use crate::services::texture_cache::TextureCacheMap;

/// How a scan treats textures already materialized this session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Visit every entry that passes the recency filter.
    ///
    /// Does NOT implicitly clear the in-memory cache; callers wanting a
    /// hard reset call [`FetchService::clear`] first.
    Rebuild,
    /// Skip identifiers already present in the in-memory cache
    Incremental,
}

/// Bound on `|now - last_access_time|` used to filter scan entries
#[derive(Debug, Clone, Copy)]
pub struct RecencyWindow {
    now: u64,
    max_age_seconds: u64,
}

impl RecencyWindow {
    /// Window ending at the current wall clock
    pub fn ending_now(max_age: Duration) -> Self {
        Self::at(unix_now(), max_age)
    }

    /// Window ending at a fixed reference time
    pub fn at(now_unix: u64, max_age: Duration) -> Self {
        Self {
            now: now_unix,
            max_age_seconds: max_age.as_secs(),
        }
    }

    pub fn includes(&self, last_access_time: u32) -> bool {
        self.now.abs_diff(u64::from(last_access_time)) <= self.max_age_seconds
    }
}

/// Scan configuration
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub mode: ScanMode,
    pub recency: Option<RecencyWindow>,
}

impl ScanOptions {
    pub fn rebuild() -> Self {
        Self {
            mode: ScanMode::Rebuild,
            recency: None,
        }
    }

    pub fn incremental() -> Self {
        Self {
            mode: ScanMode::Incremental,
            recency: None,
        }
    }

    pub fn with_recency(mut self, window: RecencyWindow) -> Self {
        self.recency = Some(window);
        self
    }
}

/// Counters describing one finished (or aborted) scan
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSummary {
    /// Entry count the index header claims
    pub declared_entries: u32,
    /// Entry records actually decoded
    pub decoded_entries: usize,
    /// Textures reconstructed and delivered to the consumer
    pub yielded: usize,
    /// Entries outside the recency window
    pub skipped_stale: usize,
    /// Entries already materialized this session (incremental mode)
    pub skipped_cached: usize,
    /// Entries whose head chunk or overflow body could not be read
    pub skipped_unreadable: usize,
    /// Whether the scan stopped before visiting every entry
    pub cancelled: bool,
}

/// Orchestrates scans over one bound [`CacheReader`]
#[derive(Debug, Default)]
pub struct FetchService {
    reader: Option<CacheReader>,
    cache: TextureCacheMap,
    manifest: HashMap<Uuid, CacheEntry>,
}

impl FetchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service bound to a source from the start
    pub fn with_source<P: Into<std::path::PathBuf>>(entries_path: P) -> Result<Self, CacheError> {
        let mut service = Self::new();
        service.set_source(entries_path)?;
        Ok(service)
    }

    /// Bind a new cache source.
    ///
    /// On failure the previous binding (if any) is retained. Does not
    /// clear the in-memory cache; the caller decides whether a source
    /// change implies a rebuild.
    pub fn set_source<P: Into<std::path::PathBuf>>(
        &mut self,
        entries_path: P,
    ) -> Result<(), CacheError> {
        let reader = CacheReader::open(entries_path)?;
        info!("Texture cache source set to {:?}", reader.entries_path());
        self.reader = Some(reader);
        Ok(())
    }

    pub fn source(&self) -> Option<&CacheReader> {
        self.reader.as_ref()
    }

    /// Number of head chunks materialized this session
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Empty the in-memory cache; the bound source is unaffected.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.manifest.clear();
        info!("In-memory texture cache cleared");
    }

    /// Scan the bound source and stream reconstructed textures into
    /// `results` in ordinal order.
    ///
    /// A header failure aborts the whole scan; every other failure is
    /// entry-scoped, logged, and skipped. Cancellation is checked between
    /// entries. Dropping the receiver also ends the scan early.
    pub async fn scan(
        &mut self,
        options: ScanOptions,
        results: mpsc::Sender<ReconstructedImage>,
        cancel: CancellationToken,
    ) -> Result<ScanSummary, CacheError> {
        let reader = self.reader.as_ref().ok_or(CacheError::NoSource)?;
        let started = Instant::now();

        let index = reader.load_index_bytes().await?;
        let header = format::decode_header(&index)?;
        info!(
            "Read header from texture cache (version: {}, address size: {}, encoder: {}, entries: {})",
            header.version_label(),
            header.address_size,
            header.encoder_version,
            header.entry_count
        );

        let (entries, decoded) = format::decode_entries(&index[HEADER_LEN..], header.entry_count);
        let blob = reader.load_blob_bytes().await?;

        let mut summary = ScanSummary {
            declared_entries: header.entry_count,
            decoded_entries: decoded,
            ..Default::default()
        };

        for (ordinal, entry) in entries.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Scan cancelled after {} of {} entries", ordinal, decoded);
                summary.cancelled = true;
                break;
            }

            if let Some(window) = &options.recency {
                if !window.includes(entry.last_access_time) {
                    summary.skipped_stale += 1;
                    continue;
                }
            }

            if options.mode == ScanMode::Incremental && self.cache.contains(&entry.id) {
                summary.skipped_cached += 1;
                continue;
            }

            let head_chunk = match CacheReader::head_chunk_at(&blob, ordinal) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Skipping entry {} ({}): {}", ordinal, entry.id, e);
                    summary.skipped_unreadable += 1;
                    continue;
                }
            };

            let overflow = match reader.overflow_body_for(entry.id).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping entry {} ({}): {}", ordinal, entry.id, e);
                    summary.skipped_unreadable += 1;
                    continue;
                }
            };

            self.cache.add(entry.id, head_chunk.clone());
            self.manifest.insert(entry.id, entry.clone());

            let image = assemble::reconstruct(entry, head_chunk, overflow);
            let report = image.integrity();
            if !report.magic_ok {
                debug!(
                    "Texture {} does not start with the J2C magic (got {})",
                    image.entry.id,
                    image.leading_hex()
                );
            }

            let id = image.entry.id;
            if results.send(image).await.is_err() {
                debug!("Result receiver dropped, ending scan at {}", id);
                summary.cancelled = true;
                break;
            }
            summary.yielded += 1;
        }

        info!(
            "Texture scan completed in {:.2}s: {} yielded, {} stale, {} cached, {} unreadable ({} of {} declared entries decoded)",
            started.elapsed().as_secs_f64(),
            summary.yielded,
            summary.skipped_stale,
            summary.skipped_cached,
            summary.skipped_unreadable,
            summary.decoded_entries,
            summary.declared_entries
        );

        Ok(summary)
    }

    /// Reconstruct a single texture discovered by a prior scan.
    ///
    /// Never touches the blob file: the head chunk comes from the
    /// in-memory cache and only the overflow body is (re)read from disk.
    pub async fn fetch_one(&self, id: Uuid) -> Result<ReconstructedImage, CacheError> {
        let reader = self.reader.as_ref().ok_or(CacheError::NoSource)?;
        let head_chunk = self.cache.get(&id).ok_or(CacheError::NotFound { id })?;
        let entry = self
            .manifest
            .get(&id)
            .cloned()
            .ok_or(CacheError::NotFound { id })?;

        let overflow = reader.overflow_body_for(id).await?;
        Ok(assemble::reconstruct(entry, head_chunk, overflow))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_window_bounds() {
        let window = RecencyWindow::at(10_000, Duration::from_secs(3600));
        assert!(window.includes(10_000));
        assert!(window.includes(6_400));
        assert!(window.includes(13_600));
        assert!(!window.includes(6_399));
        assert!(!window.includes(13_601));
    }

    #[test]
    fn test_scan_options_builders() {
        let options = ScanOptions::incremental()
            .with_recency(RecencyWindow::at(0, Duration::from_secs(60)));
        assert_eq!(options.mode, ScanMode::Incremental);
        assert!(options.recency.is_some());
        assert_eq!(ScanOptions::rebuild().mode, ScanMode::Rebuild);
    }

    #[tokio::test]
    async fn test_scan_without_source() {
        let mut service = FetchService::new();
        let (tx, _rx) = mpsc::channel(1);
        let result = service
            .scan(ScanOptions::rebuild(), tx, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(CacheError::NoSource)));
    }

    #[tokio::test]
    async fn test_fetch_one_without_source() {
        let service = FetchService::new();
        let result = service.fetch_one(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CacheError::NoSource)));
    }
}
