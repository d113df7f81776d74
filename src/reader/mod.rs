//! File-system access for the three cache file roles
//!
//! A single path to the index file (`texture.entries`) determines
//! everything else: the sibling blob file (`texture.cache`) and the cache
//! root directory that holds the per-UUID overflow bodies at
//! `<root>/<first-hex-char>/<uuid>.texture`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{CacheIoError, PathError};
use crate::format::HEAD_CHUNK_LEN;

/// Expected file name of the cache index
pub const ENTRIES_FILE_NAME: &str = "texture.entries";

/// Expected file name of the head-chunk blob file
pub const BLOB_FILE_NAME: &str = "texture.cache";

/// File extension of per-UUID overflow bodies
pub const OVERFLOW_EXTENSION: &str = "texture";

/// Read-only access to one texture cache on disk
#[derive(Debug, Clone)]
pub struct CacheReader {
    entries_path: PathBuf,
    blob_path: PathBuf,
    root_dir: PathBuf,
}

impl CacheReader {
    /// Open a cache via the path to its `texture.entries` index file.
    ///
    /// Validates the file name convention and existence; the blob file is
    /// only checked when it is actually read.
    pub fn open<P: Into<PathBuf>>(entries_path: P) -> Result<Self, PathError> {
        let entries_path = entries_path.into();

        let file_name = entries_path.file_name().and_then(|n| n.to_str());
        if file_name != Some(ENTRIES_FILE_NAME) {
            return Err(PathError::invalid_index_path(
                entries_path,
                format!("expected a file named {ENTRIES_FILE_NAME}"),
            ));
        }
        if !entries_path.is_file() {
            return Err(PathError::invalid_index_path(
                entries_path,
                "index file does not exist",
            ));
        }

        let root_dir = entries_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let blob_path = root_dir.join(BLOB_FILE_NAME);

        debug!("Opened texture cache rooted at {:?}", root_dir);

        Ok(Self {
            entries_path,
            blob_path,
            root_dir,
        })
    }

    pub fn entries_path(&self) -> &Path {
        &self.entries_path
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob_path
    }

    /// Cache root directory used for overflow-body lookups
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Read the entire index file into memory.
    pub async fn load_index_bytes(&self) -> Result<Bytes, CacheIoError> {
        let data = fs::read(&self.entries_path)
            .await
            .map_err(|e| CacheIoError::read_failed(&self.entries_path, e))?;
        Ok(Bytes::from(data))
    }

    /// Read the entire blob file into memory.
    pub async fn load_blob_bytes(&self) -> Result<Bytes, CacheIoError> {
        let data = fs::read(&self.blob_path)
            .await
            .map_err(|e| CacheIoError::read_failed(&self.blob_path, e))?;
        Ok(Bytes::from(data))
    }

    /// The 600-byte head chunk at `ordinal * 600` within a loaded blob buffer.
    ///
    /// Fails when the blob file is truncated relative to the index.
    pub fn head_chunk_at(blob: &Bytes, ordinal: usize) -> Result<Bytes, CacheIoError> {
        let start = ordinal * HEAD_CHUNK_LEN;
        let end = start + HEAD_CHUNK_LEN;
        if blob.len() < end {
            return Err(CacheIoError::ShortRead {
                ordinal,
                required: end,
                available: blob.len(),
            });
        }
        Ok(blob.slice(start..end))
    }

    /// Fully determined overflow-body path for an identifier; no directory
    /// enumeration is ever needed.
    pub fn overflow_path_for(&self, id: Uuid) -> PathBuf {
        let name = id.to_string();
        // canonical rendering is lowercase hex, first char picks the shard dir
        let shard = &name[..1];
        self.root_dir
            .join(shard)
            .join(format!("{name}.{OVERFLOW_EXTENSION}"))
    }

    /// Read the overflow body for an identifier, if one exists.
    ///
    /// Absence is the expected steady state for small images and maps to
    /// `Ok(None)`, not an error.
    pub async fn overflow_body_for(&self, id: Uuid) -> Result<Option<Bytes>, CacheIoError> {
        let path = self.overflow_path_for(id);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No overflow body for {}", id);
                Ok(None)
            }
            Err(e) => Err(CacheIoError::read_failed(path, e)),
        }
    }
}
