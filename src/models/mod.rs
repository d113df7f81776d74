//! Typed records decoded from the on-disk cache index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Index file header, one per cache
///
/// Describes the whole index file; recreated every time the index path
/// is (re)loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHeader {
    /// On-disk format version, stored as an IEEE-754 float
    pub version: f32,
    /// Address size the producing viewer was built with
    pub address_size: u32,
    /// Encoder version string, trimmed of NUL padding
    pub encoder_version: String,
    /// Number of entry records the index claims to contain
    pub entry_count: u32,
}

impl CacheHeader {
    /// Version rendered the way the producing viewer logs it, two decimal places
    pub fn version_label(&self) -> String {
        format!("{:.2}", self.version)
    }
}

/// One fixed-size entry record from the index file
///
/// The ordinal position within the index file is significant: entry `i`
/// owns the blob-file byte range `[i * 600, i * 600 + 600)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Texture identifier (canonical lowercase hyphenated rendering)
    pub id: Uuid,
    /// Declared total image size; advisory only, known to carry a
    /// systematic 600-byte accounting offset
    pub image_size: i32,
    /// Declared overflow body size; advisory only
    pub body_size: i32,
    /// Last access time, unix seconds
    pub last_access_time: u32,
}

impl CacheEntry {
    /// Last access time as a UTC timestamp
    pub fn last_access(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.last_access_time), 0).unwrap_or_default()
    }
}
