//! Binary layout decoder for the texture cache index
//!
//! The index file carries a 44-byte header followed by fixed 28-byte entry
//! records, all little-endian:
//!
//! ```text
//! header:  f32 version | u32 address_size | [u8; 32] encoder_version | u32 entry_count
//! entry:   [u8; 16] identifier | i32 image_size | i32 body_size | u32 last_access_time
//! ```
//!
//! Pure byte-buffer parsing, no I/O.

use tracing::warn;
use uuid::Uuid;

use crate::errors::FormatError;
use crate::models::{CacheEntry, CacheHeader};

/// Total header size in bytes
pub const HEADER_LEN: usize = 44;

/// Size of one entry record in bytes
pub const ENTRY_LEN: usize = 28;

/// Size of one head chunk in the blob file
pub const HEAD_CHUNK_LEN: usize = 600;

/// JPEG2000 codestream magic expected at the start of every complete texture
pub const J2C_MAGIC: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];

const ENCODER_VERSION_LEN: usize = 32;

fn read_f32(buf: &[u8], at: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    f32::from_le_bytes(raw)
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    i32::from_le_bytes(raw)
}

/// Decode the 44-byte index header from the start of `buf`.
pub fn decode_header(buf: &[u8]) -> Result<CacheHeader, FormatError> {
    if buf.len() < HEADER_LEN {
        return Err(FormatError::TruncatedHeader {
            expected: HEADER_LEN,
            actual: buf.len(),
        });
    }

    let version = read_f32(buf, 0);
    let address_size = read_u32(buf, 4);
    let raw_encoder = &buf[8..8 + ENCODER_VERSION_LEN];
    let end = raw_encoder
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(ENCODER_VERSION_LEN);
    let encoder_version = String::from_utf8_lossy(&raw_encoder[..end]).into_owned();
    let entry_count = read_u32(buf, 40);

    Ok(CacheHeader {
        version,
        address_size,
        encoder_version,
        entry_count,
    })
}

/// Decode one 28-byte entry record from the start of `buf`.
///
/// Only the first 16 bytes form the identifier; callers treat a
/// truncation as "no more valid entries", not as a load failure.
pub fn decode_entry(buf: &[u8]) -> Result<CacheEntry, FormatError> {
    if buf.len() < ENTRY_LEN {
        return Err(FormatError::TruncatedEntry {
            expected: ENTRY_LEN,
            actual: buf.len(),
        });
    }

    let mut id_bytes = [0u8; 16];
    id_bytes.copy_from_slice(&buf[0..16]);

    Ok(CacheEntry {
        id: Uuid::from_bytes(id_bytes),
        image_size: read_i32(buf, 16),
        body_size: read_i32(buf, 20),
        last_access_time: read_u32(buf, 24),
    })
}

/// Decode up to `declared_count` entry records from `buf`, which starts at
/// the first record (just past the header).
///
/// Stops at the first truncated record and returns the partial list; a
/// count shortfall is a recoverable integrity warning, never an error.
pub fn decode_entries(buf: &[u8], declared_count: u32) -> (Vec<CacheEntry>, usize) {
    // The declared count comes from an untrusted header; never allocate
    // more than the buffer can actually hold.
    let holdable = buf.len() / ENTRY_LEN;
    let mut entries = Vec::with_capacity((declared_count as usize).min(holdable));

    for ordinal in 0..declared_count as usize {
        let start = ordinal * ENTRY_LEN;
        if start >= buf.len() {
            break;
        }
        match decode_entry(&buf[start..]) {
            Ok(entry) => entries.push(entry),
            Err(FormatError::TruncatedEntry { actual, .. }) => {
                warn!(
                    "Entry {} truncated ({} of {} bytes), stopping entry decode",
                    ordinal, actual, ENTRY_LEN
                );
                break;
            }
            Err(_) => break,
        }
    }

    let actual_count = entries.len();
    if actual_count != declared_count as usize {
        warn!(
            "Number of read entries ({}) does not match declared count ({})",
            actual_count, declared_count
        );
    }

    (entries, actual_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn encode_header(
        version: f32,
        address_size: u32,
        encoder_version: &str,
        entry_count: u32,
    ) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&address_size.to_le_bytes());
        let mut encoder = [0u8; 32];
        encoder[..encoder_version.len()].copy_from_slice(encoder_version.as_bytes());
        buf.extend_from_slice(&encoder);
        buf.extend_from_slice(&entry_count.to_le_bytes());
        buf
    }

    pub(crate) fn encode_entry(
        id: Uuid,
        image_size: i32,
        body_size: i32,
        last_access_time: u32,
    ) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ENTRY_LEN);
        buf.extend_from_slice(id.as_bytes());
        buf.extend_from_slice(&image_size.to_le_bytes());
        buf.extend_from_slice(&body_size.to_le_bytes());
        buf.extend_from_slice(&last_access_time.to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_header_roundtrip() {
        let buf = encode_header(1.0, 4, "test", 3);
        let header = decode_header(&buf).unwrap();
        assert_eq!(header.version_label(), "1.00");
        assert_eq!(header.address_size, 4);
        assert_eq!(header.encoder_version, "test");
        assert_eq!(header.entry_count, 3);
    }

    #[test]
    fn test_decode_header_truncated() {
        let buf = encode_header(1.0, 4, "test", 3);
        let err = decode_header(&buf[..43]).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TruncatedHeader {
                expected: HEADER_LEN,
                actual: 43
            }
        ));
    }

    #[test]
    fn test_decode_header_full_encoder_field() {
        // No NUL terminator when all 32 bytes are used
        let buf = encode_header(2.5, 8, "abcdefghijklmnopqrstuvwxyz012345", 1);
        let header = decode_header(&buf).unwrap();
        assert_eq!(header.encoder_version, "abcdefghijklmnopqrstuvwxyz012345");
    }

    #[test]
    fn test_decode_entry_identifier_rendering() {
        let raw: [u8; 16] = [
            0x55, 0x0e, 0x84, 0x00, 0xe2, 0x9b, 0x41, 0xd4, 0xa7, 0x16, 0x44, 0x66, 0x55, 0x44,
            0x00, 0x00,
        ];
        let buf = encode_entry(Uuid::from_bytes(raw), 1200, 600, 42);
        let entry = decode_entry(&buf).unwrap();
        assert_eq!(entry.id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(entry.id.to_string().len(), 36);
        assert_eq!(entry.image_size, 1200);
        assert_eq!(entry.body_size, 600);
        assert_eq!(entry.last_access_time, 42);
    }

    #[test]
    fn test_decode_entry_negative_sizes() {
        let buf = encode_entry(Uuid::new_v4(), -1, -600, 0);
        let entry = decode_entry(&buf).unwrap();
        assert_eq!(entry.image_size, -1);
        assert_eq!(entry.body_size, -600);
    }

    #[test]
    fn test_decode_entry_truncated() {
        let buf = encode_entry(Uuid::new_v4(), 0, 0, 0);
        assert!(decode_entry(&buf[..27]).is_err());
    }

    #[test]
    fn test_decode_entries_exact() {
        let mut buf = Vec::new();
        for i in 0..3u32 {
            buf.extend_from_slice(&encode_entry(Uuid::new_v4(), 0, 0, i));
        }
        let (entries, actual) = decode_entries(&buf, 3);
        assert_eq!(actual, 3);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].last_access_time, 2);
    }

    #[test]
    fn test_decode_entries_short_section() {
        // Declared 5 but only 3 complete records present
        let mut buf = Vec::new();
        for _ in 0..3 {
            buf.extend_from_slice(&encode_entry(Uuid::new_v4(), 0, 0, 0));
        }
        buf.extend_from_slice(&[0u8; 10]); // partial fourth record
        let (entries, actual) = decode_entries(&buf, 5);
        assert_eq!(actual, 3);
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_decode_entries_empty() {
        let (entries, actual) = decode_entries(&[], 4);
        assert!(entries.is_empty());
        assert_eq!(actual, 0);
    }

    #[test]
    fn test_decode_entries_absurd_declared_count() {
        // A corrupt header declaring u32::MAX entries must degrade to the
        // records actually present, not exhaust the allocator up front.
        let (entries, actual) = decode_entries(&[], u32::MAX);
        assert!(entries.is_empty());
        assert_eq!(actual, 0);

        let mut buf = Vec::new();
        for _ in 0..2 {
            buf.extend_from_slice(&encode_entry(Uuid::new_v4(), 0, 0, 0));
        }
        let (entries, actual) = decode_entries(&buf, u32::MAX);
        assert_eq!(actual, 2);
        assert_eq!(entries.len(), 2);
        assert!(entries.capacity() < 1024);
    }
}
