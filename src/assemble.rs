//! Two-part byte-stream reconstruction
//!
//! A complete texture is its 600-byte head chunk from the blob file
//! followed by the overflow body, when one exists on disk. Assembly never
//! fails; completeness is an advisory property the consumer checks.

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::format::{HEAD_CHUNK_LEN, J2C_MAGIC};
use crate::models::CacheEntry;

/// One logical image reassembled from its disjoint on-disk parts
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    pub entry: CacheEntry,
    pub bytes: Bytes,
}

impl ReconstructedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Advisory integrity check against the codec magic and the declared
    /// size. The index's declared sizes are known to carry a systematic
    /// 600-byte accounting offset, so violations are reportable, never
    /// fatal.
    pub fn integrity(&self) -> IntegrityReport {
        let magic_ok = self.bytes.len() >= J2C_MAGIC.len() && self.bytes[..4] == J2C_MAGIC;
        IntegrityReport {
            magic_ok,
            declared_len: i64::from(self.entry.body_size) + HEAD_CHUNK_LEN as i64,
            actual_len: self.bytes.len(),
        }
    }

    /// The first bytes, for logging unexpected leading content
    pub fn leading_hex(&self) -> String {
        let take = self.bytes.len().min(J2C_MAGIC.len());
        hex::encode(&self.bytes[..take])
    }
}

/// Outcome of the advisory completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Whether the stream starts with the JPEG2000 codestream magic
    pub magic_ok: bool,
    /// `body_size + 600` as the index declares it
    pub declared_len: i64,
    /// Reassembled stream length
    pub actual_len: usize,
}

impl IntegrityReport {
    pub fn length_matches(&self) -> bool {
        matches!(i64::try_from(self.actual_len), Ok(n) if n == self.declared_len)
    }

    pub fn is_clean(&self) -> bool {
        self.magic_ok && self.length_matches()
    }
}

/// Concatenate a head chunk with its optional overflow body.
///
/// Absence of overflow data yields a possibly-incomplete image rather
/// than an error, so partial images can still be streamed for diagnosis.
pub fn reconstruct(
    entry: CacheEntry,
    head_chunk: Bytes,
    overflow_body: Option<Bytes>,
) -> ReconstructedImage {
    let bytes = match overflow_body {
        Some(body) => {
            let mut buf = BytesMut::with_capacity(head_chunk.len() + body.len());
            buf.extend_from_slice(&head_chunk);
            buf.extend_from_slice(&body);
            buf.freeze()
        }
        None => head_chunk,
    };

    ReconstructedImage { entry, bytes }
}
