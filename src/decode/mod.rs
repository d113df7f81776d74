//! External decode-to-raster seam
//!
//! The reconstructor treats the codec step as an opaque collaborator: a
//! complete byte stream goes in, a raster or a decode failure comes out.
//! A decode failure means "no image available for this identifier" and
//! never aborts a scan.

use image::DynamicImage;
use tracing::debug;
use uuid::Uuid;

use crate::errors::DecodeError;

/// Longest edge of a sub-sampled thumbnail render
pub const THUMBNAIL_EDGE: u32 = 128;

/// Render fidelity requested from the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeHint {
    /// Full-resolution raster
    Full,
    /// Cheap sub-sampled render for list views
    Thumbnail,
}

/// The decode step the presentation layer plugs in
pub trait TextureDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], hint: DecodeHint) -> Result<DynamicImage, DecodeError>;
}

/// Decoder backed by the `image` crate's format auto-detection
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl TextureDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8], hint: DecodeHint) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let raster = image::load_from_memory(bytes)?;
        Ok(match hint {
            DecodeHint::Full => raster,
            DecodeHint::Thumbnail => raster.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE),
        })
    }
}

/// Decode a reconstructed stream, mapping failure to "no image available".
pub fn decode_or_none(
    decoder: &dyn TextureDecoder,
    id: Uuid,
    bytes: &[u8],
    hint: DecodeHint,
) -> Option<DynamicImage> {
    match decoder.decode(bytes, hint) {
        Ok(raster) => Some(raster),
        Err(e) => {
            debug!("No image available for {}: {}", id, e);
            None
        }
    }
}
