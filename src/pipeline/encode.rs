//! Image embedding: raw file bytes → `data:` URI.
//!
//! Used by the base64 fallback when there is no stable file to link to. The
//! bytes are embedded exactly as saved; nothing is re-encoded, so a JPEG
//! stays a JPEG and its MIME type is sniffed from the header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

/// MIME type for image bytes, sniffed from the magic number.
///
/// Unknown data is labelled `image/png`, the format every clipboard helper
/// script writes.
pub fn mime_for(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Ico) => "image/x-icon",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => "image/png",
    }
}

/// `data:<mime>;base64,<payload>` for the given bytes.
pub fn data_uri(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    format!("data:{};base64,{}", mime_for(bytes), b64)
}
