//! Image decoding for texture uploads.

use std::io::{BufRead, Seek};

/// Decode a PNG or JPEG stream into an RGBA8 image of the source size.
///
/// # Errors
///
/// Returns an I/O error if the stream cannot be read, or an
/// [`image::ImageError`] if the format is unknown or the data is corrupt.
pub fn decode_rgba8(
    reader: impl BufRead + Seek,
) -> Result<image::RgbaImage, image::ImageError> {
    let decoded = image::ImageReader::new(reader)
        .with_guessed_format()?
        .decode()?;
    Ok(decoded.to_rgba8())
}
