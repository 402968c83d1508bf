use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::errors::TransformError;

/// Encode `image` as PNG in memory.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(TransformError::Encode)?;
    Ok(buffer.into_inner())
}

/// Re-encode whatever the remover produced as 8-bit RGBA PNG.
///
/// Grayscale, palette or 16-bit outputs are all flattened to RGBA8 so every
/// written file has the same color model and an alpha channel.
pub fn normalize_to_rgba_png(bytes: &[u8]) -> Result<Vec<u8>, TransformError> {
    let image = image::load_from_memory(bytes).map_err(TransformError::Decode)?;
    encode_png(&DynamicImage::ImageRgba8(image.into_rgba8()))
}
