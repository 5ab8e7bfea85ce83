//! PNG import and export of [`PixelBuffer`]s.
//!
//! Feature-gated behind `png` (default on) so hosts that bring their own
//! decoder can depend on the registry without pulling in the `image` crate.

use std::path::Path;

use artfx_core::error::EffectError;
use artfx_core::pixel::PixelBuffer;

/// Writes a buffer as an RGBA PNG.
///
/// Returns `EffectError::InvalidImageDimensions` if the buffer dimensions
/// overflow `u32`, or `EffectError::Io` on write failure.
pub fn write_png(buffer: &PixelBuffer, path: &Path) -> Result<(), EffectError> {
    let invalid = || EffectError::InvalidImageDimensions {
        width: buffer.width(),
        height: buffer.height(),
    };
    let w = u32::try_from(buffer.width()).map_err(|_| invalid())?;
    let h = u32::try_from(buffer.height()).map_err(|_| invalid())?;
    let img = image::RgbaImage::from_raw(w, h, buffer.data().to_vec())
        .ok_or_else(|| EffectError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| EffectError::Io(e.to_string()))?;
    tracing::debug!(path = %path.display(), width = w, height = h, "png written");
    Ok(())
}

/// Decodes any PNG or JPEG into an RGBA buffer.
pub fn load_image(path: &Path) -> Result<PixelBuffer, EffectError> {
    let img = image::open(path)
        .map_err(|e| EffectError::Io(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    tracing::debug!(path = %path.display(), width = w, height = h, "image loaded");
    PixelBuffer::from_raw(w, h, img.into_raw())
}
