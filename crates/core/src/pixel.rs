//! Row-major RGBA8 pixel buffer.
//!
//! A [`PixelBuffer`] is the working image every pipeline stage reads and
//! writes. Stages hand buffers along by value or clone; nothing aliases a
//! buffer across writers.

use crate::analysis::luminance;
use crate::blend::{composite_pixel, BlendMode};
use crate::color::Rgba;
use crate::error::EffectError;

/// `width * height` RGBA8 pixels, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

/// Validates dimensions and returns the byte length `width * height * 4`.
fn byte_len(width: usize, height: usize) -> Result<usize, EffectError> {
    if width == 0 || height == 0 {
        return Err(EffectError::InvalidImageDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or(EffectError::InvalidImageDimensions { width, height })
}

impl PixelBuffer {
    /// Creates a fully transparent buffer.
    ///
    /// Returns `EffectError::InvalidImageDimensions` if either dimension is
    /// zero or the byte length overflows.
    pub fn new(width: usize, height: usize) -> Result<Self, EffectError> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Creates a buffer filled with `color`.
    pub fn filled(width: usize, height: usize, color: Rgba) -> Result<Self, EffectError> {
        let len = byte_len(width, height)?;
        let data = [color.r, color.g, color.b, color.a]
            .into_iter()
            .cycle()
            .take(len)
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wraps raw RGBA8 bytes, validating `data.len() == width * height * 4`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, EffectError> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(EffectError::BufferSizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the buffer, returning the raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * 4
    }

    /// Pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> Rgba {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let i = self.offset(x, y);
        Rgba::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn try_get(&self, x: isize, y: isize) -> Option<Rgba> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.get(x as usize, y as usize))
    }

    /// Pixel under a continuous coordinate (floored), clamped to the buffer.
    pub fn get_clamped(&self, x: f64, y: f64) -> Rgba {
        let xi = (x.floor().max(0.0) as usize).min(self.width - 1);
        let yi = (y.floor().max(0.0) as usize).min(self.height - 1);
        self.get(xi, yi)
    }

    /// Overwrites the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    /// Composites `color` onto `(x, y)` with `mode` at `opacity`. Out-of-bounds is ignored.
    pub fn blend(&mut self, x: isize, y: isize, color: Rgba, mode: BlendMode, opacity: f64) {
        if let Some(dst) = self.try_get(x, y) {
            self.set(x as usize, y as usize, composite_pixel(dst, color, mode, opacity));
        }
    }

    /// Luminance of the pixel at `(x, y)` in [0, 1].
    pub fn luminance_at(&self, x: usize, y: usize) -> f64 {
        let p = self.get(x, y);
        luminance(p.r, p.g, p.b)
    }

    /// Copies out the `width` x `height` block whose top-left is `(x, y)`.
    ///
    /// Areas outside the source come back transparent.
    pub fn region(
        &self,
        x: isize,
        y: isize,
        width: usize,
        height: usize,
    ) -> Result<PixelBuffer, EffectError> {
        let mut out = PixelBuffer::new(width, height)?;
        for row in 0..height {
            for col in 0..width {
                if let Some(p) = self.try_get(x + col as isize, y + row as isize) {
                    out.set(col, row, p);
                }
            }
        }
        Ok(out)
    }

    /// Writes `src` with its top-left at `(x, y)`, replacing pixels. Clipped to bounds.
    pub fn put(&mut self, src: &PixelBuffer, x: isize, y: isize) {
        for row in 0..src.height {
            let ty = y + row as isize;
            if ty < 0 || ty as usize >= self.height {
                continue;
            }
            for col in 0..src.width {
                let tx = x + col as isize;
                if tx < 0 || tx as usize >= self.width {
                    continue;
                }
                self.set(tx as usize, ty as usize, src.get(col, row));
            }
        }
    }

    /// Iterates `(x, y, pixel)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, Rgba)> + '_ {
        self.data.chunks_exact(4).enumerate().map(|(i, p)| {
            (
                i % self.width,
                i / self.width,
                Rgba::new(p[0], p[1], p[2], p[3]),
            )
        })
    }

    /// Applies `f` to every pixel in place.
    pub fn map_in_place(&mut self, mut f: impl FnMut(usize, usize, Rgba) -> Rgba) {
        let width = self.width;
        for (i, p) in self.data.chunks_exact_mut(4).enumerate() {
            let c = f(i % width, i / width, Rgba::new(p[0], p[1], p[2], p[3]));
            p.copy_from_slice(&[c.r, c.g, c.b, c.a]);
        }
    }
}
