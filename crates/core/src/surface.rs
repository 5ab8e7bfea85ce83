//! Drawing-surface abstraction.
//!
//! Renderers never touch a host display directly. They draw into a
//! [`Surface`]: a fixed-size RGBA target supporting pixel read-back and
//! write, plus the few immediate-mode primitives the effects use (filled
//! rectangles, stroked line segments, filled circles and scaled images).
//!
//! [`RasterSurface`] rasterises into an owned [`PixelBuffer`] with simple
//! distance-based antialiasing. [`RecordingSurface`] keeps a list of
//! [`DrawCommand`]s, which lets tests step an effect and inspect what it drew.

use glam::DVec2;

use crate::blend::{composite_pixel, BlendMode};
use crate::color::Rgba;
use crate::contour::Segment;
use crate::error::EffectError;
use crate::geometry::Rect;
use crate::pixel::PixelBuffer;
use crate::sampler::resample;

/// Color, blend mode and global alpha of a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Rgba,
    pub blend: BlendMode,
    /// Multiplied with the color's own alpha.
    pub alpha: f64,
}

impl Paint {
    /// Opaque source-over paint.
    pub fn new(color: Rgba) -> Self {
        Self {
            color,
            blend: BlendMode::Normal,
            alpha: 1.0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// A drawable RGBA target of fixed size.
pub trait Surface {
    /// `(width, height)` in pixels.
    fn size(&self) -> (usize, usize);

    /// Copies out the pixels under `rect` (rounded to whole pixels).
    fn read_pixels(&self, rect: Rect) -> Result<PixelBuffer, EffectError>;

    /// Replaces pixels with `buffer`, top-left at `(x, y)`, clipped to the surface.
    fn write_pixels(&mut self, buffer: &PixelBuffer, x: isize, y: isize);

    fn fill_rect(&mut self, rect: Rect, paint: Paint);

    /// Strokes all `segments` as one path of the given line width.
    fn stroke_path(&mut self, segments: &[Segment], width: f64, paint: Paint);

    fn fill_circle(&mut self, center: DVec2, radius: f64, paint: Paint);

    /// Scales the `src_rect` region of `source` into `dest_rect`.
    fn draw_image(
        &mut self,
        source: &PixelBuffer,
        src_rect: Rect,
        dest_rect: Rect,
        blend: BlendMode,
        alpha: f64,
    ) -> Result<(), EffectError>;

    /// Replaces every pixel with `color`.
    fn clear(&mut self, color: Rgba) -> Result<(), EffectError> {
        let (w, h) = self.size();
        let buf = PixelBuffer::filled(w, h, color)?;
        self.write_pixels(&buf, 0, 0);
        Ok(())
    }

    /// Shorthand for `fill_rect` over the whole surface.
    fn fill_all(&mut self, paint: Paint) {
        let (w, h) = self.size();
        self.fill_rect(Rect::full(w, h), paint);
    }
}

/// Software rasteriser over an owned pixel buffer.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    buffer: PixelBuffer,
}

impl RasterSurface {
    /// Transparent surface of the given size.
    pub fn new(width: usize, height: usize) -> Result<Self, EffectError> {
        Ok(Self {
            buffer: PixelBuffer::new(width, height)?,
        })
    }

    pub fn from_buffer(buffer: PixelBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// Integer pixel range `[lo, hi)` of centres lying inside `[a, b)`, clipped to `[0, max)`.
    fn span(a: f64, b: f64, max: usize) -> (usize, usize) {
        let lo = (a - 0.5).ceil().max(0.0);
        let hi = (b - 0.5).ceil().clamp(0.0, max as f64);
        (lo as usize, (hi as usize).max(lo as usize))
    }

    fn blend_coverage(&mut self, x: usize, y: usize, coverage: f64, paint: &Paint) {
        if coverage <= 0.0 {
            return;
        }
        let dst = self.buffer.get(x, y);
        let out = composite_pixel(dst, paint.color, paint.blend, paint.alpha * coverage.min(1.0));
        self.buffer.set(x, y, out);
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Antialiased coverage of a pixel at distance `d` from a stroke or disc edge
/// of half-width `half`. Hairlines thinner than a pixel fade in proportion to width.
fn coverage(d: f64, half: f64) -> f64 {
    if half >= 0.5 {
        (half + 0.5 - d).clamp(0.0, 1.0)
    } else {
        (1.0 - d).clamp(0.0, 1.0) * half * 2.0
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (usize, usize) {
        (self.buffer.width(), self.buffer.height())
    }

    fn read_pixels(&self, rect: Rect) -> Result<PixelBuffer, EffectError> {
        self.buffer.region(
            rect.x.round() as isize,
            rect.y.round() as isize,
            rect.width.round().max(0.0) as usize,
            rect.height.round().max(0.0) as usize,
        )
    }

    fn write_pixels(&mut self, buffer: &PixelBuffer, x: isize, y: isize) {
        self.buffer.put(buffer, x, y);
    }

    fn fill_rect(&mut self, rect: Rect, paint: Paint) {
        let (w, h) = self.size();
        let (x0, x1) = Self::span(rect.x, rect.right(), w);
        let (y0, y1) = Self::span(rect.y, rect.bottom(), h);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_coverage(x, y, 1.0, &paint);
            }
        }
    }

    fn stroke_path(&mut self, segments: &[Segment], width: f64, paint: Paint) {
        if segments.is_empty() || width <= 0.0 {
            return;
        }
        let half = width / 2.0;
        let pad = half + 1.0;
        let (w, h) = self.size();
        let (mut min, mut max) = (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY));
        for s in segments {
            min = min.min(s.from).min(s.to);
            max = max.max(s.from).max(s.to);
        }
        let (x0, x1) = Self::span(min.x - pad, max.x + pad, w);
        let (y0, y1) = Self::span(min.y - pad, max.y + pad, h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        // One coverage value per pixel so overlapping segments of a path blend once.
        let bw = x1 - x0;
        let mut cover = vec![0.0_f64; bw * (y1 - y0)];
        for s in segments {
            let (sx0, sx1) = Self::span(s.from.x.min(s.to.x) - pad, s.from.x.max(s.to.x) + pad, w);
            let (sy0, sy1) = Self::span(s.from.y.min(s.to.y) - pad, s.from.y.max(s.to.y) + pad, h);
            for y in sy0.max(y0)..sy1.min(y1) {
                for x in sx0.max(x0)..sx1.min(x1) {
                    let p = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                    let c = coverage(distance_to_segment(p, s.from, s.to), half);
                    let slot = &mut cover[(y - y0) * bw + (x - x0)];
                    *slot = slot.max(c);
                }
            }
        }
        for y in y0..y1 {
            for x in x0..x1 {
                let c = cover[(y - y0) * bw + (x - x0)];
                self.blend_coverage(x, y, c, &paint);
            }
        }
    }

    fn fill_circle(&mut self, center: DVec2, radius: f64, paint: Paint) {
        if radius <= 0.0 {
            return;
        }
        let (w, h) = self.size();
        let (x0, x1) = Self::span(center.x - radius - 1.0, center.x + radius + 1.0, w);
        let (y0, y1) = Self::span(center.y - radius - 1.0, center.y + radius + 1.0, h);
        for y in y0..y1 {
            for x in x0..x1 {
                let d = DVec2::new(x as f64 + 0.5, y as f64 + 0.5).distance(center);
                let c = if radius >= 0.5 {
                    (radius + 0.5 - d).clamp(0.0, 1.0)
                } else {
                    // Sub-pixel dot: spread its area over the nearest pixel.
                    (1.0 - d).clamp(0.0, 1.0) * std::f64::consts::PI * radius * radius
                };
                self.blend_coverage(x, y, c, &paint);
            }
        }
    }

    fn draw_image(
        &mut self,
        source: &PixelBuffer,
        src_rect: Rect,
        dest_rect: Rect,
        blend: BlendMode,
        alpha: f64,
    ) -> Result<(), EffectError> {
        let dw = dest_rect.width.round() as usize;
        let dh = dest_rect.height.round() as usize;
        if dw == 0 || dh == 0 {
            return Ok(());
        }
        let scaled = resample(source, src_rect, dw, dh)?;
        let ox = dest_rect.x.round() as isize;
        let oy = dest_rect.y.round() as isize;
        for (x, y, p) in scaled.pixels() {
            self.buffer
                .blend(ox + x as isize, oy + y as isize, p, blend, alpha);
        }
        Ok(())
    }
}

/// A single recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Rgba),
    WritePixels {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
    },
    FillRect {
        rect: Rect,
        paint: Paint,
    },
    StrokePath {
        segments: Vec<Segment>,
        width: f64,
        paint: Paint,
    },
    FillCircle {
        center: DVec2,
        radius: f64,
        paint: Paint,
    },
    DrawImage {
        src_rect: Rect,
        dest_rect: Rect,
        blend: BlendMode,
        alpha: f64,
    },
}

/// Surface that records draw calls instead of rasterising them.
///
/// `read_pixels` returns transparent pixels.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: usize,
    height: usize,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drains the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn circles(&self) -> impl Iterator<Item = (DVec2, f64, &Paint)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillCircle {
                center,
                radius,
                paint,
            } => Some((*center, *radius, paint)),
            _ => None,
        })
    }

    pub fn strokes(&self) -> impl Iterator<Item = (&[Segment], f64, &Paint)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::StrokePath {
                segments,
                width,
                paint,
            } => Some((segments.as_slice(), *width, paint)),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = (Rect, &Paint)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::FillRect { rect, paint } => Some((*rect, paint)),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn read_pixels(&self, rect: Rect) -> Result<PixelBuffer, EffectError> {
        PixelBuffer::new(
            rect.width.round().max(0.0) as usize,
            rect.height.round().max(0.0) as usize,
        )
    }

    fn write_pixels(&mut self, buffer: &PixelBuffer, x: isize, y: isize) {
        self.commands.push(DrawCommand::WritePixels {
            x,
            y,
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    fn fill_rect(&mut self, rect: Rect, paint: Paint) {
        self.commands.push(DrawCommand::FillRect { rect, paint });
    }

    fn stroke_path(&mut self, segments: &[Segment], width: f64, paint: Paint) {
        self.commands.push(DrawCommand::StrokePath {
            segments: segments.to_vec(),
            width,
            paint,
        });
    }

    fn fill_circle(&mut self, center: DVec2, radius: f64, paint: Paint) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            paint,
        });
    }

    fn draw_image(
        &mut self,
        _source: &PixelBuffer,
        src_rect: Rect,
        dest_rect: Rect,
        blend: BlendMode,
        alpha: f64,
    ) -> Result<(), EffectError> {
        self.commands.push(DrawCommand::DrawImage {
            src_rect,
            dest_rect,
            blend,
            alpha,
        });
        Ok(())
    }

    fn clear(&mut self, color: Rgba) -> Result<(), EffectError> {
        self.commands.push(DrawCommand::Clear(color));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(w: usize, h: usize) -> RasterSurface {
        RasterSurface::from_buffer(PixelBuffer::filled(w, h, Rgba::WHITE).unwrap())
    }

    // -- RasterSurface --

    #[test]
    fn clear_replaces_every_pixel() {
        let mut s = RasterSurface::new(4, 4).unwrap();
        s.clear(Rgba::rgb(1, 2, 3)).unwrap();
        assert!(s.buffer().pixels().all(|(_, _, p)| p == Rgba::rgb(1, 2, 3)));
    }

    #[test]
    fn fill_rect_covers_pixel_centres_inside() {
        let mut s = raster(10, 10);
        s.fill_rect(Rect::new(2.0, 3.0, 2.0, 2.0), Paint::new(Rgba::BLACK));
        assert_eq!(s.buffer().get(2, 3), Rgba::BLACK);
        assert_eq!(s.buffer().get(3, 4), Rgba::BLACK);
        assert_eq!(s.buffer().get(4, 3), Rgba::WHITE);
        assert_eq!(s.buffer().get(2, 5), Rgba::WHITE);
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut s = raster(4, 4);
        s.fill_rect(Rect::new(-10.0, -10.0, 100.0, 100.0), Paint::new(Rgba::BLACK));
        assert!(s.buffer().pixels().all(|(_, _, p)| p == Rgba::BLACK));
    }

    #[test]
    fn fill_rect_respects_alpha() {
        let mut s = raster(1, 1);
        s.fill_rect(Rect::full(1, 1), Paint::new(Rgba::BLACK).with_alpha(0.5));
        assert_eq!(s.buffer().get(0, 0), Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn fill_circle_covers_centre_not_far_corner() {
        let mut s = raster(20, 20);
        s.fill_circle(DVec2::new(10.0, 10.0), 4.0, Paint::new(Rgba::BLACK));
        assert_eq!(s.buffer().get(10, 10), Rgba::BLACK);
        assert_eq!(s.buffer().get(0, 0), Rgba::WHITE);
        assert_eq!(s.buffer().get(16, 10), Rgba::WHITE);
    }

    #[test]
    fn tiny_circle_leaves_faint_mark() {
        let mut s = raster(5, 5);
        s.fill_circle(DVec2::new(2.5, 2.5), 0.3, Paint::new(Rgba::BLACK));
        let p = s.buffer().get(2, 2);
        assert!(p.r < 255 && p.r > 0, "{p:?}");
    }

    #[test]
    fn stroke_draws_along_segment() {
        let mut s = raster(20, 20);
        let seg = Segment::new(DVec2::new(2.0, 10.5), DVec2::new(18.0, 10.5));
        s.stroke_path(&[seg], 1.0, Paint::new(Rgba::BLACK));
        assert_eq!(s.buffer().get(10, 10), Rgba::BLACK);
        assert_eq!(s.buffer().get(10, 5), Rgba::WHITE);
    }

    #[test]
    fn overlapping_segments_blend_once() {
        let mut a = raster(10, 10);
        let mut b = raster(10, 10);
        let seg = Segment::new(DVec2::new(1.0, 5.5), DVec2::new(9.0, 5.5));
        let paint = Paint::new(Rgba::BLACK).with_alpha(0.5);
        a.stroke_path(&[seg], 1.0, paint);
        b.stroke_path(&[seg, seg], 1.0, paint);
        assert_eq!(a.buffer(), b.buffer());
    }

    #[test]
    fn stroke_outside_surface_is_noop() {
        let mut s = raster(4, 4);
        let seg = Segment::new(DVec2::new(-50.0, -50.0), DVec2::new(-40.0, -40.0));
        s.stroke_path(&[seg], 2.0, Paint::new(Rgba::BLACK));
        assert!(s.buffer().pixels().all(|(_, _, p)| p == Rgba::WHITE));
    }

    #[test]
    fn draw_image_scales_into_dest() {
        let mut s = raster(8, 8);
        let src = PixelBuffer::filled(2, 2, Rgba::BLACK).unwrap();
        s.draw_image(&src, Rect::full(2, 2), Rect::new(4.0, 4.0, 4.0, 4.0), BlendMode::Normal, 1.0)
            .unwrap();
        assert_eq!(s.buffer().get(5, 5), Rgba::BLACK);
        assert_eq!(s.buffer().get(3, 3), Rgba::WHITE);
    }

    #[test]
    fn read_and_write_pixels_round_trip() {
        let mut s = raster(6, 6);
        let patch = PixelBuffer::filled(2, 2, Rgba::rgb(9, 9, 9)).unwrap();
        s.write_pixels(&patch, 1, 1);
        let back = s.read_pixels(Rect::new(1.0, 1.0, 2.0, 2.0)).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn distance_to_degenerate_segment_is_point_distance() {
        let a = DVec2::new(1.0, 1.0);
        assert_eq!(distance_to_segment(DVec2::new(4.0, 5.0), a, a), 5.0);
    }

    // -- RecordingSurface --

    #[test]
    fn recording_surface_captures_calls_in_order() {
        let mut s = RecordingSurface::new(10, 10);
        s.clear(Rgba::WHITE).unwrap();
        s.fill_circle(DVec2::new(1.0, 2.0), 3.0, Paint::new(Rgba::BLACK));
        s.fill_all(Paint::new(Rgba::BLACK).with_alpha(0.02));
        assert_eq!(s.commands().len(), 3);
        assert_eq!(s.commands()[0], DrawCommand::Clear(Rgba::WHITE));
        assert_eq!(s.circles().count(), 1);
        assert_eq!(s.rects().next().map(|(r, _)| r), Some(Rect::full(10, 10)));
        assert_eq!(s.take_commands().len(), 3);
        assert!(s.commands().is_empty());
    }
}
