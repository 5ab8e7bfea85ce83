//! Cover-fit sampling and multi-image compositing.
//!
//! Every renderer that takes source images starts here: each image is
//! scaled to fill the working size without letterboxing (the excess is
//! cropped symmetrically), optionally stacked with other images under a
//! blend mode, and handed on as a [`PixelBuffer`].

use crate::blend::{composite_pixel, Layer};
use crate::color::{channel_u8, Rgba};
use crate::error::EffectError;
use crate::geometry::Rect;
use crate::pixel::PixelBuffer;

/// Source sub-rectangle that, scaled to `dest_w` x `dest_h`, fills it while
/// preserving aspect ratio. The crop is centred on the excess axis.
pub fn cover_crop(
    src_w: usize,
    src_h: usize,
    dest_w: usize,
    dest_h: usize,
) -> Result<Rect, EffectError> {
    if src_w == 0 || src_h == 0 {
        return Err(EffectError::InvalidImageDimensions {
            width: src_w,
            height: src_h,
        });
    }
    if dest_w == 0 || dest_h == 0 {
        return Err(EffectError::InvalidImageDimensions {
            width: dest_w,
            height: dest_h,
        });
    }
    let (sw, sh) = (src_w as f64, src_h as f64);
    let src_aspect = sw / sh;
    let dest_aspect = dest_w as f64 / dest_h as f64;
    if src_aspect > dest_aspect {
        let crop_w = sh * dest_aspect;
        Ok(Rect::new((sw - crop_w) / 2.0, 0.0, crop_w, sh))
    } else {
        let crop_h = sw / dest_aspect;
        Ok(Rect::new(0.0, (sh - crop_h) / 2.0, sw, crop_h))
    }
}

/// [`cover_crop`] for a buffer.
pub fn cover_blit(source: &PixelBuffer, dest_w: usize, dest_h: usize) -> Result<Rect, EffectError> {
    cover_crop(source.width(), source.height(), dest_w, dest_h)
}

/// Bilinear sample at continuous source coordinate `(x, y)`, pixel centres at
/// half-integers, edges clamped.
pub fn sample_bilinear(src: &PixelBuffer, x: f64, y: f64) -> Rgba {
    let max_x = (src.width() - 1) as f64;
    let max_y = (src.height() - 1) as f64;
    let fx = (x - 0.5).clamp(0.0, max_x);
    let fy = (y - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor() as usize;
    let y0 = fy.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let (p00, p10, p01, p11) = (src.get(x0, y0), src.get(x1, y0), src.get(x0, y1), src.get(x1, y1));
    let mix = |a: u8, b: u8, c: u8, d: u8| {
        let top = a as f64 * (1.0 - tx) + b as f64 * tx;
        let bottom = c as f64 * (1.0 - tx) + d as f64 * tx;
        channel_u8(top * (1.0 - ty) + bottom * ty)
    };
    Rgba::new(
        mix(p00.r, p10.r, p01.r, p11.r),
        mix(p00.g, p10.g, p01.g, p11.g),
        mix(p00.b, p10.b, p01.b, p11.b),
        mix(p00.a, p10.a, p01.a, p11.a),
    )
}

/// Scales the `rect` region of `src` to a new `width` x `height` buffer.
pub fn resample(
    src: &PixelBuffer,
    rect: Rect,
    width: usize,
    height: usize,
) -> Result<PixelBuffer, EffectError> {
    let mut out = PixelBuffer::new(width, height)?;
    let sx = rect.width / width as f64;
    let sy = rect.height / height as f64;
    out.map_in_place(|x, y, _| {
        sample_bilinear(
            src,
            rect.x + (x as f64 + 0.5) * sx,
            rect.y + (y as f64 + 0.5) * sy,
        )
    });
    Ok(out)
}

/// Cover-fits `source` into a fresh `width` x `height` buffer.
pub fn draw_cover(source: &PixelBuffer, width: usize, height: usize) -> Result<PixelBuffer, EffectError> {
    let rect = cover_blit(source, width, height)?;
    resample(source, rect, width, height)
}

/// Cover-fits each layer's image and composites them in order onto a
/// transparent `width` x `height` accumulator. Later layers go on top.
pub fn composite_layers(
    layers: &[Layer<'_>],
    width: usize,
    height: usize,
) -> Result<PixelBuffer, EffectError> {
    let mut acc = PixelBuffer::new(width, height)?;
    for layer in layers {
        let fitted = draw_cover(layer.image(), width, height)?;
        composite_onto(&mut acc, &fitted, layer);
    }
    Ok(acc)
}

/// Composites a same-sized `src` onto `dst` with the layer's mode and opacity.
pub fn composite_onto(dst: &mut PixelBuffer, src: &PixelBuffer, layer: &Layer<'_>) {
    let (mode, opacity) = (layer.blend_mode(), layer.opacity());
    dst.map_in_place(|x, y, d| match src.try_get(x as isize, y as isize) {
        Some(s) => composite_pixel(d, s, mode, opacity),
        None => d,
    });
}

/// Height of the `band` (start and end fractions) once `source` is scaled
/// to `width`: `floor(full * end) - floor(full * start)` where
/// `full = floor(width * h / w)`.
pub fn cropped_height(source: &PixelBuffer, width: usize, band: (f64, f64)) -> usize {
    let full = (width as f64 * source.height() as f64 / source.width() as f64).floor();
    let start = (full * band.0.clamp(0.0, 1.0)).floor();
    let end = (full * band.1.clamp(0.0, 1.0)).floor();
    (end - start).max(0.0) as usize
}

/// Extracts the vertical `band` of `source` (fractions of its height) and
/// scales it to `width` x `target_height`.
///
/// Returns `EffectError::InvalidImageDimensions` if the band is empty.
pub fn crop_vertical(
    source: &PixelBuffer,
    band: (f64, f64),
    width: usize,
    target_height: usize,
) -> Result<PixelBuffer, EffectError> {
    let start = band.0.clamp(0.0, 1.0);
    let end = band.1.clamp(0.0, 1.0);
    let h = source.height() as f64;
    let rect = Rect::new(0.0, h * start, source.width() as f64, h * (end - start));
    if rect.height <= 0.0 {
        return Err(EffectError::InvalidImageDimensions {
            width: source.width(),
            height: 0,
        });
    }
    resample(source, rect, width, target_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendMode;

    #[test]
    fn wide_source_into_square_crops_centre() {
        let r = cover_crop(200, 100, 100, 100).unwrap();
        assert_eq!(r, Rect::new(50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn tall_source_into_wide_crops_vertically() {
        let r = cover_crop(100, 400, 200, 100).unwrap();
        assert_eq!(r, Rect::new(0.0, 175.0, 100.0, 50.0));
    }

    #[test]
    fn matching_aspect_uses_whole_source() {
        let r = cover_crop(640, 480, 320, 240).unwrap();
        assert!(r.x.abs() < 1e-9 && r.y.abs() < 1e-9, "{r:?}");
        assert!((r.width - 640.0).abs() < 1e-9 && (r.height - 480.0).abs() < 1e-9);
    }

    #[test]
    fn zero_sized_source_fails_fast() {
        assert!(matches!(
            cover_crop(0, 100, 10, 10),
            Err(EffectError::InvalidImageDimensions { width: 0, height: 100 })
        ));
        assert!(cover_crop(10, 10, 10, 0).is_err());
    }

    #[test]
    fn draw_cover_fills_destination_exactly() {
        let src = PixelBuffer::filled(30, 10, Rgba::rgb(1, 2, 3)).unwrap();
        let out = draw_cover(&src, 7, 13).unwrap();
        assert_eq!((out.width(), out.height()), (7, 13));
        assert!(out.pixels().all(|(_, _, p)| p == Rgba::rgb(1, 2, 3)));
    }

    #[test]
    fn draw_cover_keeps_centre_of_wide_image() {
        // Left third red, middle third green, right third blue.
        let mut src = PixelBuffer::new(30, 10).unwrap();
        src.map_in_place(|x, _, _| match x / 10 {
            0 => Rgba::rgb(255, 0, 0),
            1 => Rgba::rgb(0, 255, 0),
            _ => Rgba::rgb(0, 0, 255),
        });
        let out = draw_cover(&src, 10, 10).unwrap();
        assert_eq!(out.get(5, 5), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn resample_identity_is_lossless() {
        let mut src = PixelBuffer::new(4, 3).unwrap();
        src.map_in_place(|x, y, _| Rgba::rgb(x as u8 * 40, y as u8 * 60, 7));
        let out = resample(&src, Rect::full(4, 3), 4, 3).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn composite_layers_order_matters() {
        let red = PixelBuffer::filled(2, 2, Rgba::rgb(255, 0, 0)).unwrap();
        let blue = PixelBuffer::filled(2, 2, Rgba::rgb(0, 0, 255)).unwrap();
        let a = composite_layers(&[Layer::new(&red), Layer::new(&blue)], 2, 2).unwrap();
        let b = composite_layers(&[Layer::new(&blue), Layer::new(&red)], 2, 2).unwrap();
        assert_eq!(a.get(0, 0), Rgba::rgb(0, 0, 255));
        assert_eq!(b.get(0, 0), Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn composite_layers_applies_blend_and_opacity() {
        let grey = PixelBuffer::filled(2, 2, Rgba::rgb(100, 100, 100)).unwrap();
        let white = PixelBuffer::filled(2, 2, Rgba::WHITE).unwrap();
        let out = composite_layers(
            &[
                Layer::new(&grey),
                Layer::new(&white).with_blend_mode(BlendMode::Multiply),
            ],
            2,
            2,
        )
        .unwrap();
        assert_eq!(out.get(1, 1), Rgba::rgb(100, 100, 100));

        let faded = composite_layers(&[Layer::new(&white).with_opacity(0.5)], 1, 1).unwrap();
        assert_eq!(faded.get(0, 0).a, 128);
    }

    #[test]
    fn composite_layers_rejects_zero_sized_destination() {
        let empty = PixelBuffer::new(1, 1).unwrap();
        assert!(composite_layers(&[Layer::new(&empty)], 0, 4).is_err());
    }

    #[test]
    fn crop_vertical_takes_band() {
        // Top half black, bottom half white.
        let mut src = PixelBuffer::new(10, 20).unwrap();
        src.map_in_place(|_, y, _| if y < 10 { Rgba::BLACK } else { Rgba::WHITE });
        let top = crop_vertical(&src, (0.0, 0.45), 10, 6).unwrap();
        assert_eq!((top.width(), top.height()), (10, 6));
        assert!(top.pixels().all(|(_, _, p)| p == Rgba::BLACK));
        let bottom = crop_vertical(&src, (0.55, 1.0), 10, 6).unwrap();
        assert!(bottom.pixels().all(|(_, _, p)| p == Rgba::WHITE));
    }

    #[test]
    fn crop_vertical_empty_band_fails() {
        let src = PixelBuffer::new(10, 20).unwrap();
        assert!(crop_vertical(&src, (0.5, 0.5), 10, 6).is_err());
    }

    #[test]
    fn cropped_height_follows_scaled_source() {
        let src = PixelBuffer::new(100, 200).unwrap();
        assert_eq!(cropped_height(&src, 50, (0.0, 1.0)), 100);
        assert_eq!(cropped_height(&src, 50, (0.0, 0.45)), 45);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn cover_crop_inside_source_and_matches_dest_aspect(
                sw in 1_usize..4000,
                sh in 1_usize..4000,
                dw in 1_usize..4000,
                dh in 1_usize..4000,
            ) {
                let r = cover_crop(sw, sh, dw, dh).unwrap();
                let bounds = Rect::full(sw, sh);
                prop_assert!(bounds.contains_rect(&r, 1e-6), "{:?} not in {:?}", r, bounds);
                prop_assert!(r.width > 0.0 && r.height > 0.0);
                let dest_aspect = dw as f64 / dh as f64;
                prop_assert!(((r.width / r.height) - dest_aspect).abs() < 1e-6 * dest_aspect.max(1.0));
                // One axis always uses the full source extent: no letterboxing.
                prop_assert!(
                    (r.width - sw as f64).abs() < 1e-9 || (r.height - sh as f64).abs() < 1e-9
                );
            }

            #[test]
            fn draw_cover_output_has_dest_size(
                sw in 1_usize..40,
                sh in 1_usize..40,
                dw in 1_usize..40,
                dh in 1_usize..40,
            ) {
                let src = PixelBuffer::filled(sw, sh, Rgba::WHITE).unwrap();
                let out = draw_cover(&src, dw, dh).unwrap();
                prop_assert_eq!((out.width(), out.height()), (dw, dh));
                prop_assert!(out.pixels().all(|(_, _, p)| p == Rgba::WHITE));
            }
        }
    }
}
