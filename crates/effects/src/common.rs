//! Small helpers shared by the renderers.

use artfx_core::blend::{BlendMode, Layer};
use artfx_core::error::EffectError;
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::composite_layers;
use artfx_core::surface::Surface;
use glam::DVec2;

/// Fails with `MissingImages` unless at least `needed` images were supplied.
pub(crate) fn require_images(
    effect: &str,
    images: &[PixelBuffer],
    needed: usize,
) -> Result<(), EffectError> {
    if images.len() < needed {
        return Err(EffectError::MissingImages {
            effect: effect.to_string(),
            needed,
            got: images.len(),
        });
    }
    Ok(())
}

/// Fails with `DimensionMismatch` if the surface is not the size the effect was built for.
pub(crate) fn check_surface(
    surface: &dyn Surface,
    width: usize,
    height: usize,
) -> Result<(), EffectError> {
    let (sw, sh) = surface.size();
    if (sw, sh) != (width, height) {
        return Err(EffectError::DimensionMismatch {
            lhs_w: width,
            lhs_h: height,
            rhs_w: sw,
            rhs_h: sh,
        });
    }
    Ok(())
}

/// Cover-fits every image: the first drawn normally at full opacity, the
/// rest with `rest_mode` at `rest_opacity`.
pub(crate) fn stack_images(
    images: &[PixelBuffer],
    width: usize,
    height: usize,
    rest_mode: BlendMode,
    rest_opacity: f64,
) -> Result<PixelBuffer, EffectError> {
    let layers: Vec<Layer<'_>> = images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            if i == 0 {
                Layer::new(img)
            } else {
                Layer::new(img)
                    .with_blend_mode(rest_mode)
                    .with_opacity(rest_opacity)
            }
        })
        .collect();
    composite_layers(&layers, width, height)
}

/// Cell centres of a regular grid: `spacing / 2, 3 * spacing / 2, ...` while
/// inside the canvas, row by row.
pub(crate) fn dot_grid(spacing: f64, width: usize, height: usize) -> Vec<DVec2> {
    let mut points = Vec::new();
    if spacing <= 0.0 || !spacing.is_finite() {
        return points;
    }
    let mut y = spacing / 2.0;
    while y < height as f64 {
        let mut x = spacing / 2.0;
        while x < width as f64 {
            points.push(DVec2::new(x, y));
            x += spacing;
        }
        y += spacing;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::color::Rgba;
    use artfx_core::surface::RecordingSurface;

    #[test]
    fn require_images_reports_counts() {
        let one = vec![PixelBuffer::new(1, 1).unwrap()];
        assert!(require_images("x", &one, 1).is_ok());
        match require_images("pixel-sort", &one, 2) {
            Err(EffectError::MissingImages { effect, needed, got }) => {
                assert_eq!(effect, "pixel-sort");
                assert_eq!((needed, got), (2, 1));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn check_surface_rejects_other_sizes() {
        let surface = RecordingSurface::new(10, 20);
        assert!(check_surface(&surface, 10, 20).is_ok());
        assert!(matches!(
            check_surface(&surface, 20, 10),
            Err(EffectError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn dot_grid_starts_at_half_spacing() {
        let pts = dot_grid(8.0, 20, 10);
        assert_eq!(pts, vec![DVec2::new(4.0, 4.0), DVec2::new(12.0, 4.0)]);
    }

    #[test]
    fn dot_grid_with_bad_spacing_is_empty() {
        assert!(dot_grid(0.0, 10, 10).is_empty());
        assert!(dot_grid(f64::NAN, 10, 10).is_empty());
    }

    #[test]
    fn stack_images_first_layer_is_opaque() {
        let red = PixelBuffer::filled(4, 4, Rgba::rgb(255, 0, 0)).unwrap();
        let out = stack_images(std::slice::from_ref(&red), 2, 2, BlendMode::Screen, 0.5).unwrap();
        assert_eq!(out.get(1, 1), Rgba::rgb(255, 0, 0));
    }
}
