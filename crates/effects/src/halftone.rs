//! Halftone: a grid of accent-colored dots whose radius grows with darkness. Static.

use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::params::{param_color, param_f64};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::draw_cover;
use artfx_core::surface::{Paint, Surface};
use serde_json::{json, Value};

use crate::common::{check_surface, dot_grid, require_images};

pub const NAME: &str = "halftone";

const DEFAULT_SPACING: f64 = 8.0;
/// Maximum radius as a fraction of the spacing.
const DEFAULT_MAX_RADIUS: f64 = 0.45;
/// Dots at or below this radius are not drawn.
const MIN_RADIUS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalftoneParams {
    pub spacing: f64,
    pub max_radius: f64,
    pub color: Rgba,
    pub background: Rgba,
}

impl Default for HalftoneParams {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            max_radius: DEFAULT_SPACING * DEFAULT_MAX_RADIUS,
            color: Theme::LIGHT.accent,
            background: Rgba::TRANSPARENT,
        }
    }
}

impl HalftoneParams {
    /// `max_radius` defaults to 45% of whatever spacing was given.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let spacing = param_f64(params, "spacing", d.spacing).max(1.0);
        Self {
            spacing,
            max_radius: param_f64(params, "max_radius", spacing * DEFAULT_MAX_RADIUS),
            color: param_color(params, "color", d.color),
            background: param_color(params, "background", d.background),
        }
    }
}

pub struct Halftone {
    width: usize,
    height: usize,
    params: HalftoneParams,
    source: PixelBuffer,
    frame: u64,
    disposed: bool,
}

impl Halftone {
    pub fn new(
        width: usize,
        height: usize,
        params: HalftoneParams,
        image: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let source = draw_cover(image, width, height)?;
        tracing::debug!(width, height, spacing = params.spacing, "halftone created");
        Ok(Self {
            width,
            height,
            params,
            source,
            frame: 0,
            disposed: false,
        })
    }

    pub fn from_json(
        width: usize,
        height: usize,
        json_params: &Value,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 1)?;
        Self::new(width, height, HalftoneParams::from_json(json_params), &images[0])
    }
}

impl Effect for Halftone {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        let p = self.params;
        surface.clear(p.background)?;
        let paint = Paint::new(p.color);
        for pos in dot_grid(p.spacing, self.width, self.height) {
            let brightness = self.source.get_clamped(pos.x, pos.y).luminance();
            let radius = p.max_radius * (1.0 - brightness);
            if radius > MIN_RADIUS {
                surface.fill_circle(pos, radius, paint);
            }
        }
        self.frame += 1;
        Ok(StepOutcome::Finished)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "spacing": p.spacing,
            "max_radius": p.max_radius,
            "color": p.color,
            "background": p.background,
        })
    }

    fn param_schema(&self) -> Value {
        let d = HalftoneParams::default();
        json!({
            "spacing": {
                "type": "number",
                "default": d.spacing,
                "min": 2.0,
                "max": 64.0,
                "description": "Distance between dot centres in pixels"
            },
            "max_radius": {
                "type": "number",
                "default": d.max_radius,
                "min": 0.5,
                "max": 32.0,
                "description": "Radius of a dot over pure black; defaults to 45% of spacing"
            },
            "color": {
                "type": "color",
                "default": d.color,
                "description": "Dot color"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Background fill"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::surface::RecordingSurface;

    #[test]
    fn black_image_draws_full_size_dots() {
        let img = PixelBuffer::filled(40, 24, Rgba::BLACK).unwrap();
        let mut fx = Halftone::new(40, 24, HalftoneParams::default(), &img).unwrap();
        let mut surface = RecordingSurface::new(40, 24);
        fx.step(&mut surface).unwrap();
        let circles: Vec<_> = surface.circles().collect();
        assert_eq!(circles.len(), 5 * 3);
        for (_, radius, paint) in circles {
            assert!((radius - 3.6).abs() < 1e-9);
            assert_eq!(paint.color, Theme::LIGHT.accent);
        }
    }

    #[test]
    fn white_image_draws_nothing() {
        let img = PixelBuffer::filled(40, 24, Rgba::WHITE).unwrap();
        let mut fx = Halftone::new(40, 24, HalftoneParams::default(), &img).unwrap();
        let mut surface = RecordingSurface::new(40, 24);
        fx.step(&mut surface).unwrap();
        assert_eq!(surface.circles().count(), 0);
    }

    #[test]
    fn needs_an_image() {
        assert!(matches!(
            Halftone::from_json(10, 10, &json!({}), &[]),
            Err(EffectError::MissingImages { needed: 1, got: 0, .. })
        ));
    }

    #[test]
    fn max_radius_follows_custom_spacing() {
        let p = HalftoneParams::from_json(&json!({ "spacing": 10 }));
        assert_eq!(p.spacing, 10.0);
        assert!((p.max_radius - 4.5).abs() < 1e-12);
        let q = HalftoneParams::from_json(&json!({ "spacing": 10, "max_radius": 2 }));
        assert_eq!(q.max_radius, 2.0);
    }
}
