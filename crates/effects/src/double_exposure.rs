//! Double exposure: two graded images blended into one frame, tinted,
//! vignetted and grained. Static.

use artfx_core::blend::{BlendMode, Layer};
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::{add_grain, grade, tint, vignette};
use artfx_core::params::{param_color, param_f64, param_string};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::sampler::{composite_onto, draw_cover};
use artfx_core::surface::Surface;
use serde_json::{json, Value};

use crate::common::{check_surface, require_images};

pub const NAME: &str = "double-exposure";

const DEFAULT_TINT_ALPHA: f64 = 0.15;
const DEFAULT_VIGNETTE: f64 = 0.6;
const DEFAULT_CONTRAST: f64 = 1.1;
const WARMTH_ALPHA: f64 = 0.08;
const GRAIN: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleExposureParams {
    /// How the second image lands on the first.
    pub blend_mode: BlendMode,
    pub tint: Rgba,
    pub tint_alpha: f64,
    /// Black at the vignette rim; 0 disables it.
    pub vignette: f64,
    pub contrast: f64,
}

impl Default for DoubleExposureParams {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::Screen,
            tint: Theme::LIGHT.accent,
            tint_alpha: DEFAULT_TINT_ALPHA,
            vignette: DEFAULT_VIGNETTE,
            contrast: DEFAULT_CONTRAST,
        }
    }
}

impl DoubleExposureParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            blend_mode: BlendMode::from_name(&param_string(params, "blend_mode", d.blend_mode.name()))
                .unwrap_or(d.blend_mode),
            tint: param_color(params, "tint", d.tint),
            tint_alpha: param_f64(params, "tint_alpha", d.tint_alpha),
            vignette: param_f64(params, "vignette", d.vignette),
            contrast: param_f64(params, "contrast", d.contrast),
        }
    }
}

pub struct DoubleExposure {
    width: usize,
    height: usize,
    params: DoubleExposureParams,
    base: PixelBuffer,
    overlay: PixelBuffer,
    seed: u64,
    frame: u64,
    disposed: bool,
}

impl DoubleExposure {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: DoubleExposureParams,
        first: &PixelBuffer,
        second: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let mut base = draw_cover(first, width, height)?;
        grade(&mut base, 0.4, params.contrast);
        let mut overlay = draw_cover(second, width, height)?;
        grade(&mut overlay, 0.6, params.contrast * 0.9);
        tracing::debug!(width, height, blend = params.blend_mode.name(), "double-exposure created");
        Ok(Self {
            width,
            height,
            params,
            base,
            overlay,
            seed,
            frame: 0,
            disposed: false,
        })
    }

    pub fn from_json(
        width: usize,
        height: usize,
        seed: u64,
        json_params: &Value,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 2)?;
        Self::new(
            width,
            height,
            seed,
            DoubleExposureParams::from_json(json_params),
            &images[0],
            &images[1],
        )
    }

    pub fn render(&self) -> PixelBuffer {
        let p = &self.params;
        let mut buf = self.base.clone();
        composite_onto(
            &mut buf,
            &self.overlay,
            &Layer::new(&self.overlay).with_blend_mode(p.blend_mode),
        );
        tint(&mut buf, p.tint, BlendMode::Multiply, p.tint_alpha);
        tint(&mut buf, p.tint, BlendMode::Overlay, WARMTH_ALPHA);
        if p.vignette > 0.0 {
            let (w, h) = (self.width as f64, self.height as f64);
            vignette(&mut buf, h * 0.3, w.max(h) * 0.7, p.vignette);
        }
        add_grain(&mut buf, &mut Xorshift64::new(self.seed), GRAIN);
        buf
    }
}

impl Effect for DoubleExposure {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.write_pixels(&self.render(), 0, 0);
        self.frame += 1;
        Ok(StepOutcome::Finished)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "blend_mode": p.blend_mode.name(),
            "tint": p.tint,
            "tint_alpha": p.tint_alpha,
            "vignette": p.vignette,
            "contrast": p.contrast,
        })
    }

    fn param_schema(&self) -> Value {
        let d = DoubleExposureParams::default();
        json!({
            "blend_mode": {
                "type": "string",
                "default": d.blend_mode.name(),
                "options": ["normal", "screen", "multiply", "lighter", "overlay"],
                "description": "Blend of the second image over the first"
            },
            "tint": { "type": "color", "default": d.tint, "description": "Tint color" },
            "tint_alpha": {
                "type": "number",
                "default": d.tint_alpha,
                "min": 0.0,
                "max": 1.0,
                "description": "Opacity of the multiply tint"
            },
            "vignette": {
                "type": "number",
                "default": d.vignette,
                "min": 0.0,
                "max": 1.0,
                "description": "Darkness at the rim; 0 disables"
            },
            "contrast": {
                "type": "number",
                "default": d.contrast,
                "min": 0.5,
                "max": 2.0,
                "description": "Contrast of the first image; the second gets 90% of it"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
