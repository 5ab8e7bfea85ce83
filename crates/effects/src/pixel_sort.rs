//! Pixel sort: two images merged under a left-to-right ramp, graded, then
//! brightness-band sorted into glitch streaks. Static.

use artfx_core::blend::{BlendMode, Layer};
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::{grade, horizontal_ramp_mask, tint, vignette};
use artfx_core::params::{param_color, param_f64, param_range, param_string};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::{composite_onto, draw_cover};
use artfx_core::sort::{PixelSorter, SortDirection, DEFAULT_BAND, DEFAULT_INTENSITY};
use artfx_core::surface::Surface;
use serde_json::{json, Value};

use crate::common::{check_surface, require_images};

pub const NAME: &str = "pixel-sort";

/// Opacity stops of the mask applied to the second image.
const RAMP: [(f64, f64); 4] = [(0.0, 0.0), (0.3, 0.5), (0.7, 0.9), (1.0, 1.0)];
const GRAYSCALE: f64 = 0.5;
const CONTRAST: f64 = 1.2;
const TINT_ALPHA: f64 = 0.12;
const VIGNETTE_ALPHA: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSortParams {
    pub direction: SortDirection,
    /// Luminance band `[low, high]` of sortable pixels.
    pub threshold: (f64, f64),
    pub intensity: f64,
    pub tint: Rgba,
}

impl Default for PixelSortParams {
    fn default() -> Self {
        Self {
            direction: SortDirection::Vertical,
            threshold: DEFAULT_BAND,
            intensity: DEFAULT_INTENSITY,
            tint: Theme::LIGHT.accent,
        }
    }
}

impl PixelSortParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let direction = SortDirection::from_name(&param_string(params, "direction", d.direction.name()))
            .unwrap_or(d.direction);
        Self {
            direction,
            threshold: param_range(params, "threshold", d.threshold),
            intensity: param_f64(params, "intensity", d.intensity).clamp(0.0, 1.0),
            tint: param_color(params, "tint", d.tint),
        }
    }
}

pub struct PixelSort {
    width: usize,
    height: usize,
    params: PixelSortParams,
    base: PixelBuffer,
    overlay: PixelBuffer,
    frame: u64,
    disposed: bool,
}

impl PixelSort {
    pub fn new(
        width: usize,
        height: usize,
        params: PixelSortParams,
        first: &PixelBuffer,
        second: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let base = draw_cover(first, width, height)?;
        let overlay = draw_cover(second, width, height)?;
        tracing::debug!(width, height, direction = params.direction.name(), "pixel-sort created");
        Ok(Self {
            width,
            height,
            params,
            base,
            overlay,
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
        require_images(NAME, images, 2)?;
        Self::new(
            width,
            height,
            PixelSortParams::from_json(json_params),
            &images[0],
            &images[1],
        )
    }

    /// The finished image: blend, grade, sort, tint, vignette.
    pub fn render(&self) -> PixelBuffer {
        let p = &self.params;
        let mut buf = self.base.clone();
        let mut masked = self.overlay.clone();
        horizontal_ramp_mask(&mut masked, &RAMP);
        composite_onto(&mut buf, &masked, &Layer::new(&masked));
        grade(&mut buf, GRAYSCALE, CONTRAST);

        PixelSorter::new(p.threshold.0, p.threshold.1, p.intensity).sort_buffer(&mut buf, p.direction);

        tint(&mut buf, p.tint, BlendMode::Overlay, TINT_ALPHA);
        let (w, h) = (self.width as f64, self.height as f64);
        vignette(&mut buf, h * 0.35, w.max(h) * 0.65, VIGNETTE_ALPHA);
        buf
    }
}

impl Effect for PixelSort {
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
            "direction": p.direction.name(),
            "threshold": [p.threshold.0, p.threshold.1],
            "intensity": p.intensity,
            "tint": p.tint,
        })
    }

    fn param_schema(&self) -> Value {
        let d = PixelSortParams::default();
        json!({
            "direction": {
                "type": "string",
                "default": d.direction.name(),
                "options": ["vertical", "horizontal"],
                "description": "Sort columns (vertical) or rows (horizontal)"
            },
            "threshold": {
                "type": "range",
                "default": [d.threshold.0, d.threshold.1],
                "min": 0.0,
                "max": 1.0,
                "description": "Luminance band whose runs are sorted"
            },
            "intensity": {
                "type": "number",
                "default": d.intensity,
                "min": 0.0,
                "max": 1.0,
                "description": "Mix between original and sorted order"
            },
            "tint": {
                "type": "color",
                "default": d.tint,
                "description": "Overlay tint color"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
