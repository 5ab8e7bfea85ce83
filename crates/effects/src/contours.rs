//! Topographic contours: marching-squares isolines over an fBm elevation grid.
//!
//! Static. Every fifth level is drawn at double width and higher opacity.
//! When a source image is supplied its luminance replaces the noise as the
//! elevation.

use artfx_core::analysis::luminance_grid;
use artfx_core::color::Rgba;
use artfx_core::contour::{evenly_spaced_levels, trace_levels};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::grid::ScalarGrid;
use artfx_core::noise::{Fbm, NoiseField};
use artfx_core::params::{param_color, param_f64, param_usize};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::draw_cover;
use artfx_core::surface::{Paint, Surface};
use serde_json::{json, Value};

use crate::common::check_surface;

pub const NAME: &str = "contours";

const DEFAULT_LEVELS: usize = 20;
const DEFAULT_SCALE: f64 = 0.006;
const DEFAULT_LINE_WIDTH: f64 = 0.7;
const DEFAULT_GRID_STEP: usize = 2;
const DEFAULT_EMPHASIS_EVERY: usize = 5;
const LINE_COLOR: Rgba = Rgba::rgb(0xa8, 0xa2, 0x9e);
/// Lattice stride and seed of the elevation noise.
const NOISE_STRIDE: i32 = 131;
const NOISE_SEED: i32 = 42;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContoursParams {
    pub levels: usize,
    pub scale: f64,
    pub line_width: f64,
    pub line_color: Rgba,
    /// Fully transparent leaves the canvas cleared.
    pub background: Rgba,
    pub grid_step: usize,
    pub emphasis_every: usize,
}

impl Default for ContoursParams {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            scale: DEFAULT_SCALE,
            line_width: DEFAULT_LINE_WIDTH,
            line_color: LINE_COLOR,
            background: Rgba::TRANSPARENT,
            grid_step: DEFAULT_GRID_STEP,
            emphasis_every: DEFAULT_EMPHASIS_EVERY,
        }
    }
}

impl ContoursParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            levels: param_usize(params, "levels", d.levels),
            scale: param_f64(params, "scale", d.scale),
            line_width: param_f64(params, "line_width", d.line_width),
            line_color: param_color(params, "line_color", d.line_color),
            background: param_color(params, "background", d.background),
            grid_step: param_usize(params, "grid_step", d.grid_step).max(1),
            emphasis_every: param_usize(params, "emphasis_every", d.emphasis_every).max(1),
        }
    }

    /// Stroke width and alpha for level `index`.
    pub fn level_style(&self, index: usize) -> (f64, f64) {
        if index % self.emphasis_every == 0 {
            (self.line_width * 2.0, 0.8)
        } else {
            (self.line_width, 0.4)
        }
    }
}

pub struct Contours {
    width: usize,
    height: usize,
    params: ContoursParams,
    elevation: ScalarGrid,
    frame: u64,
    disposed: bool,
}

impl Contours {
    /// Builds the elevation grid from noise, or from `image` luminance when given.
    pub fn new(
        width: usize,
        height: usize,
        params: ContoursParams,
        image: Option<&PixelBuffer>,
    ) -> Result<Self, EffectError> {
        if width == 0 || height == 0 {
            return Err(EffectError::InvalidImageDimensions { width, height });
        }
        let elevation = match image {
            Some(img) => luminance_grid(&draw_cover(img, width, height)?, params.grid_step),
            None => {
                let noise = NoiseField::with_stride(NOISE_STRIDE);
                let fbm = Fbm::new(5, 2.1, 0);
                let s = params.scale;
                ScalarGrid::sample(width, height, params.grid_step, |x, y| {
                    noise.fbm(x * s, y * s, NOISE_SEED, &fbm)
                })
            }
        };
        tracing::debug!(
            width,
            height,
            levels = params.levels,
            from_image = image.is_some(),
            "contours created"
        );
        Ok(Self {
            width,
            height,
            params,
            elevation,
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
        Self::new(
            width,
            height,
            ContoursParams::from_json(json_params),
            images.first(),
        )
    }

    pub fn elevation(&self) -> &ScalarGrid {
        &self.elevation
    }
}

impl Effect for Contours {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.clear(self.params.background)?;

        let thresholds = evenly_spaced_levels(self.params.levels);
        for level in trace_levels(&self.elevation, &thresholds) {
            if level.segments.is_empty() {
                continue;
            }
            let (width, alpha) = self.params.level_style(level.index);
            let paint = Paint::new(self.params.line_color).with_alpha(alpha);
            surface.stroke_path(&level.segments, width, paint);
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
            "levels": p.levels,
            "scale": p.scale,
            "line_width": p.line_width,
            "line_color": p.line_color,
            "background": p.background,
            "grid_step": p.grid_step,
            "emphasis_every": p.emphasis_every,
        })
    }

    fn param_schema(&self) -> Value {
        let d = ContoursParams::default();
        json!({
            "levels": {
                "type": "integer",
                "default": d.levels,
                "min": 1,
                "max": 100,
                "description": "Number of iso-levels, evenly spaced in [0, 1)"
            },
            "scale": {
                "type": "number",
                "default": d.scale,
                "min": 0.0005,
                "max": 0.1,
                "description": "Spatial frequency of the elevation noise"
            },
            "line_width": {
                "type": "number",
                "default": d.line_width,
                "min": 0.1,
                "max": 5.0,
                "description": "Base stroke width"
            },
            "line_color": {
                "type": "color",
                "default": d.line_color,
                "description": "Contour stroke color"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Background fill; transparent leaves the canvas cleared"
            },
            "grid_step": {
                "type": "integer",
                "default": d.grid_step,
                "min": 1,
                "max": 16,
                "description": "Pixels between elevation samples"
            },
            "emphasis_every": {
                "type": "integer",
                "default": d.emphasis_every,
                "min": 1,
                "max": 50,
                "description": "Every Nth level is drawn thicker and stronger"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
