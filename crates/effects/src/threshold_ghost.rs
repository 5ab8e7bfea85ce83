//! Threshold ghost: each image reduced to a hard silhouette, tinted,
//! shifted sideways and stacked so the layers overlap like double-printed
//! negatives. Layers fade radially and the result gets a light grain. Static.

use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::{add_grain, grade};
use artfx_core::geometry::{radial_fade, Rect};
use artfx_core::params::{param_color, param_color_list, param_f64, param_f64_list};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::sampler::draw_cover;
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::{check_surface, require_images};

pub const NAME: &str = "threshold-ghost";

const DEFAULT_THRESHOLDS: [f64; 3] = [0.45, 0.5, 0.55];
const DEFAULT_COLORS: [Rgba; 3] = [
    Rgba::new(217, 119, 6, 64),
    Rgba::new(168, 162, 158, 51),
    Rgba::new(120, 113, 108, 38),
];
const DEFAULT_FADE_STRENGTH: f64 = 0.9;
/// Silhouette cell size in pixels.
const CELL: usize = 2;
/// Horizontal spread between consecutive layers, as a fraction of the width.
const LAYER_OFFSET: f64 = 0.15;
/// Grain of `±4` levels.
const GRAIN: f64 = 8.0 / 255.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdGhostParams {
    /// Cycled per image.
    pub thresholds: Vec<f64>,
    /// Cycled per image; the alpha channel is the layer opacity.
    pub colors: Vec<Rgba>,
    pub background: Rgba,
    pub fade_strength: f64,
}

impl Default for ThresholdGhostParams {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            colors: DEFAULT_COLORS.to_vec(),
            background: Theme::LIGHT.background,
            fade_strength: DEFAULT_FADE_STRENGTH,
        }
    }
}

impl ThresholdGhostParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            thresholds: param_f64_list(params, "thresholds", &d.thresholds),
            colors: param_color_list(params, "colors", &d.colors),
            background: param_color(params, "background", d.background),
            fade_strength: param_f64(params, "fade_strength", d.fade_strength),
        }
    }

    fn threshold(&self, layer: usize) -> f64 {
        self.thresholds[layer % self.thresholds.len()]
    }

    fn color(&self, layer: usize) -> Rgba {
        self.colors[layer % self.colors.len()]
    }
}

/// One silhouette: graded grey levels plus its horizontal shift.
struct Ghost {
    levels: PixelBuffer,
    offset_x: f64,
}

pub struct ThresholdGhost {
    width: usize,
    height: usize,
    params: ThresholdGhostParams,
    ghosts: Vec<Ghost>,
    seed: u64,
    frame: u64,
    disposed: bool,
}

impl ThresholdGhost {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        mut params: ThresholdGhostParams,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 1)?;
        if params.thresholds.is_empty() {
            params.thresholds = DEFAULT_THRESHOLDS.to_vec();
        }
        if params.colors.is_empty() {
            params.colors = DEFAULT_COLORS.to_vec();
        }
        let centre = (images.len() as f64 - 1.0) / 2.0;
        let ghosts = images
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let mut levels = draw_cover(img, width, height)?;
                grade(&mut levels, 1.0, 1.4);
                Ok(Ghost {
                    levels,
                    offset_x: (i as f64 - centre) * width as f64 * LAYER_OFFSET,
                })
            })
            .collect::<Result<Vec<_>, EffectError>>()?;
        tracing::debug!(width, height, layers = ghosts.len(), "threshold-ghost created");
        Ok(Self {
            width,
            height,
            params,
            ghosts,
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
        Self::new(width, height, seed, ThresholdGhostParams::from_json(json_params), images)
    }

    fn draw_ghost(&self, surface: &mut dyn Surface, layer: usize) {
        let ghost = &self.ghosts[layer];
        let threshold = self.params.threshold(layer);
        let color = self.params.color(layer);
        let (w, h) = (self.width as f64, self.height as f64);
        let cell = CELL as f64;
        for y in (0..self.height).step_by(CELL) {
            for x in (0..self.width).step_by(CELL) {
                if ghost.levels.get(x, y).r as f64 / 255.0 >= threshold {
                    continue;
                }
                let px = x as f64 + ghost.offset_x;
                let fade = radial_fade(DVec2::new(px, y as f64), w, h, self.params.fade_strength);
                if fade > 0.02 {
                    let paint = Paint::new(color.with_alpha(255)).with_alpha(color.alpha_f64() * fade);
                    surface.fill_rect(Rect::new(px, y as f64, cell, cell), paint);
                }
            }
        }
    }
}

impl Effect for ThresholdGhost {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.clear(self.params.background)?;
        for layer in 0..self.ghosts.len() {
            self.draw_ghost(surface, layer);
        }

        let full = Rect::full(self.width, self.height);
        let mut grained = surface.read_pixels(full)?;
        add_grain(&mut grained, &mut Xorshift64::new(self.seed), GRAIN);
        surface.write_pixels(&grained, 0, 0);
        self.frame += 1;
        Ok(StepOutcome::Finished)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "thresholds": p.thresholds,
            "colors": p.colors,
            "background": p.background,
            "fade_strength": p.fade_strength,
        })
    }

    fn param_schema(&self) -> Value {
        let d = ThresholdGhostParams::default();
        json!({
            "thresholds": {
                "type": "array",
                "default": d.thresholds,
                "min": 0.0,
                "max": 1.0,
                "description": "Grey level below which a pixel joins the silhouette, cycled per image"
            },
            "colors": {
                "type": "array",
                "default": d.colors,
                "description": "Layer colors with alpha, cycled per image"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Background fill"
            },
            "fade_strength": {
                "type": "number",
                "default": d.fade_strength,
                "min": 0.0,
                "max": 3.0,
                "description": "How quickly silhouettes fade toward the rim"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.ghosts.clear();
    }
}
