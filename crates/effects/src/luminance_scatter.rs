//! Luminance scatter: stippled points placed by rejection sampling, so dark
//! regions gather dense clusters and light regions stay sparse. Points fade
//! out radially. Static.

use artfx_core::blend::BlendMode;
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::contrast;
use artfx_core::geometry::normalized_distance;
use artfx_core::params::{param_color, param_f64, param_usize};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::{check_surface, require_images, stack_images};

pub const NAME: &str = "luminance-scatter";

const DEFAULT_POINTS: usize = 30_000;
const DEFAULT_MAX_SIZE: f64 = 1.8;
const DEFAULT_FADE_RADIUS: f64 = 0.85;
/// Candidates tried per requested point before giving up.
const ATTEMPTS_PER_POINT: usize = 5;
const JITTER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceScatterParams {
    pub points: usize,
    pub max_size: f64,
    pub background: Rgba,
    /// Single color for every point; `None` keeps source colors.
    pub mono_color: Option<Rgba>,
    /// Normalised distance at which points vanish.
    pub fade_radius: f64,
}

impl Default for LuminanceScatterParams {
    fn default() -> Self {
        Self {
            points: DEFAULT_POINTS,
            max_size: DEFAULT_MAX_SIZE,
            background: Theme::LIGHT.background,
            mono_color: None,
            fade_radius: DEFAULT_FADE_RADIUS,
        }
    }
}

impl LuminanceScatterParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let mono_color = params
            .get("mono_color")
            .filter(|v| !v.is_null())
            .map(|_| param_color(params, "mono_color", Theme::LIGHT.accent));
        Self {
            points: param_usize(params, "points", d.points),
            max_size: param_f64(params, "max_size", d.max_size),
            background: param_color(params, "background", d.background),
            mono_color,
            fade_radius: param_f64(params, "fade_radius", d.fade_radius).max(f64::EPSILON),
        }
    }
}

pub struct LuminanceScatter {
    width: usize,
    height: usize,
    params: LuminanceScatterParams,
    source: PixelBuffer,
    rng: Xorshift64,
    placed: usize,
    frame: u64,
    disposed: bool,
}

impl LuminanceScatter {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: LuminanceScatterParams,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 1)?;
        let mut source = stack_images(images, width, height, BlendMode::Screen, 0.5)?;
        contrast(&mut source, 1.2);
        tracing::debug!(width, height, points = params.points, "luminance-scatter created");
        Ok(Self {
            width,
            height,
            params,
            source,
            rng: Xorshift64::new(seed),
            placed: 0,
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
        Self::new(width, height, seed, LuminanceScatterParams::from_json(json_params), images)
    }

    /// Points drawn by the last render.
    pub fn placed(&self) -> usize {
        self.placed
    }

    fn scatter(&mut self, surface: &mut dyn Surface) {
        let p = self.params;
        let (w, h) = (self.width as f64, self.height as f64);
        let max_attempts = p.points.saturating_mul(ATTEMPTS_PER_POINT);
        let rng = &mut self.rng;
        let mut placed = 0;
        let mut attempts = 0;
        while placed < p.points && attempts < max_attempts {
            attempts += 1;
            let pos = DVec2::new(rng.next_f64() * w, rng.next_f64() * h);
            let color = self.source.get_clamped(pos.x, pos.y);
            let darkness = 1.0 - color.luminance();
            if rng.next_f64() > darkness * 0.8 + 0.1 {
                continue;
            }
            let dist = normalized_distance(pos, w, h);
            let fade = (1.0 - (dist / p.fade_radius).powi(2)).max(0.0);
            if fade < 0.02 {
                continue;
            }
            let jittered = pos + DVec2::new(rng.next_signed(JITTER), rng.next_signed(JITTER));
            let size = p.max_size * (0.3 + darkness * 0.7);
            let alpha = fade * (0.15 + darkness * 0.55);
            let fill = p.mono_color.unwrap_or(color.with_alpha(255));
            surface.fill_circle(jittered, size, Paint::new(fill).with_alpha(alpha));
            placed += 1;
        }
        self.placed = placed;
        tracing::trace!(placed, attempts, "luminance-scatter sampled");
    }
}

impl Effect for LuminanceScatter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.clear(self.params.background)?;
        self.scatter(surface);
        self.frame += 1;
        Ok(StepOutcome::Finished)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "points": p.points,
            "max_size": p.max_size,
            "background": p.background,
            "mono_color": p.mono_color,
            "fade_radius": p.fade_radius,
        })
    }

    fn param_schema(&self) -> Value {
        let d = LuminanceScatterParams::default();
        json!({
            "points": {
                "type": "integer",
                "default": d.points,
                "min": 1,
                "max": 500000,
                "description": "Target number of points"
            },
            "max_size": {
                "type": "number",
                "default": d.max_size,
                "min": 0.2,
                "max": 10.0,
                "description": "Radius of a point on black"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Background fill"
            },
            "mono_color": {
                "type": "color",
                "default": null,
                "description": "Single point color; null keeps source colors"
            },
            "fade_radius": {
                "type": "number",
                "default": d.fade_radius,
                "min": 0.1,
                "max": 2.0,
                "description": "Normalised distance at which points vanish"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
