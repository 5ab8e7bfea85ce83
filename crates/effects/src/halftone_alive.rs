//! Halftone alive: a dot grid whose size, opacity and color breathe under
//! two slowly scrolling fBm layers.
//!
//! Dots are computed once from the source image, stretched to the canvas. Every frame the first
//! noise layer pulses their radius and opacity, the second shifts each dot
//! between its image color and the accent.

use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::geometry::{normalized_distance, Rect};
use artfx_core::noise::{Fbm, NoiseField};
use artfx_core::params::{param_bool, param_color, param_f64};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::resample;
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::{check_surface, dot_grid, require_images};

pub const NAME: &str = "halftone-alive";

const DEFAULT_SPACING: f64 = 5.0;
const DEFAULT_MAX_RADIUS: f64 = 0.42;
const DEFAULT_COLOR_MIX: f64 = 0.4;
const DEFAULT_NOISE_SCALE: f64 = 0.008;
const DEFAULT_NOISE_SPEED: f64 = 0.0008;
const DEFAULT_PULSE: f64 = 0.35;
const DEFAULT_COLOR_SHIFT: f64 = 0.3;
/// Octave seeds step by this much.
const OCTAVE_SEED_STEP: i32 = 43;
/// Dots further than this normalised distance from the centre are culled.
const CULL_DISTANCE: f64 = 1.2;

/// Precomputed grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub pos: DVec2,
    pub base_radius: f64,
    pub color: Rgba,
    pub brightness: f64,
    /// Radial opacity multiplier; 1 when edge fading is off.
    pub edge_fade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalftoneAliveParams {
    pub spacing: f64,
    pub max_radius: f64,
    pub background: Rgba,
    pub accent: Rgba,
    /// 0 is pure accent, 1 is pure image color.
    pub color_mix: f64,
    pub noise_scale: f64,
    pub noise_speed: f64,
    /// How strongly noise scales dot radius.
    pub pulse: f64,
    /// How strongly the second noise layer moves `color_mix`.
    pub color_shift: f64,
    pub fade_edge: bool,
}

impl Default for HalftoneAliveParams {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            max_radius: DEFAULT_SPACING * DEFAULT_MAX_RADIUS,
            background: Theme::LIGHT.background,
            accent: Theme::LIGHT.accent,
            color_mix: DEFAULT_COLOR_MIX,
            noise_scale: DEFAULT_NOISE_SCALE,
            noise_speed: DEFAULT_NOISE_SPEED,
            pulse: DEFAULT_PULSE,
            color_shift: DEFAULT_COLOR_SHIFT,
            fade_edge: true,
        }
    }
}

impl HalftoneAliveParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let spacing = param_f64(params, "spacing", d.spacing).max(1.0);
        Self {
            spacing,
            max_radius: param_f64(params, "max_radius", spacing * DEFAULT_MAX_RADIUS),
            background: param_color(params, "background", d.background),
            accent: param_color(params, "accent", d.accent),
            color_mix: param_f64(params, "color_mix", d.color_mix),
            noise_scale: param_f64(params, "noise_scale", d.noise_scale),
            noise_speed: param_f64(params, "noise_speed", d.noise_speed),
            pulse: param_f64(params, "pulse", d.pulse),
            color_shift: param_f64(params, "color_shift", d.color_shift),
            fade_edge: param_bool(params, "fade_edge", d.fade_edge),
        }
    }
}

pub struct HalftoneAlive {
    width: usize,
    height: usize,
    params: HalftoneAliveParams,
    dots: Vec<Dot>,
    noise: NoiseField,
    fbm: Fbm,
    frame: u64,
    disposed: bool,
}

impl HalftoneAlive {
    pub fn new(
        width: usize,
        height: usize,
        params: HalftoneAliveParams,
        image: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let full = Rect::full(image.width(), image.height());
        let source = resample(image, full, width, height)?;
        let (w, h) = (width as f64, height as f64);
        let dots: Vec<Dot> = dot_grid(params.spacing, width, height)
            .into_iter()
            .filter_map(|pos| {
                let color = source.get_clamped(pos.x, pos.y);
                let brightness = color.luminance();
                let base_radius = params.max_radius * (1.0 - brightness);
                if base_radius < 0.3 {
                    return None;
                }
                let mut edge_fade = 1.0;
                if params.fade_edge {
                    let dist = normalized_distance(pos, w, h);
                    if dist > CULL_DISTANCE {
                        return None;
                    }
                    edge_fade = (1.0 - dist * 0.85).max(0.0);
                }
                Some(Dot {
                    pos,
                    base_radius,
                    color,
                    brightness,
                    edge_fade,
                })
            })
            .collect();
        tracing::debug!(width, height, dots = dots.len(), "halftone-alive created");
        Ok(Self {
            width,
            height,
            params,
            dots,
            noise: NoiseField::new(),
            fbm: Fbm::new(3, 2.0, OCTAVE_SEED_STEP),
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
        Self::new(width, height, HalftoneAliveParams::from_json(json_params), &images[0])
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    /// Radius and paint of `dot` at frame `time`, or `None` when it is too faint to draw.
    fn styled(&self, dot: &Dot, time: f64) -> Option<(f64, Paint)> {
        let p = &self.params;
        let t = time * p.noise_speed;
        let s = p.noise_scale;
        let n = self
            .noise
            .fbm_shifted(dot.pos.x * s, dot.pos.y * s, (t * 0.3, t * 0.2), 0, &self.fbm);
        let t2 = t * 0.7;
        let n2 = self.noise.fbm_shifted(
            dot.pos.x * s * 1.5 + 100.0,
            dot.pos.y * s * 1.5 + 100.0,
            (t2 * 0.3, t2 * 0.2),
            0,
            &self.fbm,
        );

        let radius = (dot.base_radius * (1.0 + (n - 0.5) * 2.0 * p.pulse)).max(0.2);
        let mix = (p.color_mix + (n2 - 0.5) * p.color_shift).clamp(0.0, 1.0);
        let color = p.accent.lerp_rgb(dot.color, mix).with_alpha(255);

        let alpha = ((0.3 + (1.0 - dot.brightness) * 0.5 + (n - 0.5) * 0.15) * dot.edge_fade)
            .clamp(0.0, 1.0);
        if alpha < 0.01 || radius < 0.2 {
            return None;
        }
        Some((radius, Paint::new(color).with_alpha(alpha)))
    }
}

impl Effect for HalftoneAlive {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.clear(self.params.background)?;
        let time = self.frame as f64;
        for dot in &self.dots {
            if let Some((radius, paint)) = self.styled(dot, time) {
                surface.fill_circle(dot.pos, radius, paint);
            }
        }
        self.frame += 1;
        tracing::trace!(frame = self.frame, "halftone-alive frame");
        Ok(StepOutcome::Continue)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "spacing": p.spacing,
            "max_radius": p.max_radius,
            "background": p.background,
            "accent": p.accent,
            "color_mix": p.color_mix,
            "noise_scale": p.noise_scale,
            "noise_speed": p.noise_speed,
            "pulse": p.pulse,
            "color_shift": p.color_shift,
            "fade_edge": p.fade_edge,
        })
    }

    fn param_schema(&self) -> Value {
        let d = HalftoneAliveParams::default();
        json!({
            "spacing": { "type": "number", "default": d.spacing, "min": 2.0, "max": 64.0,
                "description": "Distance between dot centres in pixels" },
            "max_radius": { "type": "number", "default": d.max_radius, "min": 0.5, "max": 32.0,
                "description": "Base radius over pure black; defaults to 42% of spacing" },
            "background": { "type": "color", "default": d.background,
                "description": "Background fill" },
            "accent": { "type": "color", "default": d.accent,
                "description": "Accent the dots lean toward" },
            "color_mix": { "type": "number", "default": d.color_mix, "min": 0.0, "max": 1.0,
                "description": "0 = pure accent, 1 = pure image color" },
            "noise_scale": { "type": "number", "default": d.noise_scale, "min": 0.0005, "max": 0.1,
                "description": "Spatial frequency of the breathing noise" },
            "noise_speed": { "type": "number", "default": d.noise_speed, "min": 0.0, "max": 0.01,
                "description": "Noise scroll per frame" },
            "pulse": { "type": "number", "default": d.pulse, "min": 0.0, "max": 1.0,
                "description": "How much noise scales dot size" },
            "color_shift": { "type": "number", "default": d.color_shift, "min": 0.0, "max": 1.0,
                "description": "How much noise shifts the color mix" },
            "fade_edge": { "type": "boolean", "default": d.fade_edge,
                "description": "Fade and cull dots toward the edges" }
        })
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.dots.clear();
        tracing::debug!(frame = self.frame, "halftone-alive disposed");
    }
}
