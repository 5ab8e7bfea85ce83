//! Halftone flow: a fixed halftone dot grid over an invisible flow field.
//!
//! Particles advect through fBm noise and stamp a decaying [`DensityMap`]
//! aligned to the dot grid. Where density pools, dots grow slightly and
//! bleed from a muted accent-tinted grey toward the true image color. A
//! second, coarser noise layer modulates stamping so color gathers in
//! broad zones.
//!
//! The source can be cropped to a vertical band, and dots fade radially or
//! toward the top or bottom edge for split layouts.

use artfx_core::color::{Rgba, Theme};
use artfx_core::density::{DensityMap, Stamp, DEFAULT_DECAY};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::geometry::normalized_distance;
use artfx_core::noise::{Fbm, NoiseField};
use artfx_core::params::{param_bool, param_color, param_f64, param_range, param_string, param_usize};
use artfx_core::particle::{Bounds, NoiseFlow, ParticleSystem, Spawner, SwarmConfig};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::sampler::{crop_vertical, cropped_height};
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::{check_surface, dot_grid, require_images};

pub const NAME: &str = "halftone-flow";

const DEFAULT_SPACING: f64 = 5.0;
const DEFAULT_MAX_RADIUS: f64 = 0.48;
const DEFAULT_PARTICLES: usize = 2500;
const DEFAULT_NOISE_SCALE: f64 = 0.003;
const DEFAULT_SPEED: f64 = 0.8;
const DEFAULT_COLOR_BLEED: f64 = 0.9;
const DEFAULT_FADE_AMOUNT: f64 = 0.5;
/// Cropped renders are never taller than this unless a height is given.
pub const MAX_CROPPED_HEIGHT: usize = 500;
const OCTAVE_SEED_STEP: i32 = 43;
const FLOW_DRIFT: DVec2 = DVec2::new(0.0003, 0.0002);
/// Per-frame drift of the macro modulation layer.
const MODULATION_DRIFT: DVec2 = DVec2::new(0.00008, 0.00006);
/// Modulation noise runs at this fraction of the flow frequency.
const MODULATION_SCALE: f64 = 0.4;

/// Which way dots fade out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// From the centre outward.
    Radial,
    /// Solid at the top, fading toward the bottom.
    Down,
    /// Solid at the bottom, fading toward the top.
    Up,
}

impl FadeDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "radial" => Some(Self::Radial),
            "down" => Some(Self::Down),
            "up" => Some(Self::Up),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Radial => "radial",
            Self::Down => "down",
            Self::Up => "up",
        }
    }
}

/// Opacity multiplier of a dot at `pos` on a `width` x `height` canvas.
///
/// `amount` is the fraction of the height over which a linear fade runs.
/// Linear fades also dim up to 40% toward the left and right edges.
pub fn edge_fade(direction: FadeDirection, amount: f64, pos: DVec2, width: f64, height: f64) -> f64 {
    let linear = |progress: f64| {
        let amount = amount.clamp(f64::EPSILON, 1.0);
        let start = 1.0 - amount;
        let fade = if progress < start {
            1.0
        } else {
            (1.0 - (progress - start) / amount).max(0.0)
        };
        let cx = width / 2.0;
        let dx = (pos.x - cx).abs() / cx;
        fade * (1.0 - dx * 0.4).max(0.0)
    };
    match direction {
        FadeDirection::Radial => (1.0 - normalized_distance(pos, width, height) * 0.7).max(0.0),
        FadeDirection::Down => linear(pos.y / height),
        FadeDirection::Up => linear(1.0 - pos.y / height),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dot {
    pos: DVec2,
    radius: f64,
    color: Rgba,
    brightness: f64,
    fade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalftoneFlowParams {
    pub spacing: f64,
    pub max_radius: f64,
    pub theme: Theme,
    pub particles: usize,
    pub noise_scale: f64,
    pub speed: f64,
    /// How far full density moves a dot toward its true color.
    pub color_bleed: f64,
    pub fade_edge: bool,
    /// Vertical band of the source, as fractions of its height.
    pub crop: (f64, f64),
    pub fade_direction: FadeDirection,
    pub fade_amount: f64,
}

impl Default for HalftoneFlowParams {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            max_radius: DEFAULT_SPACING * DEFAULT_MAX_RADIUS,
            theme: Theme::LIGHT,
            particles: DEFAULT_PARTICLES,
            noise_scale: DEFAULT_NOISE_SCALE,
            speed: DEFAULT_SPEED,
            color_bleed: DEFAULT_COLOR_BLEED,
            fade_edge: true,
            crop: (0.0, 1.0),
            fade_direction: FadeDirection::Radial,
            fade_amount: DEFAULT_FADE_AMOUNT,
        }
    }
}

impl HalftoneFlowParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let spacing = param_f64(params, "spacing", d.spacing).max(1.0);
        let fade_direction =
            FadeDirection::from_name(&param_string(params, "fade_direction", d.fade_direction.name()))
                .unwrap_or(d.fade_direction);
        Self {
            spacing,
            max_radius: param_f64(params, "max_radius", spacing * DEFAULT_MAX_RADIUS),
            theme: Theme {
                background: param_color(params, "background", d.theme.background),
                accent: param_color(params, "accent", d.theme.accent),
            },
            particles: param_usize(params, "particles", d.particles),
            noise_scale: param_f64(params, "noise_scale", d.noise_scale),
            speed: param_f64(params, "speed", d.speed),
            color_bleed: param_f64(params, "color_bleed", d.color_bleed),
            fade_edge: param_bool(params, "fade_edge", d.fade_edge),
            crop: param_range(params, "crop", d.crop),
            fade_direction,
            fade_amount: param_f64(params, "fade_amount", d.fade_amount),
        }
    }
}

/// Canvas height that shows the cropped band of `image` undistorted at
/// `width`, capped at [`MAX_CROPPED_HEIGHT`] for partial crops.
pub fn natural_height(width: usize, image: &PixelBuffer, crop: (f64, f64)) -> usize {
    let cropped = cropped_height(image, width, crop);
    let full = crop.0 <= 0.0 && crop.1 >= 1.0;
    if full {
        cropped
    } else {
        cropped.min(MAX_CROPPED_HEIGHT)
    }
}

pub struct HalftoneFlow {
    width: usize,
    height: usize,
    params: HalftoneFlowParams,
    dots: Vec<Dot>,
    density: DensityMap,
    swarm: ParticleSystem<NoiseFlow>,
    noise: NoiseField,
    modulation: Fbm,
    frame: u64,
    disposed: bool,
}

impl HalftoneFlow {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: HalftoneFlowParams,
        image: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let source = crop_vertical(image, params.crop, width, height)?;
        let (w, h) = (width as f64, height as f64);
        let dots: Vec<Dot> = dot_grid(params.spacing, width, height)
            .into_iter()
            .filter_map(|pos| {
                let color = source.get_clamped(pos.x, pos.y);
                let brightness = color.luminance();
                let radius = params.max_radius * (1.0 - brightness);
                if radius < 0.3 {
                    return None;
                }
                let mut fade = 1.0;
                if params.fade_edge {
                    fade = edge_fade(params.fade_direction, params.fade_amount, pos, w, h);
                    if fade < 0.01 {
                        return None;
                    }
                }
                Some(Dot {
                    pos,
                    radius,
                    color,
                    brightness,
                    fade,
                })
            })
            .collect();

        let density = DensityMap::new(width, height, params.spacing, DEFAULT_DECAY)?;
        let mut flow = NoiseFlow::new(params.noise_scale).with_drift(FLOW_DRIFT);
        flow.fbm = Fbm::new(4, 2.0, OCTAVE_SEED_STEP);
        let config = SwarmConfig {
            count: params.particles,
            bounds: Bounds::new(w, h, 0.0),
            speed: (params.speed, params.speed),
            lifetime: None,
        };
        let swarm = ParticleSystem::new(config, flow, Spawner::Uniform, Xorshift64::new(seed));
        tracing::debug!(
            width,
            height,
            dots = dots.len(),
            particles = params.particles,
            crop = ?params.crop,
            "halftone-flow created"
        );
        Ok(Self {
            width,
            height,
            params,
            dots,
            density,
            swarm,
            noise: NoiseField::new(),
            modulation: Fbm::new(3, 2.0, OCTAVE_SEED_STEP),
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
        require_images(NAME, images, 1)?;
        Self::new(width, height, seed, HalftoneFlowParams::from_json(json_params), &images[0])
    }

    /// Swaps background and accent; takes effect on the next frame.
    pub fn set_theme(&mut self, theme: Theme) {
        self.params.theme = theme;
    }

    pub fn density(&self) -> &DensityMap {
        &self.density
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }

    fn advance_particles(&mut self) {
        self.density.decay_step();
        let t = self.frame as f64;
        let scale = self.params.noise_scale * MODULATION_SCALE;
        let stamp = Stamp::default();
        let density = &mut self.density;
        let noise = &self.noise;
        let modulation = &self.modulation;
        self.swarm.step(|particle| {
            let m = noise.fbm(
                particle.pos.x * scale + t * MODULATION_DRIFT.x,
                particle.pos.y * scale + t * MODULATION_DRIFT.y,
                0,
                modulation,
            );
            density.stamp(particle.pos, &stamp, (0.1 + m * 0.9) as f32);
        });
    }

    fn dot_paint(&self, dot: &Dot) -> Option<(f64, Paint)> {
        let p = &self.params;
        let d = self.density.at_pixel(dot.pos) as f64;
        let grey = dot.color.luminance() * 255.0;
        let [ir, ig, ib] = dot.color.rgb_f64();
        let [ar, ag, ab] = p.theme.accent.rgb_f64();
        let base = |img: f64, accent: f64| grey * 0.6 + img * 0.2 + accent * 0.2;
        let bleed = d * p.color_bleed;
        let mix = |base: f64, img: f64| base * (1.0 - bleed) + img * bleed;
        let color = Rgba::from_rgb_f64([
            mix(base(ir, ar), ir),
            mix(base(ig, ag), ig),
            mix(base(ib, ab), ib),
        ]);

        let alpha = ((0.45 + (1.0 - dot.brightness) * 0.4) * dot.fade * (1.0 + d * 0.2)).min(1.0);
        let radius = (dot.radius * (1.0 + d * 0.25)).min(p.spacing * DEFAULT_MAX_RADIUS);
        if alpha < 0.01 || radius < 0.2 {
            return None;
        }
        Some((radius, Paint::new(color).with_alpha(alpha)))
    }
}

impl Effect for HalftoneFlow {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        self.advance_particles();

        surface.clear(self.params.theme.background)?;
        for dot in &self.dots {
            if let Some((radius, paint)) = self.dot_paint(dot) {
                surface.fill_circle(dot.pos, radius, paint);
            }
        }
        self.frame += 1;
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
            "background": p.theme.background,
            "accent": p.theme.accent,
            "particles": p.particles,
            "noise_scale": p.noise_scale,
            "speed": p.speed,
            "color_bleed": p.color_bleed,
            "fade_edge": p.fade_edge,
            "crop": [p.crop.0, p.crop.1],
            "fade_direction": p.fade_direction.name(),
            "fade_amount": p.fade_amount,
        })
    }

    fn param_schema(&self) -> Value {
        let d = HalftoneFlowParams::default();
        json!({
            "spacing": { "type": "number", "default": d.spacing, "min": 2.0, "max": 64.0,
                "description": "Distance between dot centres; also the density cell size" },
            "max_radius": { "type": "number", "default": d.max_radius, "min": 0.5, "max": 32.0,
                "description": "Dot radius over pure black; defaults to 48% of spacing" },
            "background": { "type": "color", "default": d.theme.background,
                "description": "Background fill" },
            "accent": { "type": "color", "default": d.theme.accent,
                "description": "Accent mixed into the resting dot color" },
            "particles": { "type": "integer", "default": d.particles, "min": 0, "max": 20000,
                "description": "Number of invisible flow particles" },
            "noise_scale": { "type": "number", "default": d.noise_scale, "min": 0.0005, "max": 0.05,
                "description": "Spatial frequency of the flow field" },
            "speed": { "type": "number", "default": d.speed, "min": 0.1, "max": 10.0,
                "description": "Particle speed in pixels per frame" },
            "color_bleed": { "type": "number", "default": d.color_bleed, "min": 0.0, "max": 1.0,
                "description": "How much full density reveals the true image color" },
            "fade_edge": { "type": "boolean", "default": d.fade_edge,
                "description": "Fade dots toward the edges" },
            "crop": { "type": "range", "default": [d.crop.0, d.crop.1], "min": 0.0, "max": 1.0,
                "description": "Vertical band of the source image, as fractions of its height" },
            "fade_direction": { "type": "string", "default": d.fade_direction.name(),
                "options": ["radial", "down", "up"],
                "description": "Radial fade, or a linear fade toward the bottom (down) or top (up)" },
            "fade_amount": { "type": "number", "default": d.fade_amount, "min": 0.0, "max": 1.0,
                "description": "Fraction of the height a linear fade spans" }
        })
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.dots.clear();
        tracing::debug!(frame = self.frame, "halftone-flow disposed");
    }
}
