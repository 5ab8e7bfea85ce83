//! Particle dissolve: the image as a field of small motes, dense in the
//! centre and thinning toward the rim, each drifting on its own slow
//! Lissajous loop.

use artfx_core::blend::BlendMode;
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::grade;
use artfx_core::geometry::normalized_distance;
use artfx_core::params::{param_bool, param_color, param_f64, param_usize};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::{check_surface, require_images, stack_images};

pub const NAME: &str = "particle-dissolve";

const DEFAULT_DENSITY: usize = 3;
const DEFAULT_MAX_SIZE: f64 = 2.5;
const DEFAULT_ACCENT_MIX: f64 = 0.25;
/// Pixels brighter than this leave no mote.
const MAX_BRIGHTNESS: f64 = 0.95;

/// One drifting point, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mote {
    pub home: DVec2,
    pub color: Rgba,
    pub alpha: f64,
    pub size: f64,
    /// Amplitude of the drift loop in pixels.
    pub drift: f64,
    pub drift_angle: f64,
}

impl Mote {
    /// Position at frame `time`.
    pub fn position(&self, time: f64) -> DVec2 {
        self.home
            + DVec2::new(
                (time * 0.01 + self.drift_angle).sin() * self.drift,
                (time * 0.013 + self.drift_angle * 1.3).cos() * self.drift,
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleDissolveParams {
    /// Sampling step in pixels.
    pub density: usize,
    pub max_size: f64,
    pub theme: Theme,
    pub accent_mix: f64,
    pub animated: bool,
}

impl Default for ParticleDissolveParams {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            max_size: DEFAULT_MAX_SIZE,
            theme: Theme::LIGHT,
            accent_mix: DEFAULT_ACCENT_MIX,
            animated: true,
        }
    }
}

impl ParticleDissolveParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            density: param_usize(params, "density", d.density).max(1),
            max_size: param_f64(params, "max_size", d.max_size),
            theme: Theme {
                background: param_color(params, "background", d.theme.background),
                accent: param_color(params, "accent", d.theme.accent),
            },
            accent_mix: param_f64(params, "accent_mix", d.accent_mix),
            animated: param_bool(params, "animated", d.animated),
        }
    }
}

pub struct ParticleDissolve {
    width: usize,
    height: usize,
    params: ParticleDissolveParams,
    motes: Vec<Mote>,
    frame: u64,
    disposed: bool,
}

impl ParticleDissolve {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: ParticleDissolveParams,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 1)?;
        let mut source = stack_images(images, width, height, BlendMode::Screen, 0.6)?;
        grade(&mut source, 0.3, 1.15);

        let mut rng = Xorshift64::new(seed);
        let (w, h) = (width as f64, height as f64);
        let step = params.density as f64;
        let mut motes = Vec::new();
        for y in (0..height).step_by(params.density) {
            for x in (0..width).step_by(params.density) {
                let color = source.get(x, y);
                let brightness = color.luminance();
                let home = DVec2::new(x as f64, y as f64);
                let dist = normalized_distance(home, w, h);
                if rng.next_f64() < dist * 0.7 && dist > 0.5 {
                    continue;
                }
                if brightness > MAX_BRIGHTNESS {
                    continue;
                }
                let fade = (1.0 - dist * 0.8).max(0.0);
                let jitter = DVec2::new(rng.next_signed(step / 2.0), rng.next_signed(step / 2.0));
                motes.push(Mote {
                    home: home + jitter,
                    color: color.with_alpha(255).lerp_rgb(params.theme.accent, params.accent_mix),
                    alpha: fade * (0.3 + brightness * 0.5),
                    size: params.max_size * (0.3 + (1.0 - brightness) * 0.7) * (0.5 + fade * 0.5),
                    drift: 0.2 + rng.next_f64() * 0.5 + dist * 1.5,
                    drift_angle: rng.next_angle(),
                });
            }
        }
        tracing::debug!(width, height, motes = motes.len(), "particle-dissolve created");
        Ok(Self {
            width,
            height,
            params,
            motes,
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
        Self::new(width, height, seed, ParticleDissolveParams::from_json(json_params), images)
    }

    pub fn motes(&self) -> &[Mote] {
        &self.motes
    }
}

impl Effect for ParticleDissolve {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || (!self.params.animated && self.frame > 0) {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        surface.clear(self.params.theme.background)?;
        let time = self.frame as f64;
        for mote in &self.motes {
            let paint = Paint::new(mote.color).with_alpha(mote.alpha);
            surface.fill_circle(mote.position(time), mote.size, paint);
        }
        self.frame += 1;
        if self.params.animated {
            Ok(StepOutcome::Continue)
        } else {
            Ok(StepOutcome::Finished)
        }
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "density": p.density,
            "max_size": p.max_size,
            "background": p.theme.background,
            "accent": p.theme.accent,
            "accent_mix": p.accent_mix,
            "animated": p.animated,
        })
    }

    fn param_schema(&self) -> Value {
        let d = ParticleDissolveParams::default();
        json!({
            "density": {
                "type": "integer",
                "default": d.density,
                "min": 1,
                "max": 32,
                "description": "Sampling step in pixels; lower means more motes"
            },
            "max_size": {
                "type": "number",
                "default": d.max_size,
                "min": 0.5,
                "max": 10.0,
                "description": "Radius of a mote on black at the centre"
            },
            "background": { "type": "color", "default": d.theme.background,
                "description": "Background fill" },
            "accent": { "type": "color", "default": d.theme.accent,
                "description": "Color mixed into every mote" },
            "accent_mix": {
                "type": "number",
                "default": d.accent_mix,
                "min": 0.0,
                "max": 1.0,
                "description": "Share of the accent in each mote"
            },
            "animated": {
                "type": "boolean",
                "default": d.animated,
                "description": "Keep drifting after the first frame"
            }
        })
    }

    fn is_animated(&self) -> bool {
        self.params.animated
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.motes.clear();
        tracing::debug!(frame = self.frame, "particle-dissolve disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::surface::RecordingSurface;

    fn grey(v: u8) -> Vec<PixelBuffer> {
        vec![PixelBuffer::filled(45, 30, Rgba::rgb(v, v, v)).unwrap()]
    }

    #[test]
    fn bright_images_dissolve_completely() {
        let fx = ParticleDissolve::new(45, 30, 1, ParticleDissolveParams::default(), &grey(255)).unwrap();
        assert!(fx.motes().is_empty());
    }

    #[test]
    fn motes_are_bounded_by_the_sampling_grid() {
        let fx = ParticleDissolve::new(45, 30, 1, ParticleDissolveParams::default(), &grey(60)).unwrap();
        let motes = fx.motes();
        assert!(!motes.is_empty());
        assert!(motes.len() <= 15 * 10);
        for m in motes {
            assert!(m.alpha >= 0.0 && m.alpha <= 0.8);
            assert!(m.size > 0.0 && m.size <= DEFAULT_MAX_SIZE);
            assert!(m.drift >= 0.2);
        }
    }

    #[test]
    fn rim_motes_are_fainter() {
        let fx = ParticleDissolve::new(90, 60, 4, ParticleDissolveParams::default(), &grey(60)).unwrap();
        let (inner, outer): (Vec<&Mote>, Vec<&Mote>) = fx
            .motes()
            .iter()
            .partition(|m| normalized_distance(m.home, 90.0, 60.0) < 0.5);
        assert!(!inner.is_empty());
        assert!(inner.iter().all(|m| m.alpha > 0.0));
        assert!(outer.iter().all(|m| m.alpha < 0.8));
    }

    #[test]
    fn animated_motes_drift_between_frames() {
        let mut fx = ParticleDissolve::new(45, 30, 2, ParticleDissolveParams::default(), &grey(60)).unwrap();
        let mut surface = RecordingSurface::new(45, 30);
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Continue);
        let first: Vec<DVec2> = surface.circles().map(|(c, _, _)| c).collect();
        surface.take_commands();
        for _ in 0..50 {
            fx.step(&mut surface).unwrap();
            surface.take_commands();
        }
        fx.step(&mut surface).unwrap();
        let later: Vec<DVec2> = surface.circles().map(|(c, _, _)| c).collect();
        assert_eq!(first.len(), later.len());
        assert_ne!(first, later);
    }

    #[test]
    fn static_mode_draws_once() {
        let mut fx =
            ParticleDissolve::from_json(45, 30, 2, &json!({ "animated": false }), &grey(60)).unwrap();
        assert!(!fx.is_animated());
        let mut surface = RecordingSurface::new(45, 30);
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        let drawn = surface.commands().len();
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        assert_eq!(surface.commands().len(), drawn);
    }

    #[test]
    fn drift_stays_within_its_amplitude() {
        let m = Mote {
            home: DVec2::new(10.0, 10.0),
            color: Rgba::BLACK,
            alpha: 1.0,
            size: 1.0,
            drift: 2.0,
            drift_angle: 0.7,
        };
        for t in [0.0, 17.0, 300.0, 12345.0] {
            let d = m.position(t) - m.home;
            assert!(d.x.abs() <= 2.0 && d.y.abs() <= 2.0);
        }
    }
}
