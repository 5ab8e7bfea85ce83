//! Flow field: noise-advected particles leaving fading trails.
//!
//! Needs no source image. Each frame the canvas is washed with the
//! background color at a low alpha, then every particle steps along the fBm
//! heading field and strokes the segment it just travelled.

use artfx_core::color::{Rgba, Theme};
use artfx_core::contour::Segment;
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::noise::Fbm;
use artfx_core::params::{param_color, param_f64, param_usize};
use artfx_core::particle::{Bounds, NoiseFlow, ParticleSystem, Spawner, SwarmConfig};
use artfx_core::prng::Xorshift64;
use artfx_core::surface::{Paint, Surface};
use glam::DVec2;
use serde_json::{json, Value};

use crate::common::check_surface;

pub const NAME: &str = "flow-field";

const DEFAULT_PARTICLES: usize = 1500;
const DEFAULT_NOISE_SCALE: f64 = 0.003;
const DEFAULT_SPEED: f64 = 1.5;
const DEFAULT_TRAIL_ALPHA: f64 = 0.3;
const DEFAULT_FADE_ALPHA: f64 = 0.02;
const DEFAULT_LINE_WIDTH: f64 = 0.8;
/// Per-frame scroll of the noise field along y.
const TIME_DRIFT: f64 = 0.0003;
/// Particle lifetimes in frames.
const LIFETIME: (f64, f64) = (100.0, 300.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowFieldParams {
    pub particles: usize,
    pub noise_scale: f64,
    /// Top speed; each particle gets 50-100% of it.
    pub speed: f64,
    pub trail_color: Rgba,
    pub trail_alpha: f64,
    pub background: Rgba,
    /// Alpha of the per-frame background wash that fades old trails.
    pub fade_alpha: f64,
    pub line_width: f64,
}

impl Default for FlowFieldParams {
    fn default() -> Self {
        Self {
            particles: DEFAULT_PARTICLES,
            noise_scale: DEFAULT_NOISE_SCALE,
            speed: DEFAULT_SPEED,
            trail_color: Theme::LIGHT.accent,
            trail_alpha: DEFAULT_TRAIL_ALPHA,
            background: Theme::LIGHT.background,
            fade_alpha: DEFAULT_FADE_ALPHA,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl FlowFieldParams {
    /// Extracts parameters from a JSON object, falling back to defaults.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            particles: param_usize(params, "particles", d.particles),
            noise_scale: param_f64(params, "noise_scale", d.noise_scale),
            speed: param_f64(params, "speed", d.speed),
            trail_color: param_color(params, "trail_color", d.trail_color),
            trail_alpha: param_f64(params, "trail_alpha", d.trail_alpha),
            background: param_color(params, "background", d.background),
            fade_alpha: param_f64(params, "fade_alpha", d.fade_alpha),
            line_width: param_f64(params, "line_width", d.line_width),
        }
    }
}

pub struct FlowField {
    width: usize,
    height: usize,
    params: FlowFieldParams,
    swarm: ParticleSystem<NoiseFlow>,
    frame: u64,
    disposed: bool,
}

impl FlowField {
    /// Returns `EffectError::InvalidImageDimensions` if width or height is zero.
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: FlowFieldParams,
    ) -> Result<Self, EffectError> {
        if width == 0 || height == 0 {
            return Err(EffectError::InvalidImageDimensions { width, height });
        }
        let mut flow = NoiseFlow::new(params.noise_scale).with_drift(DVec2::new(0.0, TIME_DRIFT));
        flow.fbm = Fbm::new(4, 2.0, 0);
        let config = SwarmConfig {
            count: params.particles,
            bounds: Bounds::new(width as f64, height as f64, 0.0),
            speed: (params.speed * 0.5, params.speed),
            lifetime: Some(LIFETIME),
        };
        let swarm = ParticleSystem::new(config, flow, Spawner::Uniform, Xorshift64::new(seed));
        tracing::debug!(width, height, particles = params.particles, "flow-field created");
        Ok(Self {
            width,
            height,
            params,
            swarm,
            frame: 0,
            disposed: false,
        })
    }

    pub fn from_json(
        width: usize,
        height: usize,
        seed: u64,
        json_params: &Value,
    ) -> Result<Self, EffectError> {
        Self::new(width, height, seed, FlowFieldParams::from_json(json_params))
    }

    pub fn swarm(&self) -> &ParticleSystem<NoiseFlow> {
        &self.swarm
    }
}

impl Effect for FlowField {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        let p = self.params;
        if self.frame == 0 {
            surface.clear(p.background)?;
        }
        surface.fill_all(Paint::new(p.background).with_alpha(p.fade_alpha));

        let paint = Paint::new(p.trail_color).with_alpha(p.trail_alpha);
        self.swarm.step(|particle| {
            if particle.age > 1 {
                surface.stroke_path(&[Segment::new(particle.prev, particle.pos)], p.line_width, paint);
            }
        });
        self.frame += 1;
        Ok(StepOutcome::Continue)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "particles": p.particles,
            "noise_scale": p.noise_scale,
            "speed": p.speed,
            "trail_color": p.trail_color,
            "trail_alpha": p.trail_alpha,
            "background": p.background,
            "fade_alpha": p.fade_alpha,
            "line_width": p.line_width,
        })
    }

    fn param_schema(&self) -> Value {
        let d = FlowFieldParams::default();
        json!({
            "particles": {
                "type": "integer",
                "default": d.particles,
                "min": 1,
                "max": 20000,
                "description": "Number of particles"
            },
            "noise_scale": {
                "type": "number",
                "default": d.noise_scale,
                "min": 0.0005,
                "max": 0.05,
                "description": "Spatial frequency of the heading field"
            },
            "speed": {
                "type": "number",
                "default": d.speed,
                "min": 0.1,
                "max": 10.0,
                "description": "Top particle speed in pixels per frame"
            },
            "trail_color": {
                "type": "color",
                "default": d.trail_color,
                "description": "Trail stroke color"
            },
            "trail_alpha": {
                "type": "number",
                "default": d.trail_alpha,
                "min": 0.0,
                "max": 1.0,
                "description": "Trail stroke opacity"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Background and fade color"
            },
            "fade_alpha": {
                "type": "number",
                "default": d.fade_alpha,
                "min": 0.0,
                "max": 1.0,
                "description": "Opacity of the per-frame background wash"
            },
            "line_width": {
                "type": "number",
                "default": d.line_width,
                "min": 0.1,
                "max": 5.0,
                "description": "Trail stroke width"
            }
        })
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
        tracing::debug!(frame = self.frame, "flow-field disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::surface::{DrawCommand, RasterSurface, RecordingSurface};

    fn small() -> FlowFieldParams {
        FlowFieldParams {
            particles: 50,
            ..FlowFieldParams::default()
        }
    }

    #[test]
    fn new_rejects_zero_dimensions() {
        assert!(FlowField::new(0, 10, 1, small()).is_err());
        assert!(FlowField::new(10, 0, 1, small()).is_err());
    }

    #[test]
    fn first_frame_clears_then_fades() {
        let mut fx = FlowField::new(64, 32, 7, small()).unwrap();
        let mut surface = RecordingSurface::new(64, 32);
        fx.step(&mut surface).unwrap();
        let cmds = surface.commands();
        assert_eq!(cmds[0], DrawCommand::Clear(Theme::LIGHT.background));
        let (rect, paint) = surface.rects().next().unwrap();
        assert_eq!((rect.width, rect.height), (64.0, 32.0));
        assert_eq!(paint.alpha, DEFAULT_FADE_ALPHA);
    }

    #[test]
    fn trails_start_on_second_tick() {
        let mut fx = FlowField::new(64, 32, 7, small()).unwrap();
        let mut surface = RecordingSurface::new(64, 32);
        fx.step(&mut surface).unwrap();
        assert_eq!(surface.strokes().count(), 0);
        fx.step(&mut surface).unwrap();
        let strokes: Vec<_> = surface.strokes().collect();
        assert!(!strokes.is_empty());
        for (segments, width, paint) in strokes {
            assert_eq!(segments.len(), 1);
            assert_eq!(width, DEFAULT_LINE_WIDTH);
            assert_eq!(paint.color, Theme::LIGHT.accent);
            assert!(segments[0].length() <= DEFAULT_SPEED + 1e-9);
        }
    }

    #[test]
    fn same_seed_draws_same_frames() {
        let mut a = FlowField::new(40, 40, 99, small()).unwrap();
        let mut b = FlowField::new(40, 40, 99, small()).unwrap();
        let mut sa = RecordingSurface::new(40, 40);
        let mut sb = RecordingSurface::new(40, 40);
        for _ in 0..5 {
            a.step(&mut sa).unwrap();
            b.step(&mut sb).unwrap();
        }
        assert_eq!(sa.commands(), sb.commands());
    }

    #[test]
    fn particle_count_never_changes() {
        let mut fx = FlowField::new(30, 30, 3, small()).unwrap();
        let mut surface = RecordingSurface::new(30, 30);
        for _ in 0..200 {
            fx.step(&mut surface).unwrap();
            surface.take_commands();
        }
        assert_eq!(fx.swarm().particles().len(), 50);
        assert_eq!(fx.frame(), 200);
    }

    #[test]
    fn rasterised_frames_mark_the_canvas() {
        let mut fx = FlowField::new(32, 32, 5, small()).unwrap();
        let mut surface = RasterSurface::new(32, 32).unwrap();
        for _ in 0..10 {
            fx.step(&mut surface).unwrap();
        }
        let bg = Theme::LIGHT.background;
        assert!(surface.buffer().pixels().any(|(_, _, p)| p != bg));
    }

    #[test]
    fn wrong_surface_size_is_an_error() {
        let mut fx = FlowField::new(32, 32, 5, small()).unwrap();
        let mut surface = RecordingSurface::new(16, 16);
        assert!(matches!(
            fx.step(&mut surface),
            Err(EffectError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn disposed_effect_stops_drawing() {
        let mut fx = FlowField::new(32, 32, 5, small()).unwrap();
        fx.dispose();
        let mut surface = RecordingSurface::new(32, 32);
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn from_json_overrides_and_reports_params() {
        let fx = FlowField::from_json(
            20,
            20,
            1,
            &json!({ "particles": 10, "trail_color": "#000000", "speed": "fast" }),
        )
        .unwrap();
        let params = fx.params();
        assert_eq!(params["particles"], 10);
        assert_eq!(params["trail_color"], "#000000");
        assert_eq!(params["speed"], DEFAULT_SPEED);
        assert!(fx.param_schema()["noise_scale"]["default"].is_number());
        assert!(fx.is_animated());
    }
}
