//! Edge trace: pathfinders crawl along the Sobel edges of a blended image,
//! leaving trails in a mix of the source and accent colors.
//!
//! Images are stacked at equal weight (screen after the first). Particles
//! are seeded on strong edges, steer toward the strongest nearby edge and
//! fade in with age, out toward death and toward the canvas rim. The
//! drawing accumulates; the effect stops after `max_frames` steps.

use artfx_core::analysis::EdgeMap;
use artfx_core::blend::{BlendMode, Layer};
use artfx_core::color::{Rgba, Theme};
use artfx_core::contour::Segment;
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::geometry::radial_fade;
use artfx_core::params::{param_bool, param_color, param_f64, param_usize};
use artfx_core::particle::{Bounds, EdgeSeeking, ParticleSystem, Spawner, SwarmConfig};
use artfx_core::pixel::PixelBuffer;
use artfx_core::prng::Xorshift64;
use artfx_core::sampler::composite_layers;
use artfx_core::surface::{Paint, Surface};
use serde_json::{json, Value};

use crate::common::{check_surface, require_images};

pub const NAME: &str = "edge-trace";

const DEFAULT_PARTICLES: usize = 300;
const DEFAULT_SPEED: f64 = 1.5;
const DEFAULT_LINE_WIDTH: f64 = 0.6;
const DEFAULT_MAX_FRAMES: u64 = 400;
/// Edge magnitude a pixel needs to seed a pathfinder.
const SEED_THRESHOLD: f64 = 100.0;
const SEED_MARGIN: usize = 10;
const SEED_STRIDE: usize = 3;
const BOUNDS_MARGIN: f64 = 10.0;
const LIFETIME: (f64, f64) = (150.0, 450.0);
/// Share of the accent in each trail color.
const ACCENT_MIX: f64 = 0.4;
/// Ticks over which a fresh pathfinder fades in.
const FADE_IN: f64 = 20.0;
const MAX_ALPHA: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTraceParams {
    pub particles: usize,
    /// Mean speed; each pathfinder gets 50-150% of it.
    pub speed: f64,
    /// Stroke width on a flat area; strong edges add up to 1.5px.
    pub line_width: f64,
    pub theme: Theme,
    pub fade_edge: bool,
    pub max_frames: u64,
}

impl Default for EdgeTraceParams {
    fn default() -> Self {
        Self {
            particles: DEFAULT_PARTICLES,
            speed: DEFAULT_SPEED,
            line_width: DEFAULT_LINE_WIDTH,
            theme: Theme::LIGHT,
            fade_edge: true,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl EdgeTraceParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            particles: param_usize(params, "particles", d.particles),
            speed: param_f64(params, "speed", d.speed),
            line_width: param_f64(params, "line_width", d.line_width),
            theme: Theme {
                background: param_color(params, "background", d.theme.background),
                accent: param_color(params, "accent", d.theme.accent),
            },
            fade_edge: param_bool(params, "fade_edge", d.fade_edge),
            max_frames: param_usize(params, "max_frames", d.max_frames as usize) as u64,
        }
    }
}

pub struct EdgeTrace {
    width: usize,
    height: usize,
    params: EdgeTraceParams,
    composite: PixelBuffer,
    edges: EdgeMap,
    swarm: ParticleSystem<EdgeSeeking>,
    frame: u64,
    disposed: bool,
}

impl EdgeTrace {
    pub fn new(
        width: usize,
        height: usize,
        seed: u64,
        params: EdgeTraceParams,
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        require_images(NAME, images, 1)?;
        let weight = 1.0 / images.len() as f64;
        let layers: Vec<Layer<'_>> = images
            .iter()
            .enumerate()
            .map(|(i, img)| {
                let mode = if i == 0 {
                    BlendMode::Normal
                } else {
                    BlendMode::Screen
                };
                Layer::new(img).with_blend_mode(mode).with_opacity(weight)
            })
            .collect();
        let composite = composite_layers(&layers, width, height)?;
        let edges = EdgeMap::detect(&composite);
        let seeds = edges.points_above(SEED_THRESHOLD, SEED_MARGIN, SEED_STRIDE);
        tracing::debug!(
            width,
            height,
            images = images.len(),
            seeds = seeds.len(),
            "edge-trace created"
        );

        let config = SwarmConfig {
            count: params.particles,
            bounds: Bounds::new(width as f64, height as f64, BOUNDS_MARGIN),
            speed: (params.speed * 0.5, params.speed * 1.5),
            lifetime: Some(LIFETIME),
        };
        let swarm = ParticleSystem::new(
            config,
            EdgeSeeking::new(edges.clone()),
            Spawner::from_points(seeds),
            Xorshift64::new(seed),
        );
        Ok(Self {
            width,
            height,
            params,
            composite,
            edges,
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
        images: &[PixelBuffer],
    ) -> Result<Self, EffectError> {
        Self::new(width, height, seed, EdgeTraceParams::from_json(json_params), images)
    }

    pub fn swarm(&self) -> &ParticleSystem<EdgeSeeking> {
        &self.swarm
    }

    pub fn composite(&self) -> &PixelBuffer {
        &self.composite
    }
}

impl Effect for EdgeTrace {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame >= self.params.max_frames {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        let p = self.params;
        if self.frame == 0 {
            surface.clear(p.theme.background)?;
        }

        let (w, h) = (self.width as f64, self.height as f64);
        let composite = &self.composite;
        let edges = &self.edges;
        self.swarm.step(|particle| {
            if !particle.moved {
                return;
            }
            let life = (particle.age as f64 / FADE_IN).min(1.0)
                * (1.0 - particle.life_fraction()).max(0.0);
            let rim = if p.fade_edge {
                radial_fade(particle.pos, w, h, 0.9)
            } else {
                1.0
            };
            let alpha = life * rim * MAX_ALPHA;
            if alpha <= 0.01 {
                return;
            }
            let source = composite.get_clamped(particle.prev.x, particle.prev.y);
            let color = source.with_alpha(255).lerp_rgb(p.theme.accent, ACCENT_MIX);
            let width = p.line_width + edges.strength_at(particle.prev) / 255.0 * 1.5;
            surface.stroke_path(
                &[Segment::new(particle.prev, particle.pos)],
                width,
                Paint::new(color).with_alpha(alpha),
            );
        });

        self.frame += 1;
        if self.frame >= p.max_frames {
            tracing::debug!(frame = self.frame, "edge-trace finished");
            return Ok(StepOutcome::Finished);
        }
        Ok(StepOutcome::Continue)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "particles": p.particles,
            "speed": p.speed,
            "line_width": p.line_width,
            "background": p.theme.background,
            "accent": p.theme.accent,
            "fade_edge": p.fade_edge,
            "max_frames": p.max_frames,
        })
    }

    fn param_schema(&self) -> Value {
        let d = EdgeTraceParams::default();
        json!({
            "particles": {
                "type": "integer",
                "default": d.particles,
                "min": 1,
                "max": 5000,
                "description": "Number of pathfinders"
            },
            "speed": {
                "type": "number",
                "default": d.speed,
                "min": 0.1,
                "max": 10.0,
                "description": "Mean pathfinder speed in pixels per frame"
            },
            "line_width": {
                "type": "number",
                "default": d.line_width,
                "min": 0.1,
                "max": 5.0,
                "description": "Base trail width; edges add up to 1.5"
            },
            "background": {
                "type": "color",
                "default": d.theme.background,
                "description": "Canvas color"
            },
            "accent": {
                "type": "color",
                "default": d.theme.accent,
                "description": "Color mixed 40% into every trail"
            },
            "fade_edge": {
                "type": "boolean",
                "default": d.fade_edge,
                "description": "Fade trails toward the canvas rim"
            },
            "max_frames": {
                "type": "integer",
                "default": d.max_frames,
                "min": 1,
                "max": 10000,
                "description": "Steps drawn before the effect stops"
            }
        })
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn dispose(&mut self) {
        self.disposed = true;
        tracing::debug!(frame = self.frame, "edge-trace disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::surface::{DrawCommand, RecordingSurface};

    /// Black on the left, white from column 31.
    fn split(w: usize, h: usize) -> PixelBuffer {
        let mut img = PixelBuffer::filled(w, h, Rgba::BLACK).unwrap();
        for y in 0..h {
            for x in 31..w {
                img.set(x, y, Rgba::WHITE);
            }
        }
        img
    }

    fn small(max_frames: u64) -> EdgeTraceParams {
        EdgeTraceParams {
            particles: 40,
            max_frames,
            ..EdgeTraceParams::default()
        }
    }

    #[test]
    fn pathfinders_start_on_edges() {
        let fx = EdgeTrace::new(60, 40, 1, small(10), &[split(60, 40)]).unwrap();
        for p in fx.swarm().particles() {
            assert_eq!(p.pos.x, 31.0);
            assert!(p.pos.y >= 10.0 && p.pos.y < 30.0);
        }
    }

    #[test]
    fn flat_image_falls_back_to_uniform_seeding() {
        let flat = PixelBuffer::filled(40, 40, Rgba::rgb(90, 90, 90)).unwrap();
        let fx = EdgeTrace::new(40, 40, 1, small(10), &[flat]).unwrap();
        let xs: Vec<f64> = fx.swarm().particles().iter().map(|p| p.pos.x).collect();
        assert!(xs.iter().any(|&x| x != xs[0]));
    }

    #[test]
    fn stops_after_max_frames() {
        let mut fx = EdgeTrace::new(60, 40, 1, small(5), &[split(60, 40)]).unwrap();
        let mut surface = RecordingSurface::new(60, 40);
        for _ in 0..4 {
            assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Continue);
        }
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        let drawn = surface.commands().len();
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        assert_eq!(surface.commands().len(), drawn);
        assert_eq!(fx.frame(), 5);
    }

    #[test]
    fn trails_accumulate_without_clearing() {
        let mut fx = EdgeTrace::new(60, 40, 2, small(30), &[split(60, 40)]).unwrap();
        let mut surface = RecordingSurface::new(60, 40);
        for _ in 0..30 {
            fx.step(&mut surface).unwrap();
        }
        let clears = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Clear(_)))
            .count();
        assert_eq!(clears, 1);
        let strokes: Vec<_> = surface.strokes().collect();
        assert!(!strokes.is_empty());
        for (_, width, paint) in strokes {
            assert!(width >= DEFAULT_LINE_WIDTH && width <= DEFAULT_LINE_WIDTH + 1.5 + 1e-9);
            assert!(paint.alpha > 0.01 && paint.alpha <= MAX_ALPHA);
        }
    }

    #[test]
    fn multiple_images_blend_at_equal_weight() {
        let white = PixelBuffer::filled(20, 20, Rgba::WHITE).unwrap();
        let black = PixelBuffer::filled(20, 20, Rgba::BLACK).unwrap();
        let fx = EdgeTrace::new(20, 20, 1, small(1), &[white, black]).unwrap();
        let px = fx.composite().get(10, 10);
        assert!(px.a > 0);
    }

    #[test]
    fn needs_at_least_one_image() {
        assert!(matches!(
            EdgeTrace::from_json(20, 20, 1, &json!({}), &[]),
            Err(EffectError::MissingImages { needed: 1, .. })
        ));
    }

    mod proptests {
        use super::*;
        use artfx_core::effect::run;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn runs_end_exactly_at_max_frames(
                seed in any::<u64>(),
                w in 32_usize..80,
                h in 12_usize..60,
                max_frames in 1_u64..40,
                speed in 0.1_f64..20.0,
            ) {
                let params = EdgeTraceParams { speed, ..small(max_frames) };
                let mut fx = EdgeTrace::new(w, h, seed, params, &[split(w, h)]).unwrap();
                let mut surface = RecordingSurface::new(w, h);
                let drawn = run(&mut fx, &mut surface, max_frames + 50).unwrap();
                prop_assert_eq!(drawn, max_frames);
                prop_assert_eq!(fx.frame(), max_frames);
                prop_assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
            }
        }
    }
}
