//! Displacement: two images woven together in horizontal strips, each strip
//! pushed sideways by a sine wave. Which image a strip shows is itself a
//! slow wave down the canvas, so the weave rolls as the phase advances.

use std::f64::consts::PI;

use artfx_core::blend::BlendMode;
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::filter::{grade, vignette};
use artfx_core::geometry::Rect;
use artfx_core::params::{param_bool, param_color, param_f64, param_usize};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::draw_cover;
use artfx_core::surface::{Paint, Surface};
use serde_json::{json, Value};

use crate::common::{check_surface, require_images};

pub const NAME: &str = "displacement";

const DEFAULT_AMPLITUDE: f64 = 30.0;
const DEFAULT_FREQUENCY: f64 = 0.02;
const DEFAULT_STRIP_HEIGHT: usize = 4;
const TINT_ALPHA: f64 = 0.1;
const VIGNETTE_ALPHA: f64 = 0.45;
/// Phase advance per frame.
const PHASE_STEP: f64 = 0.008;

/// Which source a strip shows and how far it is shifted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    pub y: usize,
    pub height: usize,
    pub second: bool,
    pub shift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementParams {
    pub amplitude: f64,
    pub frequency: f64,
    pub strip_height: usize,
    pub tint: Rgba,
    pub animated: bool,
}

impl Default for DisplacementParams {
    fn default() -> Self {
        Self {
            amplitude: DEFAULT_AMPLITUDE,
            frequency: DEFAULT_FREQUENCY,
            strip_height: DEFAULT_STRIP_HEIGHT,
            tint: Theme::LIGHT.accent,
            animated: true,
        }
    }
}

impl DisplacementParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            amplitude: param_f64(params, "amplitude", d.amplitude),
            frequency: param_f64(params, "frequency", d.frequency),
            strip_height: param_usize(params, "strip_height", d.strip_height).max(1),
            tint: param_color(params, "tint", d.tint),
            animated: param_bool(params, "animated", d.animated),
        }
    }
}

/// Strip layout of a `height`-pixel canvas at `phase`.
pub fn strips(params: &DisplacementParams, height: usize, phase: f64) -> Vec<Strip> {
    let h = height as f64;
    (0..height)
        .step_by(params.strip_height.max(1))
        .map(|y| {
            let yf = y as f64;
            let weave = ((yf / h * PI * 6.0 + phase * 0.5).sin() + 1.0) / 2.0;
            let second = weave <= 0.5;
            let shift = if second {
                (yf * params.frequency * 0.7 + phase * 1.3).cos() * params.amplitude * 0.6
            } else {
                (yf * params.frequency + phase).sin() * params.amplitude
            };
            Strip {
                y,
                height: params.strip_height.min(height - y),
                second,
                shift,
            }
        })
        .collect()
}

pub struct Displacement {
    width: usize,
    height: usize,
    params: DisplacementParams,
    first: PixelBuffer,
    second: PixelBuffer,
    phase: f64,
    frame: u64,
    disposed: bool,
}

impl Displacement {
    pub fn new(
        width: usize,
        height: usize,
        params: DisplacementParams,
        first: &PixelBuffer,
        second: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let mut a = draw_cover(first, width, height)?;
        grade(&mut a, 0.3, 1.1);
        let mut b = draw_cover(second, width, height)?;
        grade(&mut b, 0.3, 1.1);
        tracing::debug!(width, height, amplitude = params.amplitude, "displacement created");
        Ok(Self {
            width,
            height,
            params,
            first: a,
            second: b,
            phase: 0.0,
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
            DisplacementParams::from_json(json_params),
            &images[0],
            &images[1],
        )
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Effect for Displacement {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || (!self.params.animated && self.frame > 0) {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        let p = self.params;
        let w = self.width as f64;
        surface.clear(Rgba::TRANSPARENT)?;
        for strip in strips(&p, self.height, self.phase) {
            let source = if strip.second {
                &self.second
            } else {
                &self.first
            };
            let (y, sh) = (strip.y as f64, strip.height as f64);
            surface.draw_image(
                source,
                Rect::new(0.0, y, w, sh),
                Rect::new(strip.shift, y, w, sh),
                BlendMode::Normal,
                1.0,
            )?;
        }
        surface.fill_all(
            Paint::new(p.tint)
                .with_blend(BlendMode::Overlay)
                .with_alpha(TINT_ALPHA),
        );

        let h = self.height as f64;
        let mut frame = surface.read_pixels(Rect::full(self.width, self.height))?;
        vignette(&mut frame, h * 0.3, w.max(h) * 0.65, VIGNETTE_ALPHA);
        surface.write_pixels(&frame, 0, 0);

        self.frame += 1;
        if !p.animated {
            return Ok(StepOutcome::Finished);
        }
        self.phase += PHASE_STEP;
        Ok(StepOutcome::Continue)
    }

    fn frame(&self) -> u64 {
        self.frame
    }

    fn params(&self) -> Value {
        let p = &self.params;
        json!({
            "amplitude": p.amplitude,
            "frequency": p.frequency,
            "strip_height": p.strip_height,
            "tint": p.tint,
            "animated": p.animated,
        })
    }

    fn param_schema(&self) -> Value {
        let d = DisplacementParams::default();
        json!({
            "amplitude": {
                "type": "number",
                "default": d.amplitude,
                "min": 0.0,
                "max": 200.0,
                "description": "Maximum sideways shift in pixels"
            },
            "frequency": {
                "type": "number",
                "default": d.frequency,
                "min": 0.001,
                "max": 0.5,
                "description": "Wave frequency down the canvas"
            },
            "strip_height": {
                "type": "integer",
                "default": d.strip_height,
                "min": 1,
                "max": 64,
                "description": "Height of each strip"
            },
            "tint": {
                "type": "color",
                "default": d.tint,
                "description": "Overlay tint color"
            },
            "animated": {
                "type": "boolean",
                "default": d.animated,
                "description": "Keep rolling the weave after the first frame"
            }
        })
    }

    fn is_animated(&self) -> bool {
        self.params.animated
    }

    fn dispose(&mut self) {
        self.disposed = true;
        tracing::debug!(frame = self.frame, "displacement disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::surface::{DrawCommand, RasterSurface, RecordingSurface};

    fn pair() -> Vec<PixelBuffer> {
        vec![
            PixelBuffer::filled(40, 30, Rgba::rgb(200, 40, 40)).unwrap(),
            PixelBuffer::filled(40, 30, Rgba::rgb(40, 40, 200)).unwrap(),
        ]
    }

    #[test]
    fn strips_tile_the_canvas() {
        let p = DisplacementParams::default();
        let layout = strips(&p, 30, 0.0);
        assert_eq!(layout.len(), 8);
        assert_eq!(layout.last().map(|s| s.height), Some(2));
        assert_eq!(layout.iter().map(|s| s.height).sum::<usize>(), 30);
        for s in &layout {
            let limit = if s.second { p.amplitude * 0.6 } else { p.amplitude };
            assert!(s.shift.abs() <= limit + 1e-9);
        }
    }

    #[test]
    fn weave_alternates_sources() {
        let layout = strips(&DisplacementParams::default(), 120, 0.0);
        assert!(layout.iter().any(|s| s.second));
        assert!(layout.iter().any(|s| !s.second));
    }

    #[test]
    fn each_frame_draws_every_strip_then_tints() {
        let mut fx = Displacement::from_json(40, 30, &json!({}), &pair()).unwrap();
        let mut surface = RecordingSurface::new(40, 30);
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Continue);
        let cmds = surface.commands();
        assert_eq!(cmds[0], DrawCommand::Clear(Rgba::TRANSPARENT));
        let images = cmds
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawImage { .. }))
            .count();
        assert_eq!(images, 8);
        let (_, tint) = surface.rects().next().unwrap();
        assert_eq!(tint.blend, BlendMode::Overlay);
        assert!(matches!(cmds.last(), Some(DrawCommand::WritePixels { .. })));
        assert!((fx.phase() - PHASE_STEP).abs() < 1e-12);
    }

    #[test]
    fn static_mode_stops_after_one_frame() {
        let mut fx = Displacement::from_json(40, 30, &json!({ "animated": false }), &pair()).unwrap();
        let mut surface = RecordingSurface::new(40, 30);
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        assert_eq!(fx.phase(), 0.0);
        let drawn = surface.commands().len();
        assert_eq!(fx.step(&mut surface).unwrap(), StepOutcome::Finished);
        assert_eq!(surface.commands().len(), drawn);
    }

    #[test]
    fn rasterised_frame_shows_both_images() {
        let mut fx = Displacement::from_json(
            40,
            120,
            &json!({ "amplitude": 0 }),
            &[
                PixelBuffer::filled(40, 120, Rgba::rgb(200, 40, 40)).unwrap(),
                PixelBuffer::filled(40, 120, Rgba::rgb(40, 40, 200)).unwrap(),
            ],
        )
        .unwrap();
        let mut surface = RasterSurface::new(40, 120).unwrap();
        fx.step(&mut surface).unwrap();
        let buf = surface.buffer();
        let reddish = buf.pixels().any(|(_, _, p)| p.r > p.b + 40);
        let bluish = buf.pixels().any(|(_, _, p)| p.b > p.r + 40);
        assert!(reddish && bluish);
    }
}
