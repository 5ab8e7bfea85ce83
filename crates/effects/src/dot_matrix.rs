//! Dot matrix: a blended pair of images shown as an LED grid of circles or
//! squares over a dark background, with faint scanlines. Static.

use artfx_core::blend::{BlendMode, Layer};
use artfx_core::color::{Rgba, Theme};
use artfx_core::effect::{Effect, StepOutcome};
use artfx_core::error::EffectError;
use artfx_core::geometry::Rect;
use artfx_core::params::{param_bool, param_color, param_f64, param_string};
use artfx_core::pixel::PixelBuffer;
use artfx_core::sampler::composite_layers;
use artfx_core::surface::{Paint, Surface};
use serde_json::{json, Value};

use crate::common::{check_surface, dot_grid, require_images};

pub const NAME: &str = "dot-matrix";

const DEFAULT_CELL_SIZE: f64 = 6.0;
const DEFAULT_GAP: f64 = 2.0;
/// Cells darker than this stay unlit.
const MIN_BRIGHTNESS: f64 = 0.05;
const SCANLINE_EVERY: usize = 3;
const SCANLINE_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    Circle,
    Square,
}

impl CellShape {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "circle" => Some(Self::Circle),
            "square" => Some(Self::Square),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotMatrixParams {
    pub cell_size: f64,
    pub gap: f64,
    pub shape: CellShape,
    pub background: Rgba,
    pub monochrome: bool,
    pub mono_color: Rgba,
}

impl Default for DotMatrixParams {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            gap: DEFAULT_GAP,
            shape: CellShape::Circle,
            background: Theme::DARK.background,
            monochrome: false,
            mono_color: Theme::LIGHT.accent,
        }
    }
}

impl DotMatrixParams {
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            cell_size: param_f64(params, "cell_size", d.cell_size).max(1.0),
            gap: param_f64(params, "gap", d.gap).max(0.0),
            shape: CellShape::from_name(&param_string(params, "shape", d.shape.name()))
                .unwrap_or(d.shape),
            background: param_color(params, "background", d.background),
            monochrome: param_bool(params, "monochrome", d.monochrome),
            mono_color: param_color(params, "mono_color", d.mono_color),
        }
    }

    /// Paint for a cell of `color` with brightness `b`.
    fn cell_paint(&self, color: Rgba, b: f64) -> Paint {
        if self.monochrome {
            Paint::new(self.mono_color).with_alpha(b)
        } else {
            Paint::new(color.with_alpha(255)).with_alpha(0.3 + b * 0.7)
        }
    }
}

pub struct DotMatrix {
    width: usize,
    height: usize,
    params: DotMatrixParams,
    source: PixelBuffer,
    frame: u64,
    disposed: bool,
}

impl DotMatrix {
    /// Blends `first` at 60% with `second` added on top at 50%.
    pub fn new(
        width: usize,
        height: usize,
        params: DotMatrixParams,
        first: &PixelBuffer,
        second: &PixelBuffer,
    ) -> Result<Self, EffectError> {
        let source = composite_layers(
            &[
                Layer::new(first).with_opacity(0.6),
                Layer::new(second)
                    .with_blend_mode(BlendMode::Lighter)
                    .with_opacity(0.5),
            ],
            width,
            height,
        )?;
        tracing::debug!(width, height, shape = params.shape.name(), "dot-matrix created");
        Ok(Self {
            width,
            height,
            params,
            source,
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
            DotMatrixParams::from_json(json_params),
            &images[0],
            &images[1],
        )
    }
}

impl Effect for DotMatrix {
    fn name(&self) -> &'static str {
        NAME
    }

    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError> {
        if self.disposed || self.frame > 0 {
            return Ok(StepOutcome::Finished);
        }
        check_surface(surface, self.width, self.height)?;
        let p = self.params;
        surface.clear(p.background)?;

        let pitch = p.cell_size + p.gap;
        for pos in dot_grid(pitch, self.width, self.height) {
            let color = self.source.get_clamped(pos.x, pos.y);
            let b = color.luminance();
            if b < MIN_BRIGHTNESS {
                continue;
            }
            let paint = p.cell_paint(color, b);
            let scale = 0.4 + b * 0.6;
            match p.shape {
                CellShape::Circle => surface.fill_circle(pos, p.cell_size / 2.0 * scale, paint),
                CellShape::Square => {
                    let size = p.cell_size * scale;
                    let rect = Rect::new(pos.x - size / 2.0, pos.y - size / 2.0, size, size);
                    surface.fill_rect(rect, paint);
                }
            }
        }

        let scanline = Paint::new(Rgba::BLACK).with_alpha(SCANLINE_ALPHA);
        for y in (0..self.height).step_by(SCANLINE_EVERY) {
            surface.fill_rect(Rect::new(0.0, y as f64, self.width as f64, 1.0), scanline);
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
            "cell_size": p.cell_size,
            "gap": p.gap,
            "shape": p.shape.name(),
            "background": p.background,
            "monochrome": p.monochrome,
            "mono_color": p.mono_color,
        })
    }

    fn param_schema(&self) -> Value {
        let d = DotMatrixParams::default();
        json!({
            "cell_size": {
                "type": "number",
                "default": d.cell_size,
                "min": 1.0,
                "max": 64.0,
                "description": "Diameter of a fully lit cell"
            },
            "gap": {
                "type": "number",
                "default": d.gap,
                "min": 0.0,
                "max": 32.0,
                "description": "Space between cells"
            },
            "shape": {
                "type": "string",
                "default": d.shape.name(),
                "options": ["circle", "square"],
                "description": "Cell shape"
            },
            "background": {
                "type": "color",
                "default": d.background,
                "description": "Panel color"
            },
            "monochrome": {
                "type": "boolean",
                "default": d.monochrome,
                "description": "Light every cell in a single color"
            },
            "mono_color": {
                "type": "color",
                "default": d.mono_color,
                "description": "Cell color in monochrome mode"
            }
        })
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
