//! Blend modes and compositing layers.
//!
//! Compositing follows the separable-blend model of 2D canvases: the blend
//! function mixes source and backdrop colors, then the result is laid over
//! the backdrop with source-over alpha. [`BlendMode::Lighter`] is the plus
//! operator instead (straight addition, saturating).

use serde::{Deserialize, Serialize};

use crate::color::{channel_u8, Rgba};
use crate::pixel::PixelBuffer;

/// Blend mode used when compositing a layer, a fill or a stroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Plain source-over.
    #[default]
    Normal,
    /// `1 - (1 - a)(1 - b)`: brightens, never darkens.
    Screen,
    /// `a * b`: darkens, never brightens.
    Multiply,
    /// Additive (plus), saturating at white.
    Lighter,
    /// Multiply in the shadows, screen in the highlights of the backdrop.
    Overlay,
}

impl BlendMode {
    /// Parses the snake-case name used in params (`"screen"`, `"lighter"`, ...).
    pub fn from_name(name: &str) -> Option<BlendMode> {
        match name {
            "normal" | "source-over" => Some(BlendMode::Normal),
            "screen" => Some(BlendMode::Screen),
            "multiply" => Some(BlendMode::Multiply),
            "lighter" | "additive" => Some(BlendMode::Lighter),
            "overlay" => Some(BlendMode::Overlay),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Screen => "screen",
            BlendMode::Multiply => "multiply",
            BlendMode::Lighter => "lighter",
            BlendMode::Overlay => "overlay",
        }
    }

    /// Separable blend of backdrop `cb` and source `cs`, both in [0, 1].
    fn mix(self, cb: f64, cs: f64) -> f64 {
        match self {
            BlendMode::Normal | BlendMode::Lighter => cs,
            BlendMode::Screen => cb + cs - cb * cs,
            BlendMode::Multiply => cb * cs,
            BlendMode::Overlay => {
                if cb <= 0.5 {
                    2.0 * cb * cs
                } else {
                    let s = 2.0 * cb - 1.0;
                    s + cs - s * cs
                }
            }
        }
    }
}

/// Composites `src` over `dst` using `mode`, with the source alpha scaled by `opacity`.
pub fn composite_pixel(dst: Rgba, src: Rgba, mode: BlendMode, opacity: f64) -> Rgba {
    let a_s = src.alpha_f64() * opacity.clamp(0.0, 1.0);
    if a_s <= 0.0 {
        return dst;
    }
    let a_b = dst.alpha_f64();
    let cs = src.rgb_f64().map(|c| c / 255.0);
    let cb = dst.rgb_f64().map(|c| c / 255.0);

    let (a_o, premultiplied) = if mode == BlendMode::Lighter {
        let a_o = (a_s + a_b).min(1.0);
        let co = [0, 1, 2].map(|i| (a_s * cs[i] + a_b * cb[i]).min(1.0));
        (a_o, co)
    } else {
        let a_o = a_s + a_b * (1.0 - a_s);
        let co = [0, 1, 2].map(|i| {
            let blended = (1.0 - a_b) * cs[i] + a_b * mode.mix(cb[i], cs[i]);
            a_s * blended + a_b * (1.0 - a_s) * cb[i]
        });
        (a_o, co)
    };

    if a_o <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    Rgba::new(
        channel_u8(premultiplied[0] / a_o * 255.0),
        channel_u8(premultiplied[1] / a_o * 255.0),
        channel_u8(premultiplied[2] / a_o * 255.0),
        channel_u8(a_o * 255.0),
    )
}

/// One source image in a composite stack, with its blend mode and opacity.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    image: &'a PixelBuffer,
    blend_mode: BlendMode,
    opacity: f64,
}

impl<'a> Layer<'a> {
    /// Creates a layer with `BlendMode::Normal` and opacity `1.0`.
    pub fn new(image: &'a PixelBuffer) -> Self {
        Self {
            image,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
        }
    }

    pub fn image(&self) -> &'a PixelBuffer {
        self.image
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Opacity in [0.0, 1.0].
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Returns the layer with the given blend mode.
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// Returns the layer with the given opacity, clamped to [0.0, 1.0].
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREY: Rgba = Rgba::rgb(128, 128, 128);

    #[test]
    fn default_mode_is_normal() {
        assert_eq!(BlendMode::default(), BlendMode::Normal);
    }

    #[test]
    fn from_name_accepts_canvas_aliases() {
        assert_eq!(BlendMode::from_name("source-over"), Some(BlendMode::Normal));
        assert_eq!(BlendMode::from_name("lighter"), Some(BlendMode::Lighter));
        assert_eq!(BlendMode::from_name("additive"), Some(BlendMode::Lighter));
        assert_eq!(BlendMode::from_name("difference"), None);
    }

    #[test]
    fn name_round_trips_through_from_name() {
        for mode in [
            BlendMode::Normal,
            BlendMode::Screen,
            BlendMode::Multiply,
            BlendMode::Lighter,
            BlendMode::Overlay,
        ] {
            assert_eq!(BlendMode::from_name(mode.name()), Some(mode));
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&BlendMode::Lighter).unwrap(),
            "\"lighter\""
        );
        let m: BlendMode = serde_json::from_str("\"overlay\"").unwrap();
        assert_eq!(m, BlendMode::Overlay);
    }

    #[test]
    fn normal_at_half_opacity_averages() {
        let out = composite_pixel(Rgba::BLACK, Rgba::WHITE, BlendMode::Normal, 0.5);
        assert_eq!(out, Rgba::rgb(128, 128, 128));
    }

    #[test]
    fn zero_opacity_leaves_backdrop() {
        let out = composite_pixel(GREY, Rgba::WHITE, BlendMode::Screen, 0.0);
        assert_eq!(out, GREY);
        let out = composite_pixel(GREY, Rgba::TRANSPARENT, BlendMode::Normal, 1.0);
        assert_eq!(out, GREY);
    }

    #[test]
    fn screen_never_darkens() {
        let out = composite_pixel(GREY, Rgba::rgb(40, 200, 128), BlendMode::Screen, 1.0);
        assert!(out.r >= 128 && out.g >= 128 && out.b >= 128, "{out:?}");
    }

    #[test]
    fn multiply_with_white_is_identity() {
        let c = Rgba::rgb(10, 120, 250);
        assert_eq!(composite_pixel(c, Rgba::WHITE, BlendMode::Multiply, 1.0), c);
    }

    #[test]
    fn multiply_with_black_is_black() {
        let out = composite_pixel(GREY, Rgba::BLACK, BlendMode::Multiply, 1.0);
        assert_eq!(out, Rgba::BLACK);
    }

    #[test]
    fn lighter_adds_and_saturates() {
        let out = composite_pixel(
            Rgba::rgb(100, 200, 10),
            Rgba::rgb(100, 100, 10),
            BlendMode::Lighter,
            1.0,
        );
        assert_eq!(out, Rgba::rgb(200, 255, 20));
    }

    #[test]
    fn overlay_keeps_black_and_white_backdrops() {
        assert_eq!(
            composite_pixel(Rgba::BLACK, GREY, BlendMode::Overlay, 1.0),
            Rgba::BLACK
        );
        assert_eq!(
            composite_pixel(Rgba::WHITE, GREY, BlendMode::Overlay, 1.0),
            Rgba::WHITE
        );
    }

    #[test]
    fn blend_onto_transparent_backdrop_yields_source() {
        let src = Rgba::rgb(30, 60, 90);
        for mode in [BlendMode::Normal, BlendMode::Screen, BlendMode::Multiply] {
            let out = composite_pixel(Rgba::TRANSPARENT, src, mode, 0.6);
            assert_eq!(out.with_alpha(255), src, "mode {mode:?}");
            assert_eq!(out.a, 153);
        }
    }

    #[test]
    fn layer_builder_clamps_opacity() {
        let img = PixelBuffer::new(1, 1).unwrap();
        let layer = Layer::new(&img)
            .with_blend_mode(BlendMode::Screen)
            .with_opacity(1.7);
        assert_eq!(layer.blend_mode(), BlendMode::Screen);
        assert_eq!(layer.opacity(), 1.0);
        assert_eq!(Layer::new(&img).with_opacity(-1.0).opacity(), 0.0);
    }
}
