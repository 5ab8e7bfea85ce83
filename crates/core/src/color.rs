//! 8-bit RGBA color and the renderer color theme.
//!
//! Colors are plain sRGB bytes. No gamma-aware blending happens anywhere in
//! the pipeline; mixing is a straight per-channel linear interpolation on the
//! encoded values, which is what the renderers are calibrated against.

use crate::error::EffectError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An RGBA8 color.
///
/// Serializes as `"#rrggbb"` when fully opaque and `"#rrggbbaa"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `"#rrggbb"`, `"rrggbb"`, `"#rrggbbaa"` or `"rrggbbaa"` (case insensitive).
    ///
    /// Returns `EffectError::InvalidColor` for anything else.
    pub fn from_hex(hex: &str) -> Result<Rgba, EffectError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 && hex.len() != 8 {
            return Err(EffectError::InvalidColor(format!(
                "expected 6 or 8 hex digits, got {}",
                hex.len()
            )));
        }
        if !hex.is_ascii() {
            return Err(EffectError::InvalidColor(format!("non-ascii color '{hex}'")));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| EffectError::InvalidColor(format!("invalid {name} component: {e}")))
        };
        let r = channel(0..2, "red")?;
        let g = channel(2..4, "green")?;
        let b = channel(4..6, "blue")?;
        let a = if hex.len() == 8 {
            channel(6..8, "alpha")?
        } else {
            255
        };
        Ok(Rgba { r, g, b, a })
    }

    /// Formats as `"#rrggbb"`, or `"#rrggbbaa"` when not fully opaque.
    pub fn to_hex(self) -> String {
        let Rgba { r, g, b, a } = self;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Same color with a different alpha byte.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Alpha as a fraction in [0, 1].
    pub fn alpha_f64(self) -> f64 {
        self.a as f64 / 255.0
    }

    /// Perceived brightness `0.299r + 0.587g + 0.114b`, normalised to [0, 1].
    pub fn luminance(self) -> f64 {
        crate::analysis::luminance(self.r, self.g, self.b)
    }

    /// Channels as `[r, g, b]` floats in [0, 255].
    pub fn rgb_f64(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }

    /// Builds an opaque color from float channels, rounding and clamping to [0, 255].
    pub fn from_rgb_f64(rgb: [f64; 3]) -> Self {
        Self::rgb(channel_u8(rgb[0]), channel_u8(rgb[1]), channel_u8(rgb[2]))
    }

    /// Per-channel linear mix of the color channels: `self * (1 - t) + other * t`.
    ///
    /// Alpha is kept from `self`.
    pub fn lerp_rgb(self, other: Rgba, t: f64) -> Rgba {
        let mix = |a: u8, b: u8| channel_u8(a as f64 * (1.0 - t) + b as f64 * t);
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a,
        }
    }
}

/// Rounds and clamps a float channel into a byte.
pub fn channel_u8(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.round().clamp(0.0, 255.0) as u8
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Page background plus the single accent tone the renderers tint toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub background: Rgba,
    pub accent: Rgba,
}

impl Theme {
    /// Warm stone background with an amber accent.
    pub const LIGHT: Theme = Theme {
        background: Rgba::rgb(0xfa, 0xfa, 0xf9),
        accent: Rgba::rgb(217, 119, 6),
    };

    /// Near-black background with the same amber accent.
    pub const DARK: Theme = Theme {
        background: Rgba::rgb(0x0c, 0x0a, 0x09),
        accent: Rgba::rgb(217, 119, 6),
    };
}

impl Default for Theme {
    fn default() -> Self {
        Self::LIGHT
    }
}
