//! Whole-buffer color grading and post-processing.
//!
//! These mirror the handful of 2D-canvas filters the renderers lean on:
//! partial grayscale, contrast, flat tints under a blend mode, radial
//! vignettes, film grain and a left-to-right opacity ramp.

use glam::DVec2;

use crate::blend::{composite_pixel, BlendMode};
use crate::color::{channel_u8, Rgba};
use crate::pixel::PixelBuffer;
use crate::prng::Xorshift64;

/// Rec. 709 luma, the weights CSS `grayscale()` desaturates toward.
fn luma709(c: Rgba) -> f64 {
    0.2126 * c.r as f64 + 0.7152 * c.g as f64 + 0.0722 * c.b as f64
}

/// Mixes each pixel toward its luma by `amount` (0 = unchanged, 1 = fully grey).
pub fn grayscale(buf: &mut PixelBuffer, amount: f64) {
    let a = amount.clamp(0.0, 1.0);
    buf.map_in_place(|_, _, c| {
        let l = luma709(c);
        let mix = |v: u8| channel_u8(v as f64 * (1.0 - a) + l * a);
        Rgba::new(mix(c.r), mix(c.g), mix(c.b), c.a)
    });
}

/// Scales each channel's distance from mid-grey by `amount` (1 = unchanged).
pub fn contrast(buf: &mut PixelBuffer, amount: f64) {
    let offset = 127.5 * (1.0 - amount);
    buf.map_in_place(|_, _, c| {
        let f = |v: u8| channel_u8(v as f64 * amount + offset);
        Rgba::new(f(c.r), f(c.g), f(c.b), c.a)
    });
}

/// [`grayscale`] followed by [`contrast`].
pub fn grade(buf: &mut PixelBuffer, grayscale_amount: f64, contrast_amount: f64) {
    if grayscale_amount > 0.0 {
        grayscale(buf, grayscale_amount);
    }
    if contrast_amount != 1.0 {
        contrast(buf, contrast_amount);
    }
}

/// Adds the same uniform noise `(rand - 0.5) * 255 * amplitude` to the three
/// color channels of every pixel.
pub fn add_grain(buf: &mut PixelBuffer, rng: &mut Xorshift64, amplitude: f64) {
    buf.map_in_place(|_, _, c| {
        let n = (rng.next_f64() - 0.5) * 255.0 * amplitude;
        let f = |v: u8| channel_u8(v as f64 + n);
        Rgba::new(f(c.r), f(c.g), f(c.b), c.a)
    });
}

/// Composites `color` over the whole buffer with `mode` at `alpha`.
pub fn tint(buf: &mut PixelBuffer, color: Rgba, mode: BlendMode, alpha: f64) {
    buf.map_in_place(|_, _, c| composite_pixel(c, color, mode, alpha));
}

/// Radial darkening centred on the buffer: transparent inside `inner`
/// pixels, ramping linearly to black at `max_alpha` at `outer` pixels and beyond.
pub fn vignette(buf: &mut PixelBuffer, inner: f64, outer: f64, max_alpha: f64) {
    let centre = DVec2::new(buf.width() as f64 / 2.0, buf.height() as f64 / 2.0);
    let span = (outer - inner).max(f64::EPSILON);
    buf.map_in_place(|x, y, c| {
        let d = DVec2::new(x as f64 + 0.5, y as f64 + 0.5).distance(centre);
        let t = ((d - inner) / span).clamp(0.0, 1.0);
        composite_pixel(c, Rgba::BLACK, BlendMode::Normal, t * max_alpha)
    });
}

/// Piecewise-linear opacity at `t` from `(position, opacity)` stops sorted by position.
pub fn ramp_at(stops: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(first_pos, first_val)) = stops.first() else {
        return 1.0;
    };
    if t <= first_pos {
        return first_val;
    }
    for pair in stops.windows(2) {
        let ((p0, v0), (p1, v1)) = (pair[0], pair[1]);
        if t <= p1 {
            if p1 - p0 <= f64::EPSILON {
                return v1;
            }
            return v0 + (v1 - v0) * (t - p0) / (p1 - p0);
        }
    }
    stops.last().map_or(1.0, |&(_, v)| v)
}

/// Multiplies every pixel's alpha by a left-to-right ramp through `stops`.
pub fn horizontal_ramp_mask(buf: &mut PixelBuffer, stops: &[(f64, f64)]) {
    let w = buf.width() as f64;
    buf.map_in_place(|x, _, c| {
        let k = ramp_at(stops, (x as f64 + 0.5) / w);
        c.with_alpha(channel_u8(c.a as f64 * k))
    });
}
