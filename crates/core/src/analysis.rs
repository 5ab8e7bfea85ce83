//! Per-pixel image analysis: luminance and Sobel edge gradients.

use glam::DVec2;

use crate::grid::ScalarGrid;
use crate::pixel::PixelBuffer;

/// Upper bound of an edge magnitude.
pub const MAX_EDGE: f64 = 255.0;

/// `0.299r + 0.587g + 0.114b`, normalised to [0, 1].
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

/// Sobel gradient magnitude at `(x, y)` over luminance in [0, 255],
/// clamped to [`MAX_EDGE`].
///
/// The kernels need the full 8-neighbourhood, so the one-pixel border is
/// undefined and yields `None`.
pub fn sobel_edge(buf: &PixelBuffer, x: usize, y: usize) -> Option<f64> {
    if x == 0 || y == 0 || x + 1 >= buf.width() || y + 1 >= buf.height() {
        return None;
    }
    let l = |dx: isize, dy: isize| {
        let px = (x as isize + dx) as usize;
        let py = (y as isize + dy) as usize;
        buf.luminance_at(px, py) * 255.0
    };
    let gx = -l(-1, -1) - 2.0 * l(-1, 0) - l(-1, 1) + l(1, -1) + 2.0 * l(1, 0) + l(1, 1);
    let gy = -l(-1, -1) - 2.0 * l(0, -1) - l(1, -1) + l(-1, 1) + 2.0 * l(0, 1) + l(1, 1);
    Some((gx * gx + gy * gy).sqrt().min(MAX_EDGE))
}

/// Edge magnitudes for every pixel of a buffer. Border pixels hold 0.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl EdgeMap {
    /// Runs [`sobel_edge`] over the interior of `buf`.
    pub fn detect(buf: &PixelBuffer) -> Self {
        let (width, height) = (buf.width(), buf.height());
        let mut data = vec![0.0; width * height];
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                if let Some(e) = sobel_edge(buf, x, y) {
                    data[y * width + x] = e;
                }
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Magnitude at integer `(x, y)`; 0 outside the map.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[y * self.width + x]
    }

    /// Magnitude under a continuous position (floored); 0 outside the map.
    pub fn strength_at(&self, pos: DVec2) -> f64 {
        if pos.x < 0.0 || pos.y < 0.0 || !pos.is_finite() {
            return 0.0;
        }
        self.get(pos.x as usize, pos.y as usize)
    }

    /// Positions whose magnitude exceeds `threshold`, scanned every `stride`
    /// pixels and skipping a `margin`-pixel frame.
    pub fn points_above(&self, threshold: f64, margin: usize, stride: usize) -> Vec<DVec2> {
        let stride = stride.max(1);
        let mut points = Vec::new();
        let y_end = self.height.saturating_sub(margin);
        let x_end = self.width.saturating_sub(margin);
        for y in (margin..y_end).step_by(stride) {
            for x in (margin..x_end).step_by(stride) {
                if self.get(x, y) > threshold {
                    points.push(DVec2::new(x as f64, y as f64));
                }
            }
        }
        points
    }

    /// Raw magnitudes, row-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Luminance of `buf` sampled every `step` pixels.
pub fn luminance_grid(buf: &PixelBuffer, step: usize) -> ScalarGrid {
    ScalarGrid::sample(buf.width(), buf.height(), step, |x, y| {
        let px = (x as usize).min(buf.width() - 1);
        let py = (y as usize).min(buf.height() - 1);
        buf.luminance_at(px, py)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    fn half_split(width: usize, height: usize) -> PixelBuffer {
        let mut buf = PixelBuffer::filled(width, height, Rgba::BLACK).unwrap();
        for y in 0..height {
            for x in width / 2..width {
                buf.set(x, y, Rgba::WHITE);
            }
        }
        buf
    }

    #[test]
    fn luminance_weights() {
        assert!((luminance(255, 255, 255) - 1.0).abs() < 1e-9);
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert!((luminance(255, 0, 0) - 0.299).abs() < 1e-9);
        assert!((luminance(0, 255, 0) - 0.587).abs() < 1e-9);
        assert!((luminance(0, 0, 255) - 0.114).abs() < 1e-9);
    }

    #[test]
    fn sobel_undefined_on_border() {
        let buf = half_split(6, 6);
        assert!(sobel_edge(&buf, 0, 3).is_none());
        assert!(sobel_edge(&buf, 3, 0).is_none());
        assert!(sobel_edge(&buf, 5, 3).is_none());
        assert!(sobel_edge(&buf, 3, 5).is_none());
        assert!(sobel_edge(&buf, 3, 3).is_some());
    }

    #[test]
    fn sobel_is_zero_on_flat_image() {
        let buf = PixelBuffer::filled(5, 5, Rgba::rgb(90, 90, 90)).unwrap();
        assert_eq!(sobel_edge(&buf, 2, 2), Some(0.0));
    }

    #[test]
    fn sobel_saturates_on_hard_edge() {
        let buf = half_split(8, 8);
        assert_eq!(sobel_edge(&buf, 4, 4), Some(MAX_EDGE));
        assert_eq!(sobel_edge(&buf, 1, 4), Some(0.0));
    }

    #[test]
    fn edge_map_border_is_zero() {
        let map = EdgeMap::detect(&half_split(8, 8));
        for x in 0..8 {
            assert_eq!(map.get(x, 0), 0.0);
            assert_eq!(map.get(x, 7), 0.0);
        }
        assert_eq!(map.get(100, 100), 0.0);
        assert_eq!(map.strength_at(DVec2::new(-1.0, 4.0)), 0.0);
        assert_eq!(map.strength_at(DVec2::new(4.5, 4.2)), MAX_EDGE);
    }

    #[test]
    fn points_above_respects_margin_and_stride() {
        let map = EdgeMap::detect(&half_split(40, 40));
        let pts = map.points_above(100.0, 10, 3);
        assert!(!pts.is_empty());
        for p in &pts {
            assert!(p.x >= 10.0 && p.x < 30.0 && p.y >= 10.0 && p.y < 30.0);
            assert_eq!((p.x as usize - 10) % 3, 0);
            assert_eq!(p.x, 19.0);
        }
    }

    #[test]
    fn points_above_empty_on_flat_image() {
        let map = EdgeMap::detect(&PixelBuffer::filled(30, 30, Rgba::WHITE).unwrap());
        assert!(map.points_above(100.0, 10, 3).is_empty());
    }

    #[test]
    fn luminance_grid_samples_buffer() {
        let grid = luminance_grid(&half_split(8, 4), 2);
        assert_eq!(grid.get(0, 0), 0.0);
        assert!((grid.get(3, 0) - 1.0).abs() < 1e-9);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sobel_bounded(
                w in 3_usize..10,
                h in 3_usize..10,
                bytes in proptest::collection::vec(any::<u8>(), 400),
            ) {
                let data: Vec<u8> = bytes.into_iter().cycle().take(w * h * 4).collect();
                let buf = PixelBuffer::from_raw(w, h, data).unwrap();
                for y in 1..h - 1 {
                    for x in 1..w - 1 {
                        let e = sobel_edge(&buf, x, y).unwrap();
                        prop_assert!((0.0..=MAX_EDGE).contains(&e), "edge = {e}");
                    }
                }
            }

            #[test]
            fn luminance_in_unit_interval(r: u8, g: u8, b: u8) {
                let l = luminance(r, g, b);
                prop_assert!((0.0..=1.0 + 1e-12).contains(&l));
            }
        }
    }
}
