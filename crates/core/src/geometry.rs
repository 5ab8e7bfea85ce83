//! Rectangles and canvas-relative distance helpers.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in continuous pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` canvas.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        other.x >= self.x - eps
            && other.y >= self.y - eps
            && other.right() <= self.right() + eps
            && other.bottom() <= self.bottom() + eps
    }
}

/// Distance of `point` from the canvas centre, with each axis normalised by
/// the half-extent: 0 at the centre, 1 at the middle of each edge, about
/// 1.41 in the corners.
pub fn normalized_distance(point: DVec2, width: f64, height: f64) -> f64 {
    let cx = width / 2.0;
    let cy = height / 2.0;
    if cx <= 0.0 || cy <= 0.0 {
        return 0.0;
    }
    let dx = (point.x - cx) / cx;
    let dy = (point.y - cy) / cy;
    (dx * dx + dy * dy).sqrt()
}

/// `max(0, 1 - distance * strength)`: the linear radial fade shared by most renderers.
pub fn radial_fade(point: DVec2, width: f64, height: f64, strength: f64) -> f64 {
    (1.0 - normalized_distance(point, width, height) * strength).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_rect_spans_canvas() {
        let r = Rect::full(320, 200);
        assert_eq!(r.right(), 320.0);
        assert_eq!(r.bottom(), 200.0);
        assert_eq!(r.center(), DVec2::new(160.0, 100.0));
    }

    #[test]
    fn contains_rect_is_edge_inclusive() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains_rect(&Rect::new(0.0, 0.0, 10.0, 10.0), 0.0));
        assert!(outer.contains_rect(&Rect::new(2.0, 3.0, 4.0, 5.0), 0.0));
        assert!(!outer.contains_rect(&Rect::new(-1.0, 0.0, 4.0, 4.0), 0.0));
        assert!(!outer.contains_rect(&Rect::new(8.0, 8.0, 4.0, 1.0), 0.0));
    }

    #[test]
    fn normalized_distance_landmarks() {
        assert_eq!(normalized_distance(DVec2::new(50.0, 25.0), 100.0, 50.0), 0.0);
        assert!((normalized_distance(DVec2::new(100.0, 25.0), 100.0, 50.0) - 1.0).abs() < 1e-12);
        let corner = normalized_distance(DVec2::new(0.0, 0.0), 100.0, 50.0);
        assert!((corner - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn normalized_distance_degenerate_canvas_is_zero() {
        assert_eq!(normalized_distance(DVec2::new(5.0, 5.0), 0.0, 10.0), 0.0);
    }

    #[test]
    fn radial_fade_clamps_to_zero() {
        let p = DVec2::new(0.0, 0.0);
        assert_eq!(radial_fade(p, 100.0, 100.0, 1.0), 0.0);
        let centre = DVec2::new(50.0, 50.0);
        assert_eq!(radial_fade(centre, 100.0, 100.0, 0.9), 1.0);
    }
}
