//! Marching-squares isoline extraction.
//!
//! Each grid cell is classified by thresholding its four corners
//! (`config = tl*8 + tr*4 + br*2 + bl`, a corner counts as above when
//! `value >= threshold`). Configurations 0 and 15 emit nothing, the twelve
//! single-crossing configurations emit one segment, and the two saddles
//! (5 and 10) always emit two segments with a fixed pairing:
//!
//! - 5 (`0101`): top-left and bottom-right
//! - 10 (`1010`): top-right and left-bottom
//!
//! No centre-value disambiguation is attempted. The resulting breaks at
//! saddle points are part of the expected output.

use glam::DVec2;

use crate::grid::ScalarGrid;

/// Corner-value differences below this collapse the crossing to the edge midpoint.
pub const INTERPOLATION_EPSILON: f64 = 1e-4;

/// One of the four sides of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellEdge {
    Top,
    Right,
    Bottom,
    Left,
}

use CellEdge::{Bottom, Left, Right, Top};

/// Edge pairs joined for each corner configuration.
pub const SEGMENT_TABLE: [&[(CellEdge, CellEdge)]; 16] = [
    &[],
    &[(Left, Bottom)],
    &[(Bottom, Right)],
    &[(Left, Right)],
    &[(Top, Right)],
    &[(Top, Left), (Bottom, Right)],
    &[(Top, Bottom)],
    &[(Top, Left)],
    &[(Top, Left)],
    &[(Top, Bottom)],
    &[(Top, Right), (Left, Bottom)],
    &[(Top, Right)],
    &[(Left, Right)],
    &[(Bottom, Right)],
    &[(Left, Bottom)],
    &[],
];

/// A line segment in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: DVec2,
    pub to: DVec2,
}

impl Segment {
    pub fn new(from: DVec2, to: DVec2) -> Self {
        Self { from, to }
    }

    pub fn length(&self) -> f64 {
        self.from.distance(self.to)
    }
}

/// 4-bit configuration of a cell's corners against `threshold`.
pub fn cell_config(tl: f64, tr: f64, br: f64, bl: f64, threshold: f64) -> u8 {
    let bit = |v: f64| u8::from(v >= threshold);
    bit(tl) * 8 + bit(tr) * 4 + bit(br) * 2 + bit(bl)
}

/// True for the two ambiguous diagonal configurations.
pub fn is_saddle(config: u8) -> bool {
    config == 5 || config == 10
}

/// Position between `p1` and `p2` where the value crosses `threshold`,
/// given values `v1` at `p1` and `v2` at `p2`.
///
/// Falls back to the midpoint when `|v2 - v1| < INTERPOLATION_EPSILON`.
pub fn interpolate(p1: f64, p2: f64, v1: f64, v2: f64, threshold: f64) -> f64 {
    if (v2 - v1).abs() < INTERPOLATION_EPSILON {
        return (p1 + p2) / 2.0;
    }
    p1 + (p2 - p1) * (threshold - v1) / (v2 - v1)
}

/// Segments for a single cell whose top-left corner is at `origin` with side `size`.
///
/// Corner values are `[tl, tr, br, bl]`.
pub fn cell_segments(origin: DVec2, size: f64, corners: [f64; 4], threshold: f64) -> Vec<Segment> {
    let [tl, tr, br, bl] = corners;
    let config = cell_config(tl, tr, br, bl, threshold);
    let pairs = SEGMENT_TABLE[config as usize];
    if pairs.is_empty() {
        return Vec::new();
    }
    let (px, py) = (origin.x, origin.y);
    let crossing = |edge: CellEdge| match edge {
        Top => DVec2::new(interpolate(px, px + size, tl, tr, threshold), py),
        Bottom => DVec2::new(interpolate(px, px + size, bl, br, threshold), py + size),
        Left => DVec2::new(px, interpolate(py, py + size, tl, bl, threshold)),
        Right => DVec2::new(px + size, interpolate(py, py + size, tr, br, threshold)),
    };
    pairs
        .iter()
        .map(|&(a, b)| Segment::new(crossing(a), crossing(b)))
        .collect()
}

/// Isoline segments of `grid` at `threshold`, in pixel coordinates.
pub fn trace_level(grid: &ScalarGrid, threshold: f64) -> Vec<Segment> {
    let (cells_x, cells_y) = grid.cells();
    let size = grid.step() as f64;
    let mut segments = Vec::new();
    for j in 0..cells_y {
        for i in 0..cells_x {
            let corners = [
                grid.get(i, j),
                grid.get(i + 1, j),
                grid.get(i + 1, j + 1),
                grid.get(i, j + 1),
            ];
            let (px, py) = grid.to_pixel(i, j);
            segments.extend(cell_segments(DVec2::new(px, py), size, corners, threshold));
        }
    }
    segments
}

/// All segments traced for one threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLevel {
    /// Position of this level in the requested list.
    pub index: usize,
    pub threshold: f64,
    pub segments: Vec<Segment>,
}

/// Traces every threshold independently.
pub fn trace_levels(grid: &ScalarGrid, thresholds: &[f64]) -> Vec<ContourLevel> {
    thresholds
        .iter()
        .enumerate()
        .map(|(index, &threshold)| ContourLevel {
            index,
            threshold,
            segments: trace_level(grid, threshold),
        })
        .collect()
}

/// `level / count` for `level` in `0..count`.
pub fn evenly_spaced_levels(count: usize) -> Vec<f64> {
    (0..count).map(|l| l as f64 / count as f64).collect()
}
