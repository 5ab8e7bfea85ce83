//! Decaying accumulator of particle presence.
//!
//! A `DensityMap` is a coarse grid, one f32 per cell, aligned to a cell size
//! in pixels. Each tick every cell is multiplied by `decay`; particles then
//! add weight to the cells around them. With no stamping a cell holding `v`
//! falls to `v * decay^n` after `n` ticks.

use glam::DVec2;

use crate::error::EffectError;

/// Per-tick multiplicative decay used by the halftone flow renderer.
pub const DEFAULT_DECAY: f32 = 0.92;

/// How a particle stamps weight into the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    /// Radius in cells. Cells whose centre distance exceeds this get nothing.
    pub radius: i32,
    /// Weight added to the particle's own cell before modulation.
    pub peak: f32,
}

impl Default for Stamp {
    fn default() -> Self {
        Self {
            radius: 3,
            peak: 0.12,
        }
    }
}

impl Stamp {
    /// Weight contributed at `dist` cells: `peak * (1 - dist / (radius + 1))`.
    pub fn falloff(&self, dist: f32) -> f32 {
        if dist > self.radius as f32 {
            return 0.0;
        }
        self.peak * (1.0 - dist / (self.radius as f32 + 1.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DensityMap {
    cols: usize,
    rows: usize,
    cell_size: f64,
    decay: f32,
    data: Vec<f32>,
}

impl DensityMap {
    /// Creates an empty map covering a `width` x `height` canvas with
    /// `ceil(width / cell_size)` x `ceil(height / cell_size)` cells.
    ///
    /// Returns `EffectError::InvalidImageDimensions` for a zero canvas or a
    /// non-positive cell size.
    pub fn new(width: usize, height: usize, cell_size: f64, decay: f32) -> Result<Self, EffectError> {
        if width == 0 || height == 0 || cell_size.is_nan() || cell_size <= 0.0 {
            return Err(EffectError::InvalidImageDimensions { width, height });
        }
        let cols = (width as f64 / cell_size).ceil() as usize;
        let rows = (height as f64 / cell_size).ceil() as usize;
        let len = cols
            .checked_mul(rows)
            .ok_or(EffectError::InvalidImageDimensions { width, height })?;
        Ok(Self {
            cols,
            rows,
            cell_size,
            decay,
            data: vec![0.0; len],
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Multiplies every cell by the decay factor.
    pub fn decay_step(&mut self) {
        let decay = self.decay;
        self.data.iter_mut().for_each(|v| *v *= decay);
    }

    /// Cell under a pixel position, or `None` outside the map.
    pub fn cell_of(&self, pos: DVec2) -> Option<(usize, usize)> {
        let cx = (pos.x / self.cell_size).floor();
        let cy = (pos.y / self.cell_size).floor();
        if cx < 0.0 || cy < 0.0 || cx >= self.cols as f64 || cy >= self.rows as f64 {
            return None;
        }
        Some((cx as usize, cy as usize))
    }

    /// Adds `stamp` weight, scaled by `modulation`, around the cell under
    /// `pos`. Cells are capped at 1. Neighbours off the map are skipped, but
    /// a particle just outside the map still reaches the cells within range.
    /// Positions further than the stamp radius from the map, or not finite,
    /// add nothing.
    pub fn stamp(&mut self, pos: DVec2, stamp: &Stamp, modulation: f32) {
        let fx = (pos.x / self.cell_size).floor();
        let fy = (pos.y / self.cell_size).floor();
        let reach = stamp.radius.max(0) as f64;
        let in_reach = |g: f64, len: usize| g.is_finite() && g >= -reach && g < len as f64 + reach;
        if !in_reach(fx, self.cols) || !in_reach(fy, self.rows) {
            return;
        }
        let (gx, gy) = (fx as i64, fy as i64);
        let r = stamp.radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                let nx = gx + dx;
                let ny = gy + dy;
                if nx < 0 || ny < 0 || nx >= self.cols as i64 || ny >= self.rows as i64 {
                    continue;
                }
                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                if dist > stamp.radius as f32 {
                    continue;
                }
                let idx = ny as usize * self.cols + nx as usize;
                self.data[idx] = (self.data[idx] + stamp.falloff(dist) * modulation).min(1.0);
            }
        }
    }

    /// Value of cell `(cx, cy)`; 0 outside the map.
    pub fn get(&self, cx: usize, cy: usize) -> f32 {
        if cx >= self.cols || cy >= self.rows {
            return 0.0;
        }
        self.data[cy * self.cols + cx]
    }

    /// Overwrites cell `(cx, cy)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, cx: usize, cy: usize, value: f32) {
        if cx < self.cols && cy < self.rows {
            self.data[cy * self.cols + cx] = value;
        }
    }

    /// Value of the cell under a pixel position; 0 outside the map.
    pub fn at_pixel(&self, pos: DVec2) -> f32 {
        self.cell_of(pos).map_or(0.0, |(cx, cy)| self.get(cx, cy))
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}
