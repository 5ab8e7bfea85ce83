//! Step-sampled scalar grid.
//!
//! A `ScalarGrid` holds `cols * rows` f64 samples in row-major layout. Sample
//! `(i, j)` sits at pixel `(i * step, j * step)`, so a grid covering a
//! `width` x `height` canvas has `ceil(width / step) + 1` columns: the last
//! column closes the final cell on the right edge. Unlike a simulation field
//! the grid does not wrap and does not clamp.

use crate::error::EffectError;

/// Scalar samples taken every `step` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarGrid {
    cols: usize,
    rows: usize,
    step: usize,
    data: Vec<f64>,
}

impl ScalarGrid {
    /// Creates a zero-filled grid of `cols` x `rows` samples.
    ///
    /// Returns `EffectError::InvalidImageDimensions` if either count is zero
    /// or `cols * rows` overflows.
    pub fn new(cols: usize, rows: usize, step: usize) -> Result<Self, EffectError> {
        let len = sample_count(cols, rows)?;
        Ok(Self {
            cols,
            rows,
            step: step.max(1),
            data: vec![0.0; len],
        })
    }

    /// Wraps pre-computed samples, validating `data.len() == cols * rows`.
    pub fn from_data(
        cols: usize,
        rows: usize,
        step: usize,
        data: Vec<f64>,
    ) -> Result<Self, EffectError> {
        let expected = sample_count(cols, rows)?;
        if data.len() != expected {
            return Err(EffectError::DimensionMismatch {
                lhs_w: cols,
                lhs_h: rows,
                rhs_w: data.len(),
                rhs_h: 1,
            });
        }
        Ok(Self {
            cols,
            rows,
            step: step.max(1),
            data,
        })
    }

    /// Samples `f(px, py)` at every grid point covering a `width` x `height`
    /// canvas. A zero step is treated as 1.
    pub fn sample(
        width: usize,
        height: usize,
        step: usize,
        mut f: impl FnMut(f64, f64) -> f64,
    ) -> Self {
        let step = step.max(1);
        let cols = width.div_ceil(step) + 1;
        let rows = height.div_ceil(step) + 1;
        let mut data = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                data.push(f((i * step) as f64, (j * step) as f64));
            }
        }
        Self {
            cols,
            rows,
            step,
            data,
        }
    }

    /// Number of sample columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of sample rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Pixel distance between neighbouring samples.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Number of whole cells along each axis, `(cols - 1, rows - 1)`.
    pub fn cells(&self) -> (usize, usize) {
        (self.cols.saturating_sub(1), self.rows.saturating_sub(1))
    }

    /// Sample `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the grid.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.cols && j < self.rows, "sample ({i}, {j}) out of bounds");
        self.data[j * self.cols + i]
    }

    pub fn try_get(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.cols && j < self.rows).then(|| self.data[j * self.cols + i])
    }

    /// Overwrites sample `(i, j)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        if i < self.cols && j < self.rows {
            self.data[j * self.cols + i] = value;
        }
    }

    /// Pixel coordinate of sample `(i, j)`.
    pub fn to_pixel(&self, i: usize, j: usize) -> (f64, f64) {
        ((i * self.step) as f64, (j * self.step) as f64)
    }

    /// Read-only access to the row-major samples.
    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

fn sample_count(cols: usize, rows: usize) -> Result<usize, EffectError> {
    if cols == 0 || rows == 0 {
        return Err(EffectError::InvalidImageDimensions {
            width: cols,
            height: rows,
        });
    }
    cols.checked_mul(rows)
        .ok_or(EffectError::InvalidImageDimensions {
            width: cols,
            height: rows,
        })
}
