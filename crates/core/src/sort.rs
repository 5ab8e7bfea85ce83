//! Brightness-band pixel sorting.
//!
//! Each row or column is scanned for maximal runs whose luminance lies in
//! `[low, high]` (inclusive). Runs of at least `min_run` pixels are sorted by
//! ascending luminance, and each pixel is then mixed between its original
//! color and the color that landed at its position by `intensity`. Alpha is
//! left untouched.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::pixel::PixelBuffer;

/// Default brightness band.
pub const DEFAULT_BAND: (f64, f64) = (0.2, 0.7);
/// Default mix toward the sorted order.
pub const DEFAULT_INTENSITY: f64 = 0.7;
/// Runs shorter than this are too short to read as a streak.
pub const DEFAULT_MIN_RUN: usize = 3;

/// Which lines of the buffer are sorted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Sort each column top to bottom.
    #[default]
    Vertical,
    /// Sort each row left to right.
    Horizontal,
}

impl SortDirection {
    pub fn from_name(name: &str) -> Option<SortDirection> {
        match name {
            "vertical" => Some(SortDirection::Vertical),
            "horizontal" => Some(SortDirection::Horizontal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortDirection::Vertical => "vertical",
            SortDirection::Horizontal => "horizontal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSorter {
    pub low: f64,
    pub high: f64,
    /// 0 leaves pixels untouched, 1 writes the fully sorted order.
    pub intensity: f64,
    pub min_run: usize,
}

impl Default for PixelSorter {
    fn default() -> Self {
        Self {
            low: DEFAULT_BAND.0,
            high: DEFAULT_BAND.1,
            intensity: DEFAULT_INTENSITY,
            min_run: DEFAULT_MIN_RUN,
        }
    }
}

impl PixelSorter {
    pub fn new(low: f64, high: f64, intensity: f64) -> Self {
        Self {
            low,
            high,
            intensity: intensity.clamp(0.0, 1.0),
            min_run: DEFAULT_MIN_RUN,
        }
    }

    fn in_band(&self, p: Rgba) -> bool {
        let l = p.luminance();
        l >= self.low && l <= self.high
    }

    /// Maximal in-band runs of at least `min_run` pixels.
    pub fn find_runs(&self, line: &[Rgba]) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for (i, &p) in line.iter().enumerate() {
            match (self.in_band(p), start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.min_run {
                        runs.push(s..i);
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if line.len() - s >= self.min_run {
                runs.push(s..line.len());
            }
        }
        runs
    }

    /// Sorts every qualifying run of `line` in place.
    pub fn sort_line(&self, line: &mut [Rgba]) {
        for run in self.find_runs(line) {
            self.sort_run(&mut line[run]);
        }
    }

    fn sort_run(&self, run: &mut [Rgba]) {
        let mut sorted = run.to_vec();
        sorted.sort_by(|a, b| a.luminance().total_cmp(&b.luminance()));
        for (orig, target) in run.iter_mut().zip(sorted) {
            *orig = orig.lerp_rgb(target, self.intensity);
        }
    }

    /// Sorts every column (vertical) or row (horizontal) of `buf`.
    pub fn sort_buffer(&self, buf: &mut PixelBuffer, direction: SortDirection) {
        let (w, h) = (buf.width(), buf.height());
        match direction {
            SortDirection::Horizontal => {
                let mut line = Vec::with_capacity(w);
                for y in 0..h {
                    line.clear();
                    line.extend((0..w).map(|x| buf.get(x, y)));
                    self.sort_line(&mut line);
                    for (x, &p) in line.iter().enumerate() {
                        buf.set(x, y, p);
                    }
                }
            }
            SortDirection::Vertical => {
                let mut line = Vec::with_capacity(h);
                for x in 0..w {
                    line.clear();
                    line.extend((0..h).map(|y| buf.get(x, y)));
                    self.sort_line(&mut line);
                    for (y, &p) in line.iter().enumerate() {
                        buf.set(x, y, p);
                    }
                }
            }
        }
    }
}
