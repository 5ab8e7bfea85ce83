#![deny(unsafe_code)]
//! Core machinery for the artfx procedural image renderers.
//!
//! Provides deterministic value noise and fBm ([`NoiseField`]), cover-fit
//! sampling and layer compositing ([`sampler`]), luminance and Sobel edge
//! analysis ([`EdgeMap`]), marching-squares contours ([`contour`]),
//! advected particles with decaying density accumulation
//! ([`ParticleSystem`], [`DensityMap`]), brightness-band pixel sorting
//! ([`PixelSorter`]), the [`Surface`] drawing abstraction and the
//! [`Effect`] trait renderers implement.

pub mod analysis;
pub mod blend;
pub mod color;
pub mod contour;
pub mod density;
pub mod effect;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod grid;
pub mod noise;
pub mod params;
pub mod particle;
pub mod pixel;
pub mod prng;
pub mod recipe;
pub mod sampler;
pub mod sort;
pub mod surface;

pub use analysis::EdgeMap;
pub use blend::{BlendMode, Layer};
pub use color::{Rgba, Theme};
pub use contour::{ContourLevel, Segment};
pub use density::{DensityMap, Stamp};
pub use effect::{Effect, StepOutcome};
pub use error::EffectError;
pub use geometry::Rect;
pub use grid::ScalarGrid;
pub use noise::{Fbm, NoiseField};
pub use particle::{Particle, ParticleSystem};
pub use pixel::PixelBuffer;
pub use prng::Xorshift64;
pub use recipe::Recipe;
pub use sort::{PixelSorter, SortDirection};
pub use surface::{Paint, RasterSurface, RecordingSurface, Surface};
