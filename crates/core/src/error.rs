//! Error types for the artfx core.

use thiserror::Error;

/// Errors produced by sampling, buffer and effect operations.
#[derive(Debug, Error)]
pub enum EffectError {
    /// A source image or buffer had zero width or height (or an overflowing area).
    #[error("invalid image dimensions {width}x{height}: width and height must be non-zero")]
    InvalidImageDimensions { width: usize, height: usize },

    /// Two buffers or grids had incompatible dimensions for an element-wise operation.
    #[error("dimension mismatch: ({lhs_w}, {lhs_h}) vs ({rhs_w}, {rhs_h})")]
    DimensionMismatch {
        lhs_w: usize,
        lhs_h: usize,
        rhs_w: usize,
        rhs_h: usize,
    },

    /// Raw pixel data did not match the declared dimensions.
    #[error("buffer size mismatch: expected {expected} bytes, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// No renderer is registered under the requested name.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A renderer was given fewer source images than it needs.
    #[error("effect '{effect}' needs at least {needed} image(s), got {got}")]
    MissingImages {
        effect: String,
        needed: usize,
        got: usize,
    },

    /// Reading or writing an image file failed.
    #[error("i/o error: {0}")]
    Io(String),
}
