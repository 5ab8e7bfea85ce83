//! Reproducible description of a render.
//!
//! A [`Recipe`] captures everything needed to recreate an output image:
//! effect name, canvas dimensions, parameter overrides, PRNG seed, frame
//! count and the input image paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EffectError;

/// Two identical recipes fed to the same binary with the same input files
/// produce identical output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub effect: String,
    pub width: usize,
    pub height: usize,
    #[serde(default = "empty_object")]
    pub params: serde_json::Value,
    #[serde(default)]
    pub seed: u64,
    /// Frames to step. Static effects finish after one regardless.
    #[serde(default = "one")]
    pub frames: u64,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn one() -> u64 {
    1
}

impl Recipe {
    /// Creates a recipe with empty params, one frame and no inputs.
    pub fn new(effect: &str, width: usize, height: usize, seed: u64) -> Self {
        Self {
            effect: effect.to_string(),
            width,
            height,
            params: empty_object(),
            seed,
            frames: 1,
            inputs: Vec::new(),
        }
    }

    /// Validates that the recipe has non-zero dimensions and that the
    /// RGBA byte length does not overflow.
    pub fn validate(&self) -> Result<(), EffectError> {
        let invalid = EffectError::InvalidImageDimensions {
            width: self.width,
            height: self.height,
        };
        if self.width == 0 || self.height == 0 {
            return Err(invalid);
        }
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(4))
            .ok_or(invalid)?;
        Ok(())
    }
}
