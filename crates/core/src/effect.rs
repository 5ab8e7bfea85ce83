//! The `Effect` trait every renderer implements.
//!
//! A renderer owns all of its state (buffers, particles, density maps,
//! frame counter). The host owns scheduling: it calls [`Effect::step`]
//! once per frame against a [`Surface`] and stops when the effect reports
//! [`StepOutcome::Finished`] or when it no longer wants frames. The trait
//! is object-safe so renderers can be driven as `Box<dyn Effect>`.

use serde_json::Value;

use crate::error::EffectError;
use crate::surface::Surface;

/// Whether the host should keep scheduling frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The effect has drawn its final frame. Further steps are no-ops.
    Finished,
}

pub trait Effect {
    /// Registry name, e.g. `"flow-field"`.
    fn name(&self) -> &'static str;

    /// Draws one frame.
    ///
    /// Static renderers draw everything on the first call and return
    /// `Finished`. A failed step leaves the effect usable for the next call.
    fn step(&mut self, surface: &mut dyn Surface) -> Result<StepOutcome, EffectError>;

    /// Number of frames drawn so far.
    fn frame(&self) -> u64;

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Type, default, range and description of each parameter.
    fn param_schema(&self) -> Value;

    /// True for renderers that keep changing after their first frame.
    fn is_animated(&self) -> bool {
        false
    }

    /// Releases per-run state. A disposed effect never draws again.
    fn dispose(&mut self);
}

/// Steps `effect` until it finishes or `max_frames` frames have been drawn,
/// returning the number of frames drawn.
pub fn run(
    effect: &mut dyn Effect,
    surface: &mut dyn Surface,
    max_frames: u64,
) -> Result<u64, EffectError> {
    let mut drawn = 0;
    while drawn < max_frames {
        let outcome = effect.step(surface)?;
        drawn += 1;
        if outcome == StepOutcome::Finished {
            break;
        }
    }
    tracing::debug!(effect = effect.name(), frames = drawn, "run complete");
    Ok(drawn)
}
