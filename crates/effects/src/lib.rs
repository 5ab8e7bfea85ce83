#![deny(unsafe_code)]
//! Effect registry: maps effect names to renderers and provides PNG
//! import/export for pixel buffers.
//!
//! This crate sits between `artfx-core` (which defines the `Effect` trait
//! and the shared machinery) and the CLI. Each renderer lives in its own
//! module; [`EffectKind`] is the single place that knows all of them.

mod common;

pub mod contours;
pub mod displacement;
pub mod dot_matrix;
pub mod double_exposure;
pub mod edge_trace;
pub mod flow_field;
pub mod halftone;
pub mod halftone_alive;
pub mod halftone_flow;
pub mod luminance_scatter;
pub mod particle_dissolve;
pub mod pixel_sort;
pub mod threshold_ghost;

#[cfg(feature = "png")]
pub mod snapshot;

use artfx_core::error::EffectError;
use artfx_core::params::param_range;
use artfx_core::pixel::PixelBuffer;
use artfx_core::Effect;
use serde_json::Value;

/// Every registered renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    FlowField,
    Contours,
    PixelSort,
    Halftone,
    HalftoneAlive,
    HalftoneFlow,
    EdgeTrace,
    DotMatrix,
    DoubleExposure,
    ParticleDissolve,
    LuminanceScatter,
    ThresholdGhost,
    Displacement,
}

const ALL: &[EffectKind] = &[
    EffectKind::FlowField,
    EffectKind::Contours,
    EffectKind::PixelSort,
    EffectKind::Halftone,
    EffectKind::HalftoneAlive,
    EffectKind::HalftoneFlow,
    EffectKind::EdgeTrace,
    EffectKind::DotMatrix,
    EffectKind::DoubleExposure,
    EffectKind::ParticleDissolve,
    EffectKind::LuminanceScatter,
    EffectKind::ThresholdGhost,
    EffectKind::Displacement,
];

/// Fraction of the width used as canvas height when the effect has no
/// image-driven aspect, with the cap applied afterwards.
fn proportional(width: usize, ratio: f64, cap: usize) -> usize {
    ((width as f64 * ratio).floor() as usize).min(cap)
}

impl EffectKind {
    /// Looks up a renderer by its registry name.
    ///
    /// Returns `EffectError::UnknownEffect` if the name is not recognized.
    pub fn from_name(name: &str) -> Result<Self, EffectError> {
        ALL.iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EffectError::UnknownEffect(name.to_string()))
    }

    /// All renderers in registry order.
    pub fn all() -> &'static [EffectKind] {
        ALL
    }

    /// Returns all recognized effect names.
    pub fn list_effects() -> Vec<&'static str> {
        ALL.iter().map(|kind| kind.name()).collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::FlowField => flow_field::NAME,
            EffectKind::Contours => contours::NAME,
            EffectKind::PixelSort => pixel_sort::NAME,
            EffectKind::Halftone => halftone::NAME,
            EffectKind::HalftoneAlive => halftone_alive::NAME,
            EffectKind::HalftoneFlow => halftone_flow::NAME,
            EffectKind::EdgeTrace => edge_trace::NAME,
            EffectKind::DotMatrix => dot_matrix::NAME,
            EffectKind::DoubleExposure => double_exposure::NAME,
            EffectKind::ParticleDissolve => particle_dissolve::NAME,
            EffectKind::LuminanceScatter => luminance_scatter::NAME,
            EffectKind::ThresholdGhost => threshold_ghost::NAME,
            EffectKind::Displacement => displacement::NAME,
        }
    }

    /// Minimum number of source images. Renderers that take "N images"
    /// need at least one and use every image given.
    pub fn images_needed(self) -> usize {
        match self {
            EffectKind::FlowField | EffectKind::Contours => 0,
            EffectKind::PixelSort
            | EffectKind::DotMatrix
            | EffectKind::DoubleExposure
            | EffectKind::Displacement => 2,
            EffectKind::Halftone
            | EffectKind::HalftoneAlive
            | EffectKind::HalftoneFlow
            | EffectKind::EdgeTrace
            | EffectKind::ParticleDissolve
            | EffectKind::LuminanceScatter
            | EffectKind::ThresholdGhost => 1,
        }
    }

    /// Whether the renderer keeps drawing after its first frame with
    /// default params.
    pub fn is_animated(self) -> bool {
        matches!(
            self,
            EffectKind::FlowField
                | EffectKind::HalftoneAlive
                | EffectKind::HalftoneFlow
                | EffectKind::EdgeTrace
                | EffectKind::ParticleDissolve
                | EffectKind::Displacement
        )
    }

    /// Canvas height the renderer looks best at for `width`.
    ///
    /// Halftone variants follow the first image's aspect; the rest use a
    /// fixed proportion of the width with a cap.
    pub fn natural_height(self, width: usize, images: &[PixelBuffer], params: &Value) -> usize {
        let aspect = images
            .first()
            .map(|img| img.height() as f64 / img.width() as f64);
        let height = match self {
            EffectKind::FlowField | EffectKind::Contours => proportional(width, 0.5, 400),
            EffectKind::PixelSort
            | EffectKind::DotMatrix
            | EffectKind::DoubleExposure
            | EffectKind::Displacement => proportional(width, 0.55, 450),
            EffectKind::EdgeTrace
            | EffectKind::ParticleDissolve
            | EffectKind::LuminanceScatter
            | EffectKind::ThresholdGhost => proportional(width, 0.6, 500),
            EffectKind::Halftone => match aspect {
                Some(a) => (width as f64 * a).floor() as usize,
                None => proportional(width, 0.6, 500),
            },
            EffectKind::HalftoneAlive => {
                proportional(width, aspect.map_or(0.6, |a| a.min(0.6)), 500)
            }
            EffectKind::HalftoneFlow => match images.first() {
                Some(img) => {
                    let crop = param_range(params, "crop", (0.0, 1.0));
                    halftone_flow::natural_height(width, img, crop)
                }
                None => proportional(width, 0.6, halftone_flow::MAX_CROPPED_HEIGHT),
            },
        };
        height.max(1)
    }

    /// Constructs the renderer for a `width`x`height` surface.
    ///
    /// Returns `EffectError::MissingImages` when fewer than
    /// [`images_needed`](Self::images_needed) images are supplied.
    pub fn build(
        self,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
        images: &[PixelBuffer],
    ) -> Result<Box<dyn Effect>, EffectError> {
        let needed = self.images_needed();
        if images.len() < needed {
            return Err(EffectError::MissingImages {
                effect: self.name().to_string(),
                needed,
                got: images.len(),
            });
        }
        let (w, h) = (width, height);
        let effect: Box<dyn Effect> = match self {
            EffectKind::FlowField => Box::new(flow_field::FlowField::from_json(w, h, seed, params)?),
            EffectKind::Contours => Box::new(contours::Contours::from_json(w, h, params, images)?),
            EffectKind::PixelSort => Box::new(pixel_sort::PixelSort::from_json(w, h, params, images)?),
            EffectKind::Halftone => Box::new(halftone::Halftone::from_json(w, h, params, images)?),
            EffectKind::HalftoneAlive => Box::new(halftone_alive::HalftoneAlive::from_json(
                w, h, params, images,
            )?),
            EffectKind::HalftoneFlow => Box::new(halftone_flow::HalftoneFlow::from_json(
                w, h, seed, params, images,
            )?),
            EffectKind::EdgeTrace => Box::new(edge_trace::EdgeTrace::from_json(
                w, h, seed, params, images,
            )?),
            EffectKind::DotMatrix => Box::new(dot_matrix::DotMatrix::from_json(w, h, params, images)?),
            EffectKind::DoubleExposure => Box::new(double_exposure::DoubleExposure::from_json(
                w, h, seed, params, images,
            )?),
            EffectKind::ParticleDissolve => Box::new(
                particle_dissolve::ParticleDissolve::from_json(w, h, seed, params, images)?,
            ),
            EffectKind::LuminanceScatter => Box::new(
                luminance_scatter::LuminanceScatter::from_json(w, h, seed, params, images)?,
            ),
            EffectKind::ThresholdGhost => Box::new(threshold_ghost::ThresholdGhost::from_json(
                w, h, seed, params, images,
            )?),
            EffectKind::Displacement => Box::new(displacement::Displacement::from_json(
                w, h, params, images,
            )?),
        };
        Ok(effect)
    }
}

/// Builds an effect by registry name. Shorthand for
/// [`EffectKind::from_name`] followed by [`EffectKind::build`].
pub fn build_effect(
    name: &str,
    width: usize,
    height: usize,
    seed: u64,
    params: &Value,
    images: &[PixelBuffer],
) -> Result<Box<dyn Effect>, EffectError> {
    EffectKind::from_name(name)?.build(width, height, seed, params, images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfx_core::color::Rgba;
    use artfx_core::effect::{run, StepOutcome};
    use artfx_core::surface::{RasterSurface, RecordingSurface};
    use serde_json::json;

    fn images(n: usize) -> Vec<PixelBuffer> {
        (0..n)
            .map(|i| {
                let v = 40 + (i as u8) * 90;
                let mut img = PixelBuffer::new(32, 24).unwrap();
                img.map_in_place(|x, y, _| Rgba::rgb(v, (x * 7) as u8, (y * 9) as u8));
                img
            })
            .collect()
    }

    #[test]
    fn from_name_round_trips_every_kind() {
        for &kind in EffectKind::all() {
            assert_eq!(EffectKind::from_name(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn from_name_unknown_returns_error() {
        let result = EffectKind::from_name("nonexistent");
        assert!(matches!(result, Err(EffectError::UnknownEffect(ref n)) if n == "nonexistent"));
    }

    #[test]
    fn list_effects_has_thirteen_unique_names() {
        let mut names = EffectKind::list_effects();
        assert_eq!(names.len(), 13);
        assert!(names.contains(&"flow-field"));
        assert!(names.contains(&"threshold-ghost"));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 13);
    }

    #[test]
    fn build_rejects_too_few_images() {
        let result = build_effect("pixel-sort", 32, 24, 1, &json!({}), &images(1));
        match result {
            Err(EffectError::MissingImages { effect, needed, got }) => {
                assert_eq!(effect, "pixel-sort");
                assert_eq!((needed, got), (2, 1));
            }
            other => panic!("expected MissingImages, got {:?}", other.map(|e| e.name())),
        }
    }

    #[test]
    fn every_effect_builds_and_draws_a_frame() {
        for &kind in EffectKind::all() {
            let imgs = images(kind.images_needed().max(1));
            let mut effect = kind.build(32, 24, 7, &json!({}), &imgs).unwrap();
            assert_eq!(effect.name(), kind.name());
            assert_eq!(effect.is_animated(), kind.is_animated(), "{}", kind.name());
            let mut surface = RecordingSurface::new(32, 24);
            effect.step(&mut surface).unwrap();
            assert_eq!(effect.frame(), 1, "{}", kind.name());
            assert!(!surface.commands().is_empty(), "{} drew nothing", kind.name());
        }
    }

    #[test]
    fn every_effect_reports_params_and_schema() {
        for &kind in EffectKind::all() {
            let imgs = images(kind.images_needed());
            let effect = kind.build(32, 24, 7, &json!({}), &imgs).unwrap();
            let params = effect.params();
            let schema = effect.param_schema();
            let keys = params.as_object().unwrap();
            assert!(!keys.is_empty(), "{}", kind.name());
            for key in keys.keys() {
                assert!(schema.get(key).is_some(), "{}: no schema for {key}", kind.name());
            }
        }
    }

    #[test]
    fn static_effects_finish_after_one_frame() {
        for &kind in EffectKind::all().iter().filter(|k| !k.is_animated()) {
            let imgs = images(kind.images_needed());
            let mut effect = kind.build(32, 24, 7, &json!({}), &imgs).unwrap();
            let mut surface = RecordingSurface::new(32, 24);
            assert_eq!(effect.step(&mut surface).unwrap(), StepOutcome::Finished);
            assert_eq!(run(effect.as_mut(), &mut surface, 10).unwrap(), 1);
        }
    }

    #[test]
    fn disposed_effects_never_draw() {
        for &kind in EffectKind::all() {
            let imgs = images(kind.images_needed());
            let mut effect = kind.build(32, 24, 7, &json!({}), &imgs).unwrap();
            effect.dispose();
            let mut surface = RecordingSurface::new(32, 24);
            assert_eq!(effect.step(&mut surface).unwrap(), StepOutcome::Finished);
            assert!(surface.commands().is_empty(), "{}", kind.name());
        }
    }

    #[test]
    fn determinism_same_seed() {
        for name in ["flow-field", "halftone-flow", "edge-trace", "double-exposure"] {
            let kind = EffectKind::from_name(name).unwrap();
            let imgs = images(kind.images_needed());
            let render = || {
                let mut effect = kind.build(32, 24, 99, &json!({}), &imgs).unwrap();
                let mut surface = RasterSurface::new(32, 24).unwrap();
                run(effect.as_mut(), &mut surface, 5).unwrap();
                surface.into_buffer()
            };
            assert_eq!(render(), render(), "{name}");
        }
    }

    #[test]
    fn natural_height_by_family() {
        let none: &[PixelBuffer] = &[];
        let p = json!({});
        assert_eq!(EffectKind::FlowField.natural_height(600, none, &p), 300);
        assert_eq!(EffectKind::Contours.natural_height(1000, none, &p), 400);
        assert_eq!(EffectKind::PixelSort.natural_height(600, none, &p), 330);
        assert_eq!(EffectKind::EdgeTrace.natural_height(600, none, &p), 360);
        assert_eq!(EffectKind::EdgeTrace.natural_height(2000, none, &p), 500);
    }

    #[test]
    fn halftone_heights_follow_image_aspect() {
        let tall = vec![PixelBuffer::new(100, 200).unwrap()];
        let p = json!({});
        assert_eq!(EffectKind::Halftone.natural_height(300, &tall, &p), 600);
        assert_eq!(EffectKind::HalftoneAlive.natural_height(300, &tall, &p), 180);
        let wide = vec![PixelBuffer::new(200, 100).unwrap()];
        assert_eq!(EffectKind::HalftoneAlive.natural_height(300, &wide, &p), 150);
    }

    #[test]
    fn effect_kind_is_object_safe_behind_box() {
        let effect: Box<dyn Effect> = build_effect("contours", 16, 16, 1, &json!({}), &[]).unwrap();
        assert_eq!(effect.name(), "contours");
    }
}
