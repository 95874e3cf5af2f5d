//! Sound morphing.
//!
//! Morphing two sounds takes their partial lists through a fixed sequence
//! of stages:
//!
//! - [`Channelizer`] labels each partial with its harmonic number
//! - [`Distiller`] merges same-label partials into one
//! - [`Sifter`] unlabels partials that still compete for a label
//! - [`Dilator`] aligns temporal landmarks between the two sounds
//! - [`Morpher`] interpolates corresponding partials
//!
//! The first four stages rewrite a list in place and share the
//! [`PartialTransform`] trait; the morpher reads two lists and builds a new
//! one.

pub mod channelizer;
pub mod dilator;
pub mod distiller;
pub mod morpher;
pub mod sifter;


use partita_model::PartialList;
use tracing::trace;

pub use channelizer::Channelizer;
pub use dilator::Dilator;
pub use distiller::Distiller;
pub use morpher::Morpher;
pub use sifter::Sifter;

use crate::error::EngineResult;

/// Default fade used when distilling and sifting (seconds).
pub const DEFAULT_FADE_TIME: f64 = 0.001;

/// An in-place rewrite of a partial list.
pub trait PartialTransform {
    /// Short stage name used in logs.
    fn name(&self) -> &'static str;

    /// Applies the transform.
    fn apply(&self, partials: &mut PartialList) -> EngineResult<()>;
}

/// Applies `stages` in order, stopping at the first error.
pub fn apply_all(stages: &[&dyn PartialTransform], partials: &mut PartialList) -> EngineResult<()> {
    for stage in stages {
        trace!(stage = stage.name(), partials = partials.len(), "applying stage");
        stage.apply(partials)?;
    }
    Ok(())
}
