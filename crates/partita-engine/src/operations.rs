//! Whole-list operations.
//!
//! These functions borrow their inputs and return newly owned results, so a
//! host can chain them without managing stage objects. Each one validates
//! its parameters before doing any work.

use std::path::Path;

use partita_model::{sdif, LinearEnvelope, PartialList};
use tracing::info;

use crate::analysis::{Analyzer, AnalyzerConfig, FundamentalEstimator};
use crate::error::EngineResult;
use crate::morph::{Channelizer, Dilator, Distiller, Morpher, Sifter};
use crate::synthesis::{SynthesisParams, Synthesizer};

/// Analyzes `samples` into partials.
pub fn analyze(
    samples: &[f64],
    sample_rate: f64,
    config: &AnalyzerConfig,
) -> EngineResult<PartialList> {
    Analyzer::new(config.clone())?.analyze(samples, sample_rate)
}

/// Renders `partials` to samples at `params.sample_rate`.
///
/// An empty list renders to an empty buffer.
pub fn synthesize(partials: &PartialList, params: &SynthesisParams) -> EngineResult<Vec<f64>> {
    let mut synth = Synthesizer::new(params.clone())?;
    synth.synthesize(partials)?;
    Ok(synth.into_samples())
}

/// Labels a copy of `partials` by harmonic number against `reference`, the
/// frequency envelope of harmonic `reference_label`.
pub fn channelize(
    partials: &PartialList,
    reference: &LinearEnvelope,
    reference_label: u32,
) -> EngineResult<PartialList> {
    let channelizer = Channelizer::new(reference.clone(), reference_label)?;
    let mut out = partials.clone();
    channelizer.channelize(&mut out);
    Ok(out)
}

/// Merges same-label partials of a copy of `partials`.
pub fn distill(partials: &PartialList) -> PartialList {
    let mut out = partials.clone();
    Distiller::default().distill(&mut out);
    out
}

/// Unlabels competing partials in a copy of `partials`.
pub fn sift(partials: &PartialList) -> PartialList {
    let mut out = partials.clone();
    Sifter::default().sift(&mut out);
    out
}

/// Time-warps a copy of `partials` so that each `(initial, target)` marker
/// pair lines up.
pub fn dilate(partials: &PartialList, markers: &[(f64, f64)]) -> EngineResult<PartialList> {
    let dilator = Dilator::from_pairs(markers)?;
    let mut out = partials.clone();
    dilator.dilate(&mut out);
    Ok(out)
}

/// Morphs from `source` to `target` with one weight envelope for every
/// parameter.
pub fn morph(
    source: &PartialList,
    target: &PartialList,
    weight: &LinearEnvelope,
) -> EngineResult<PartialList> {
    Morpher::new(weight.clone()).morph(source, target)
}

/// Estimates the fundamental frequency of `partials` every `interval`
/// seconds, searching between `min_freq` and `max_freq`.
pub fn create_f0_estimate(
    partials: &PartialList,
    min_freq: f64,
    max_freq: f64,
    interval: f64,
) -> EngineResult<LinearEnvelope> {
    FundamentalEstimator::new(min_freq, max_freq, interval).estimate(partials)
}

/// Reads partials from an SDIF file.
pub fn import_partials(path: impl AsRef<Path>) -> EngineResult<PartialList> {
    let path = path.as_ref();
    let partials = sdif::read_partials(path)?;
    info!(path = %path.display(), partials = partials.len(), "imported partials");
    Ok(partials)
}

/// Writes partials to an SDIF file.
pub fn export_partials(path: impl AsRef<Path>, partials: &PartialList) -> EngineResult<()> {
    let path = path.as_ref();
    sdif::write_partials(path, partials)?;
    info!(path = %path.display(), partials = partials.len(), "exported partials");
    Ok(())
}
