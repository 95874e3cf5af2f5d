//! Partita Spectral Modeling Engine
//!
//! This crate analyzes sampled audio into partials, resynthesizes audio from
//! partials, and morphs between two sets of partials.
//!
//! # Overview
//!
//! - **Analysis** - reassigned short-time spectra, peak tracking and
//!   bandwidth estimation ([`Analyzer`])
//! - **Synthesis** - phase-continuous additive synthesis with
//!   bandwidth-enhanced noise ([`Synthesizer`])
//! - **Morphing** - channelize, distill, sift, dilate and morph
//!   ([`morph`])
//! - **Fundamental estimation** - harmonic-template pitch tracking over
//!   partials ([`FundamentalEstimator`])
//!
//! # Determinism
//!
//! Analysis output does not depend on the number of worker threads.
//! Synthesis noise comes from one PCG32 stream per partial, seeded through
//! BLAKE3 from the synthesis seed and the partial's index, and job buffers
//! are summed in a fixed order, so repeated runs are bit-identical.
//!
//! # Example
//!
//! ```
//! use partita_engine::{analyze, synthesize, AnalyzerConfig, SynthesisParams};
//!
//! let sr = 22050.0;
//! let tone: Vec<f64> = (0..11025)
//!     .map(|n| 0.5 * (2.0 * std::f64::consts::PI * 440.0 * n as f64 / sr).sin())
//!     .collect();
//!
//! let partials = analyze(&tone, sr, &AnalyzerConfig::new(300.0, 440.0))?;
//! let resynth = synthesize(&partials, &SynthesisParams::new(sr))?;
//! assert!(!resynth.is_empty());
//! # Ok::<(), partita_engine::EngineError>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`analysis`] - analyzer, spectral peaks, tracking, fundamental estimation
//! - [`synthesis`] - synthesizer and its parameters
//! - [`morph`] - morph pipeline stages
//! - [`operations`] - whole-list operations that return new lists
//! - [`filter`] - biquad filters for noise shaping
//! - [`rng`] - deterministic RNG with seed derivation
//! - [`dsp`] - numeric helpers

pub mod analysis;
pub mod dsp;
pub mod error;
pub mod filter;
pub mod morph;
pub mod operations;
pub mod rng;
pub mod synthesis;

pub use analysis::{Analyzer, AnalyzerConfig, FundamentalEstimator};
pub use error::{EngineError, EngineResult};
pub use morph::{Channelizer, Dilator, Distiller, Morpher, PartialTransform, Sifter};
pub use operations::{
    analyze, channelize, create_f0_estimate, dilate, distill, export_partials, import_partials,
    morph as morph_partials, sift, synthesize,
};
pub use synthesis::{NoiseFilterConfig, SynthesisParams, Synthesizer};

pub use partita_model::{Breakpoint, LinearEnvelope, Partial, PartialList};
