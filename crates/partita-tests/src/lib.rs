//! Partita End-to-End Test Infrastructure
//!
//! This crate exercises whole flows across the model and engine crates:
//!
//! - Round trip: samples -> partials -> samples, and partials -> SDIF -> partials
//! - Morphing: channelize, distill, sift, dilate and morph two analyzed tones
//! - **Determinism**: bit-identical output across runs and thread counts
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partita-tests
//! ```
//!
//! ## Determinism Testing
//!
//! ```rust,ignore
//! use partita_tests::determinism::verify_determinism;
//!
//! let result = verify_determinism(|| synthesize(&partials, &params).unwrap(), 3);
//! assert!(result.is_deterministic);
//! ```

pub mod audio_analysis;
pub mod determinism;
pub mod fixtures;

pub use audio_analysis::{calculate_rms, peak_amplitude, snr_db};
pub use determinism::{compute_hash, verify_determinism, DeterminismResult, SampleDiff};
pub use fixtures::{harmonic_tone, sine_tone};
