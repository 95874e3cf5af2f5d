//! End-to-End Determinism Tests for Partita
//!
//! Tests verify:
//! - Repeated synthesis is bit-identical
//! - Analysis does not depend on the worker thread count
//! - Synthesis noise depends only on the seed and partial order
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partita-tests --test e2e_determinism
//! ```

use partita_engine::{
    analyze, synthesize, AnalyzerConfig, Breakpoint, Partial, PartialList, SynthesisParams,
};
use partita_tests::{compute_hash, harmonic_tone, verify_determinism};
use pretty_assertions::{assert_eq, assert_ne};

const SAMPLE_RATE: f64 = 22050.0;

/// Many noisy partials, enough to split synthesis into several jobs.
fn noisy_partials(count: usize) -> PartialList {
    (0..count)
        .map(|i| {
            let f = 100.0 + 37.0 * i as f64;
            let start = 0.001 * (i % 17) as f64;
            let mut p = Partial::new();
            p.insert(start, Breakpoint::new(f, 0.0, 0.5, 0.0));
            p.insert(start + 0.05, Breakpoint::new(f, 0.01, 0.5, 0.3));
            p.insert(start + 0.2, Breakpoint::new(f * 1.01, 0.005, 0.8, 1.2));
            p.insert(start + 0.25, Breakpoint::new(f * 1.01, 0.0, 0.8, 2.0));
            p
        })
        .collect()
}

// ============================================================================
// Synthesis
// ============================================================================

#[test]
fn test_synthesis_is_bit_identical_across_runs() {
    let partials = noisy_partials(150);
    let params = SynthesisParams::new(SAMPLE_RATE).with_seed(7);

    let result = verify_determinism(|| synthesize(&partials, &params).unwrap(), 3);
    result.assert_deterministic();
    assert!(result.output_len > 0);
}

#[test]
fn test_synthesis_seed_changes_noise() {
    let partials = noisy_partials(10);
    let a = synthesize(&partials, &SynthesisParams::new(SAMPLE_RATE).with_seed(1)).unwrap();
    let b = synthesize(&partials, &SynthesisParams::new(SAMPLE_RATE).with_seed(2)).unwrap();
    assert_eq!(a.len(), b.len());
    assert_ne!(compute_hash(&a), compute_hash(&b));
}

#[test]
fn test_noiseless_synthesis_ignores_seed() {
    let mut partials = noisy_partials(10);
    for p in partials.iter_mut() {
        for (_, bp) in p.iter_mut() {
            bp.set_bandwidth(0.0);
        }
    }
    let a = synthesize(&partials, &SynthesisParams::new(SAMPLE_RATE).with_seed(1)).unwrap();
    let b = synthesize(&partials, &SynthesisParams::new(SAMPLE_RATE).with_seed(2)).unwrap();
    assert_eq!(compute_hash(&a), compute_hash(&b));
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_analysis_is_independent_of_thread_count() {
    let tone = harmonic_tone(196.0, &[0.3, 0.3, 0.2, 0.1, 0.05], 0.4, SAMPLE_RATE);
    let base = AnalyzerConfig::new(150.0, 196.0);

    let single = analyze(&tone, SAMPLE_RATE, &base.clone().with_threads(1)).unwrap();
    let several = analyze(&tone, SAMPLE_RATE, &base.clone().with_threads(4)).unwrap();
    assert_eq!(single, several);

    let params = SynthesisParams::new(SAMPLE_RATE);
    assert_eq!(
        compute_hash(&synthesize(&single, &params).unwrap()),
        compute_hash(&synthesize(&several, &params).unwrap())
    );
}

#[test]
fn test_analysis_then_synthesis_is_deterministic() {
    let tone = harmonic_tone(261.6, &[0.5, 0.1], 0.3, SAMPLE_RATE);
    let config = AnalyzerConfig::new(200.0, 261.6);
    let params = SynthesisParams::new(SAMPLE_RATE);

    let result = verify_determinism(
        || {
            let partials = analyze(&tone, SAMPLE_RATE, &config).unwrap();
            synthesize(&partials, &params).unwrap()
        },
        3,
    );
    result.assert_deterministic();
}
