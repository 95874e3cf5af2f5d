use std::f64::consts::TAU;

use partita_model::{wrap_phase, Breakpoint};

use super::*;

fn steady(f: f64, a: f64, bw: f64, phase: f64, t0: f64, t1: f64) -> Partial {
    let mut p = Partial::new();
    p.insert(t0, Breakpoint::new(f, a, bw, phase));
    p.insert(t1, Breakpoint::new(f, a, bw, wrap_phase(phase + TAU * f * (t1 - t0))));
    p
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_new_rejects_invalid_params() {
    assert!(Synthesizer::new(SynthesisParams::new(0.0)).unwrap_err().is_configuration());
    assert!(Synthesizer::new(SynthesisParams::new(44100.0).with_fade_time(-1.0))
        .unwrap_err()
        .is_configuration());
}

#[test]
fn test_setters_validate() {
    let mut synth = Synthesizer::new(SynthesisParams::default()).unwrap();
    assert!(synth.set_fade_time(-0.5).is_err());
    assert_eq!(synth.params().fade_time, 0.001);
    assert!(synth.set_sample_rate(0.0).is_err());
    assert_eq!(synth.params().sample_rate, 44100.0);

    synth.set_fade_time(0.002).unwrap();
    synth.set_sample_rate(22050.0).unwrap();
    assert_eq!(synth.params().fade_time, 0.002);
    assert_eq!(synth.params().sample_rate, 22050.0);
}

// ============================================================================
// Entry checks
// ============================================================================

#[test]
fn test_fade_longer_than_half_shortest_partial_is_rejected() {
    let partials: PartialList = vec![
        steady(200.0, 0.5, 0.0, 0.0, 0.0, 1.0),
        steady(300.0, 0.5, 0.0, 0.0, 0.2, 0.21),
    ]
    .into_iter()
    .collect();
    let mut synth = Synthesizer::new(SynthesisParams::new(8000.0).with_fade_time(0.02)).unwrap();
    let err = synth.synthesize(&partials).unwrap_err();
    assert!(err.is_configuration());
    assert!(synth.samples().is_empty());

    // Exactly half is allowed.
    synth.set_fade_time(0.005).unwrap();
    synth.synthesize(&partials).unwrap();
}

#[test]
fn test_non_finite_partial_is_malformed() {
    let mut p = steady(200.0, 0.5, 0.0, 0.0, 0.0, 0.5);
    p.insert(0.25, Breakpoint::new(f64::NAN, 0.5, 0.0, 0.0));
    let partials: PartialList = vec![p].into_iter().collect();
    let mut synth = Synthesizer::new(SynthesisParams::new(8000.0)).unwrap();
    assert!(synth.synthesize(&partials).unwrap_err().is_malformed_input());
}

#[test]
fn test_huge_end_time_is_rejected_before_allocating() {
    let mut synth = Synthesizer::new(SynthesisParams::new(44100.0)).unwrap();
    let far: PartialList = std::iter::once(steady(440.0, 0.5, 0.0, 0.0, 0.0, 1e300)).collect();
    assert!(synth.synthesize(&far).unwrap_err().is_malformed_input());
    assert!(synth.samples().is_empty());

    let mut lone = Partial::new();
    lone.insert(1e300, Breakpoint::new(440.0, 0.5, 0.0, 0.0));
    assert!(synth.synthesize_partial(&lone).unwrap_err().is_malformed_input());
    assert!(synth.samples().is_empty());
}

#[test]
fn test_output_len_bound() {
    assert_eq!(output_len(0.0, 44100.0).unwrap(), 1);
    assert_eq!(output_len(1.0, 100.0).unwrap(), 101);
    assert!(output_len(MAX_OUTPUT_SAMPLES as f64, 1.0).is_err());
}

#[test]
fn test_empty_list_gives_empty_buffer() {
    let mut synth = Synthesizer::new(SynthesisParams::default()).unwrap();
    synth.synthesize(&PartialList::new()).unwrap();
    assert!(synth.samples().is_empty());

    let partials: PartialList = vec![Partial::new()].into_iter().collect();
    synth.synthesize(&partials).unwrap();
    assert!(synth.into_samples().is_empty());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_output_spans_latest_end_plus_fade() {
    let sr = 1000.0;
    let partials: PartialList = vec![
        steady(50.0, 0.5, 0.0, 0.0, 0.1, 0.5),
        steady(80.0, 0.5, 0.0, 0.0, 0.2, 0.75),
    ]
    .into_iter()
    .collect();
    let mut synth = Synthesizer::new(SynthesisParams::new(sr).with_fade_time(0.01)).unwrap();
    synth.synthesize(&partials).unwrap();
    assert_eq!(synth.samples().len(), 761);
}

#[test]
fn test_steady_partial_reproduces_cosine() {
    let sr = 44100.0;
    let (f, a, phi) = (440.0, 0.5, 0.7);
    let p = steady(f, a, 0.0, phi, 0.0, 1.0);
    let mut synth = Synthesizer::new(SynthesisParams::new(sr)).unwrap();
    synth.synthesize_partial(&p).unwrap();
    let out = synth.samples();

    assert_eq!(out.len(), 44145);
    for n in (100..44000).step_by(37) {
        let t = n as f64 / sr;
        let expected = a * (TAU * f * t + phi).cos();
        assert!((out[n] - expected).abs() < 1e-6, "sample {}", n);
    }
}

#[test]
fn test_synthesis_accumulates() {
    let p = steady(100.0, 0.25, 0.0, 0.0, 0.0, 0.1);
    let mut synth = Synthesizer::new(SynthesisParams::new(8000.0)).unwrap();
    synth.synthesize_partial(&p).unwrap();
    let once = synth.samples().to_vec();
    synth.synthesize_partial(&p).unwrap();
    for (twice, once) in synth.samples().iter().zip(&once) {
        assert!((twice - 2.0 * once).abs() < 1e-12);
    }
}

#[test]
fn test_samples_mut_allows_editing() {
    let mut synth = Synthesizer::new(SynthesisParams::new(8000.0)).unwrap();
    synth.samples_mut().resize(10, 0.25);
    assert_eq!(synth.samples(), &[0.25; 10]);
}

#[test]
fn test_many_partials_are_deterministic() {
    // More partials than one job, so several jobs render concurrently.
    let partials: PartialList = (0..200)
        .map(|i| {
            let f = 100.0 + 13.0 * i as f64;
            steady(f, 0.01, 0.3, 0.1 * i as f64, 0.001 * i as f64, 0.3)
        })
        .collect();
    let params = SynthesisParams::new(16000.0).with_seed(9);

    let mut first = Synthesizer::new(params.clone()).unwrap();
    first.synthesize(&partials).unwrap();
    let mut second = Synthesizer::new(params).unwrap();
    second.synthesize(&partials).unwrap();
    assert_eq!(first.samples(), second.samples());
}

#[test]
fn test_jobs_sum_to_individual_renders() {
    let sr = 8000.0;
    let partials: PartialList = (0..150)
        .map(|i| steady(50.0 + 20.0 * i as f64, 0.005, 0.0, 0.0, 0.0, 0.2))
        .collect();
    let mut all = Synthesizer::new(SynthesisParams::new(sr)).unwrap();
    all.synthesize(&partials).unwrap();

    let mut single = Synthesizer::new(SynthesisParams::new(sr)).unwrap();
    for p in partials.iter() {
        single.synthesize_partial(p).unwrap();
    }
    assert_eq!(all.samples().len(), single.samples().len());
    for (a, b) in all.samples().iter().zip(single.samples()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_bandwidth_adds_noise_with_same_power() {
    let sr = 16000.0;
    let pure = steady(1000.0, 0.5, 0.0, 0.0, 0.0, 2.0);
    let noisy = steady(1000.0, 0.5, 1.0, 0.0, 0.0, 2.0);

    let power = |p: &Partial| {
        let mut synth = Synthesizer::new(SynthesisParams::new(sr)).unwrap();
        synth.synthesize_partial(p).unwrap();
        let s = &synth.samples()[1000..30000];
        s.iter().map(|x| x * x).sum::<f64>() / s.len() as f64
    };
    let p_pure = power(&pure);
    let p_noisy = power(&noisy);
    assert!((p_pure - 0.125).abs() < 1e-3);
    // Unit-variance noise keeps the mean power close to the pure tone's.
    assert!((p_noisy / p_pure - 1.0).abs() < 0.25, "ratio {}", p_noisy / p_pure);
}
