//! Bandwidth-enhanced oscillator.
//!
//! One partial is rendered as a sinusoid whose amplitude is split between a
//! pure carrier and a noise-modulated carrier:
//!
//! ```text
//! y(n) = a(n) * ((1 - bw(n)) + bw(n) * z(n)) * cos(phi(n))
//! ```
//!
//! `z` is unit-variance lowpass noise, so the noise component is a band of
//! noise centered on the partial frequency. This is not the additive mix
//! `(1 - bw) * cos(phi) + bw * noise`: the noise modulates the carrier, so
//! its energy stays next to the partial frequency and a partial with
//! `bw = 1` is pure narrowband noise. The phase is integrated from the
//! interpolated frequency with the trapezoid rule and is never reset at
//! breakpoints.

use std::f64::consts::{PI, TAU};

use partita_model::Partial;

use crate::analysis::phase_fix::add_fade_breakpoints;
use crate::filter::FilterCascade;
use crate::rng::{create_partial_rng, gaussian};

/// Impulse response length used to normalize the noise filter.
const NOISE_NORM_LEN: usize = 16384;

/// Noise source shared by every partial of one synthesis run.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    filter: FilterCascade,
    gain: f64,
    seed: u32,
}

impl NoiseSource {
    pub fn new(filter: FilterCascade, seed: u32) -> Self {
        let energy = filter.impulse_energy(NOISE_NORM_LEN);
        let gain = if energy > 0.0 { 1.0 / energy.sqrt() } else { 0.0 };
        Self { filter, gain, seed }
    }
}

/// Sample range a partial occupies once faded, clipped to `[0, len)`.
pub fn sample_span(
    partial: &Partial,
    fade_time: f64,
    sample_rate: f64,
    len: usize,
) -> Option<(usize, usize)> {
    if partial.is_empty() || len == 0 {
        return None;
    }
    let start = partial.start_time() - fade_time;
    let end = partial.end_time() + fade_time;
    if end < 0.0 {
        return None;
    }
    let first = (start.max(0.0) * sample_rate).ceil() as usize;
    let last = ((end * sample_rate).floor() as usize).min(len - 1);
    (first <= last).then_some((first, last))
}

/// Adds one partial into `out`, where `out[0]` is sample `offset`.
///
/// `index` selects the partial's noise stream. Samples falling outside `out`
/// are computed but dropped, so the noise and phase do not depend on the
/// buffer bounds.
pub fn render_partial(
    partial: &Partial,
    index: u64,
    fade_time: f64,
    sample_rate: f64,
    noise: &NoiseSource,
    offset: usize,
    out: &mut [f64],
) {
    let span = sample_span(partial, fade_time, sample_rate, offset + out.len());
    let Some((first, last)) = span else {
        return;
    };

    let mut envelope = partial.clone();
    add_fade_breakpoints(&mut envelope, fade_time);

    let mut rng = create_partial_rng(noise.seed, index);
    let mut filter = noise.filter.clone();
    filter.reset();

    let t0 = first as f64 / sample_rate;
    let mut phase = envelope.phase_at(t0);
    let mut prev_freq = envelope.frequency_at(t0);

    for n in first..=last {
        let bp = envelope.parameters_at(n as f64 / sample_rate);
        if n > first {
            phase += PI * (prev_freq + bp.frequency()) / sample_rate;
            if phase >= TAU {
                phase = phase.rem_euclid(TAU);
            }
        }
        prev_freq = bp.frequency();

        let z = noise.gain * filter.process(gaussian(&mut rng));
        let bw = bp.bandwidth();
        if let Some(slot) = n.checked_sub(offset).and_then(|i| out.get_mut(i)) {
            *slot += bp.amplitude() * ((1.0 - bw) + bw * z) * phase.cos();
        }
    }
}
