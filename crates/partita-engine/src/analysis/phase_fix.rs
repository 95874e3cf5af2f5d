//! Finishing touches applied to every tracked partial.

use std::f64::consts::PI;

use partita_model::{wrap_phase, Breakpoint, Partial};

/// Fraction of the phase error corrected at each breakpoint.
const CORRECTION_GAIN: f64 = 0.5;

/// Nudges breakpoint frequencies so that integrating frequency between
/// breakpoints reproduces the stored phases.
///
/// Starts from the loudest breakpoint, whose phase is trusted, and walks
/// outward in both directions. At each step the frequency of the next
/// breakpoint absorbs half of the phase error, limited to `max_fix_pct`
/// percent of that frequency, and its phase is replaced by the integrated
/// value.
pub fn fix_phases(partial: &mut Partial, max_fix_pct: f64) {
    if partial.len() < 2 {
        return;
    }
    let mut points: Vec<(f64, Breakpoint)> = partial.iter().map(|(t, bp)| (t, *bp)).collect();
    let anchor = loudest(&points);
    let limit = max_fix_pct / 100.0;

    for i in anchor..points.len() - 1 {
        let (t0, b0) = points[i];
        let (t1, mut b1) = points[i + 1];
        let dt = t1 - t0;
        let predicted = b0.phase() + PI * (b0.frequency() + b1.frequency()) * dt;
        let err = wrap_phase(b1.phase() - predicted);
        let bound = limit * b1.frequency();
        let delta = (CORRECTION_GAIN * err / (PI * dt)).clamp(-bound, bound);
        b1.set_frequency(b1.frequency() + delta);
        b1.set_phase(wrap_phase(predicted + PI * delta * dt));
        points[i + 1].1 = b1;
    }

    for i in (1..=anchor).rev() {
        let (t1, b1) = points[i];
        let (t0, mut b0) = points[i - 1];
        let dt = t1 - t0;
        let predicted = b1.phase() - PI * (b0.frequency() + b1.frequency()) * dt;
        let err = wrap_phase(b0.phase() - predicted);
        let bound = limit * b0.frequency();
        let delta = (-CORRECTION_GAIN * err / (PI * dt)).clamp(-bound, bound);
        b0.set_frequency(b0.frequency() + delta);
        b0.set_phase(wrap_phase(predicted - PI * delta * dt));
        points[i - 1].1 = b0;
    }

    for ((_, bp), (_, fixed)) in partial.iter_mut().zip(points) {
        *bp = fixed;
    }
}

/// Index of the loudest breakpoint; the earliest wins ties.
fn loudest(points: &[(f64, Breakpoint)]) -> usize {
    let mut best = 0;
    for (i, (_, bp)) in points.iter().enumerate() {
        if bp.amplitude() > points[best].1.amplitude() {
            best = i;
        }
    }
    best
}

/// Adds zero-amplitude breakpoints `fade_time` before the start and after the
/// end, with phases continued at the end frequencies.
pub fn add_fade_breakpoints(partial: &mut Partial, fade_time: f64) {
    if fade_time <= 0.0 {
        return;
    }
    let (Some((t0, first)), Some((tn, last))) = (
        partial.first().map(|(t, bp)| (t, *bp)),
        partial.last().map(|(t, bp)| (t, *bp)),
    ) else {
        return;
    };
    if first.amplitude() > 0.0 {
        let phase = wrap_phase(first.phase() - 2.0 * PI * first.frequency() * fade_time);
        partial.insert(t0 - fade_time, Breakpoint::null(first.frequency(), phase));
    }
    if last.amplitude() > 0.0 {
        let phase = wrap_phase(last.phase() + 2.0 * PI * last.frequency() * fade_time);
        partial.insert(tn + fade_time, Breakpoint::null(last.frequency(), phase));
    }
}
