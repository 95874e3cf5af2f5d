//! Interpolation between two labeled partial lists.
//!
//! Partials correspond by label. For each label present in both lists the
//! morphed partial has a breakpoint at every breakpoint time of either
//! partner. Frequency and bandwidth interpolate linearly, amplitude in the
//! log domain:
//!
//! ```text
//! a = exp((1 - w) ln(a_src + s) + w ln(a_tgt + s)) - s
//! ```
//!
//! where `s` is the amplitude shaping offset, which keeps silent
//! breakpoints finite in the log domain. Outside its own span a partner is
//! silent: its frequency, bandwidth and phase are held but its amplitude is
//! zero. A weight at or below 0 yields the source values exactly and at or
//! above 1 the target values exactly.
//!
//! Partials without a partner, including all unlabeled partials, are
//! cross-faded: source partials are scaled by `1 - w` and closed with a
//! null breakpoint, target partials scaled by `w` and opened with one.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use partita_model::{wrap_phase, Breakpoint, LinearEnvelope, Partial, PartialList, UNLABELED};
use tracing::debug;

use crate::error::{require_positive, EngineError, EngineResult};

/// Default amplitude shaping offset.
pub const DEFAULT_AMP_SHAPE: f64 = 1.0e-5;

/// Morphs between a source and a target partial list.
#[derive(Debug, Clone)]
pub struct Morpher {
    frequency: LinearEnvelope,
    amplitude: LinearEnvelope,
    bandwidth: LinearEnvelope,
    amp_shape: f64,
}

/// Which side of the morph an unpaired partial comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

impl Morpher {
    /// Morpher using one weight envelope for every parameter.
    pub fn new(weight: LinearEnvelope) -> Self {
        Self::with_envelopes(weight.clone(), weight.clone(), weight)
    }

    /// Morpher with separate frequency, amplitude and bandwidth weights.
    pub fn with_envelopes(
        frequency: LinearEnvelope,
        amplitude: LinearEnvelope,
        bandwidth: LinearEnvelope,
    ) -> Self {
        Self {
            frequency,
            amplitude,
            bandwidth,
            amp_shape: DEFAULT_AMP_SHAPE,
        }
    }

    pub fn with_amp_shape(mut self, amp_shape: f64) -> EngineResult<Self> {
        require_positive("amp_shape", amp_shape)?;
        self.amp_shape = amp_shape;
        Ok(self)
    }

    pub fn amp_shape(&self) -> f64 {
        self.amp_shape
    }

    /// Morphs `source` toward `target`.
    ///
    /// The result holds the morphed labels in ascending order, then the
    /// faded source partials without a partner, then the faded target ones.
    ///
    /// # Errors
    /// `Configuration` when a positive label occurs more than once in either
    /// list; such lists must be distilled first.
    pub fn morph(&self, source: &PartialList, target: &PartialList) -> EngineResult<PartialList> {
        let src = index_labels("source", source)?;
        let tgt = index_labels("target", target)?;
        let labels: BTreeSet<u32> = src.keys().chain(tgt.keys()).copied().collect();

        let mut out = PartialList::with_capacity(source.len() + target.len());
        let mut paired = 0usize;
        for label in labels {
            match (src.get(&label), tgt.get(&label)) {
                (Some(s), Some(t)) => {
                    out.push(self.morph_pair(s, t, label));
                    paired += 1;
                }
                (Some(s), None) => out.push(self.fade(s, Side::Source)),
                (None, Some(t)) => out.push(self.fade(t, Side::Target)),
                (None, None) => {}
            }
        }
        for p in source.iter().filter(|p| p.label() == UNLABELED && !p.is_empty()) {
            out.push(self.fade(p, Side::Source));
        }
        for p in target.iter().filter(|p| p.label() == UNLABELED && !p.is_empty()) {
            out.push(self.fade(p, Side::Target));
        }

        debug!(
            source = source.len(),
            target = target.len(),
            paired,
            morphed = out.len(),
            "morphed partials"
        );
        Ok(out)
    }

    /// Interpolates two corresponding partials.
    pub fn morph_pair(&self, source: &Partial, target: &Partial, label: u32) -> Partial {
        let mut times: Vec<f64> = source.iter().chain(target.iter()).map(|(t, _)| t).collect();
        // Close each partner just outside its span, where the other one may
        // still be sounding.
        let dt = Partial::SHORTEST_SAFE_FADE_TIME;
        let (mut start, mut end) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in [source, target].into_iter().filter(|p| !p.is_empty()) {
            times.push(p.start_time() - dt);
            times.push(p.end_time() + dt);
            start = start.min(p.start_time());
            end = end.max(p.end_time());
        }
        times.retain(|&t| t >= start && t <= end);
        times.sort_by(f64::total_cmp);
        times.dedup();

        let mut out = Partial::with_label(label);
        for t in times {
            let s = sounding_parameters(source, t);
            let g = sounding_parameters(target, t);
            let wf = weight(&self.frequency, t);
            let wa = weight(&self.amplitude, t);
            let wb = weight(&self.bandwidth, t);

            let frequency = lerp(s.frequency(), g.frequency(), wf);
            let bandwidth = lerp(s.bandwidth(), g.bandwidth(), wb);
            let phase = if wf <= 0.0 {
                s.phase()
            } else if wf >= 1.0 {
                g.phase()
            } else {
                wrap_phase(s.phase() + wf * wrap_phase(g.phase() - s.phase()))
            };
            let amplitude = if wa <= 0.0 {
                s.amplitude()
            } else if wa >= 1.0 {
                g.amplitude()
            } else {
                let shape = self.amp_shape;
                let log =
                    (1.0 - wa) * (s.amplitude() + shape).ln() + wa * (g.amplitude() + shape).ln();
                (log.exp() - shape).max(0.0)
            };
            out.insert(t, Breakpoint::new(frequency, amplitude, bandwidth, phase));
        }
        out
    }

    /// Cross-fades a partial that has no partner.
    fn fade(&self, partial: &Partial, side: Side) -> Partial {
        let mut out = partial.clone();
        for (t, bp) in out.iter_mut() {
            let w = weight(&self.amplitude, t);
            let gain = match side {
                Side::Source => 1.0 - w,
                Side::Target => w,
            };
            bp.set_amplitude(bp.amplitude() * gain);
        }

        let edge = match side {
            Side::Source => partial.last(),
            Side::Target => partial.first(),
        }
        .map(|(t, bp)| (t, *bp));
        if let Some((t, bp)) = edge {
            if bp.amplitude() > 0.0 {
                let dt = Partial::SHORTEST_SAFE_FADE_TIME;
                let (time, phase) = match side {
                    Side::Source => (t + dt, bp.phase() + TAU * bp.frequency() * dt),
                    Side::Target => (t - dt, bp.phase() - TAU * bp.frequency() * dt),
                };
                out.insert(time, Breakpoint::null(bp.frequency(), wrap_phase(phase)));
            }
        }
        out
    }
}

/// Parameters of `partial` at `time`, silent outside its span.
fn sounding_parameters(partial: &Partial, time: f64) -> Breakpoint {
    let mut bp = partial.parameters_at(time);
    if time < partial.start_time() || time > partial.end_time() {
        bp.set_amplitude(0.0);
    }
    bp
}

/// Weight at `time`, clamped to `[0, 1]`.
fn weight(envelope: &LinearEnvelope, time: f64) -> f64 {
    envelope.value_at(time).clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, w: f64) -> f64 {
    if w <= 0.0 {
        a
    } else if w >= 1.0 {
        b
    } else {
        a + (b - a) * w
    }
}

/// Maps each positive label to its partial, rejecting duplicates.
fn index_labels<'a>(
    which: &str,
    partials: &'a PartialList,
) -> EngineResult<BTreeMap<u32, &'a Partial>> {
    let mut map = BTreeMap::new();
    for p in partials.iter().filter(|p| p.label() != UNLABELED) {
        if map.insert(p.label(), p).is_some() {
            return Err(EngineError::config(
                which,
                format!(
                    "label {} appears more than once; distill the partials before morphing",
                    p.label()
                ),
            ));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(label: u32, points: &[(f64, f64, f64)]) -> Partial {
        let mut p = Partial::with_label(label);
        for &(t, f, a) in points {
            p.insert(t, Breakpoint::new(f, a, 0.1, 0.5));
        }
        p
    }

    fn list(partials: Vec<Partial>) -> PartialList {
        partials.into_iter().collect()
    }

    #[test]
    fn test_weight_zero_reproduces_source() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.5), (1.0, 210.0, 0.4)])]);
        let tgt = list(vec![partial(
            1,
            &[(0.0, 300.0, 0.1), (0.5, 320.0, 0.2), (1.0, 330.0, 0.3)],
        )]);
        let out = Morpher::new(LinearEnvelope::constant(0.0))
            .morph(&src, &tgt)
            .unwrap();
        let m = out.get(0).unwrap();
        let s = src.get(0).unwrap();
        for (t, bp) in m.iter() {
            assert_eq!(*bp, s.parameters_at(t), "time {}", t);
        }
    }

    #[test]
    fn test_weight_zero_silences_after_shorter_source() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.4), (0.5, 200.0, 0.4)])]);
        let tgt = list(vec![partial(1, &[(0.0, 300.0, 0.3), (1.0, 300.0, 0.3)])]);
        let out = Morpher::new(LinearEnvelope::constant(0.0))
            .morph(&src, &tgt)
            .unwrap();
        let m = out.get(0).unwrap();

        assert_eq!(m.amplitude_at(0.25), 0.4);
        assert_eq!(m.amplitude_at(0.5), 0.4);
        assert_eq!(m.amplitude_at(0.5 + 2.0 * Partial::SHORTEST_SAFE_FADE_TIME), 0.0);
        assert_eq!(m.amplitude_at(0.9), 0.0);
        assert_eq!(m.frequency_at(0.9), 200.0);
    }

    #[test]
    fn test_weight_one_silences_before_later_target() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.4), (1.0, 200.0, 0.4)])]);
        let tgt = list(vec![partial(1, &[(0.4, 300.0, 0.3), (1.0, 300.0, 0.3)])]);
        let out = Morpher::new(LinearEnvelope::constant(1.0))
            .morph(&src, &tgt)
            .unwrap();
        let m = out.get(0).unwrap();

        assert_eq!(m.amplitude_at(0.2), 0.0);
        assert_eq!(m.amplitude_at(0.4), 0.3);
        assert_eq!(m.amplitude_at(0.7), 0.3);
    }

    #[test]
    fn test_midpoint_against_silent_partner_is_quiet() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.4), (0.5, 200.0, 0.4)])]);
        let tgt = list(vec![partial(1, &[(0.0, 300.0, 0.4), (1.0, 300.0, 0.4)])]);
        let morpher = Morpher::new(LinearEnvelope::constant(0.5));
        let m = morpher.morph(&src, &tgt).unwrap().get(0).unwrap().clone();

        let shape = morpher.amp_shape();
        let expected = (shape * (0.4 + shape)).sqrt() - shape;
        assert!((m.amplitude_at(0.8) - expected).abs() < 1e-12);
        assert!(m.amplitude_at(0.8) < 0.01);
    }

    #[test]
    fn test_weight_one_reproduces_target() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.5), (1.0, 210.0, 0.4)])]);
        let tgt = list(vec![partial(1, &[(0.0, 300.0, 0.1), (1.0, 330.0, 0.3)])]);
        let out = Morpher::new(LinearEnvelope::constant(1.0))
            .morph(&src, &tgt)
            .unwrap();
        assert_eq!(out.get(0).unwrap(), tgt.get(0).unwrap());
    }

    #[test]
    fn test_midpoint_interpolation() {
        let src = list(vec![partial(2, &[(0.0, 200.0, 0.1), (1.0, 200.0, 0.1)])]);
        let tgt = list(vec![partial(2, &[(0.0, 400.0, 0.4), (1.0, 400.0, 0.4)])]);
        let morpher = Morpher::new(LinearEnvelope::constant(0.5));
        let out = morpher.morph(&src, &tgt).unwrap();
        let m = out.get(0).unwrap();
        assert_eq!(m.label(), 2);
        assert!((m.frequency_at(0.5) - 300.0).abs() < 1e-9);
        // Log-domain midpoint is close to the geometric mean.
        let shape = morpher.amp_shape();
        let expected = ((0.1 + shape) * (0.4 + shape)).sqrt() - shape;
        assert!((m.amplitude_at(0.5) - expected).abs() < 1e-12);
        assert!((m.amplitude_at(0.5) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_weight_is_clamped() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.5), (1.0, 200.0, 0.5)])]);
        let tgt = list(vec![partial(1, &[(0.0, 300.0, 0.2), (1.0, 300.0, 0.2)])]);
        let out = Morpher::new(LinearEnvelope::constant(3.0))
            .morph(&src, &tgt)
            .unwrap();
        assert_eq!(out.get(0).unwrap().frequency_at(0.5), 300.0);
    }

    #[test]
    fn test_unpaired_labels_fade() {
        let src = list(vec![partial(1, &[(0.0, 200.0, 0.5), (1.0, 200.0, 0.5)])]);
        let tgt = list(vec![partial(2, &[(0.0, 400.0, 0.5), (1.0, 400.0, 0.5)])]);
        let mut weight = LinearEnvelope::new();
        weight.insert_breakpoint(0.0, 0.0);
        weight.insert_breakpoint(1.0, 1.0);
        let out = Morpher::new(weight).morph(&src, &tgt).unwrap();

        assert_eq!(out.len(), 2);
        let fading_out = out.get(0).unwrap();
        let fading_in = out.get(1).unwrap();
        assert_eq!(fading_out.label(), 1);
        assert_eq!(fading_in.label(), 2);
        assert_eq!(fading_out.amplitude_at(0.0), 0.5);
        assert_eq!(fading_out.amplitude_at(1.0), 0.0);
        assert_eq!(fading_in.amplitude_at(0.0), 0.0);
        assert_eq!(fading_in.amplitude_at(1.0), 0.5);
    }

    #[test]
    fn test_unpaired_partials_get_null_edges() {
        let src = list(vec![partial(5, &[(0.0, 200.0, 0.5), (1.0, 200.0, 0.5)])]);
        let tgt = list(vec![partial(6, &[(0.2, 300.0, 0.5), (0.8, 300.0, 0.5)])]);
        let out = Morpher::new(LinearEnvelope::constant(0.5))
            .morph(&src, &tgt)
            .unwrap();
        let closed = out.get(0).unwrap();
        let opened = out.get(1).unwrap();
        assert_eq!(closed.len(), 3);
        assert_eq!(closed.last().unwrap().1.amplitude(), 0.0);
        assert_eq!(opened.len(), 3);
        assert_eq!(opened.first().unwrap().1.amplitude(), 0.0);
    }

    #[test]
    fn test_unlabeled_are_crossfaded_after_labeled() {
        let src = list(vec![
            partial(0, &[(0.0, 100.0, 0.4), (1.0, 100.0, 0.4)]),
            partial(1, &[(0.0, 200.0, 0.5), (1.0, 200.0, 0.5)]),
        ]);
        let tgt = list(vec![
            partial(1, &[(0.0, 220.0, 0.5), (1.0, 220.0, 0.5)]),
            partial(0, &[(0.0, 900.0, 0.2), (1.0, 900.0, 0.2)]),
        ]);
        let out = Morpher::new(LinearEnvelope::constant(0.25))
            .morph(&src, &tgt)
            .unwrap();
        let labels: Vec<u32> = out.iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec![1, 0, 0]);
        assert!((out.get(1).unwrap().amplitude_at(0.5) - 0.3).abs() < 1e-12);
        assert!((out.get(2).unwrap().amplitude_at(0.5) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let src = list(vec![
            partial(1, &[(0.0, 200.0, 0.5), (0.4, 200.0, 0.5)]),
            partial(1, &[(0.6, 200.0, 0.5), (1.0, 200.0, 0.5)]),
        ]);
        let err = Morpher::new(LinearEnvelope::constant(0.5))
            .morph(&src, &PartialList::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_amp_shape_must_be_positive() {
        let morpher = Morpher::new(LinearEnvelope::constant(0.5));
        assert!(morpher.clone().with_amp_shape(0.0).unwrap_err().is_configuration());
        assert_eq!(morpher.with_amp_shape(1e-3).unwrap().amp_shape(), 1e-3);
    }
}
