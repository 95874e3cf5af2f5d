//! A single time-varying sinusoidal component.
//!
//! A [`Partial`] owns an ordered sequence of `(time, Breakpoint)` pairs with
//! strictly increasing times. Parameter queries between breakpoints use
//! linear interpolation; queries outside the span clamp to the nearest
//! endpoint. Phase queries integrate the interpolated frequency instead of
//! interpolating stored phases, so that phase and frequency stay consistent.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::breakpoint::Breakpoint;

/// Label value meaning "not assigned to any channel".
pub const UNLABELED: u32 = 0;

/// Wraps a phase to `[-PI, PI)`.
pub fn wrap_phase(phase: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let wrapped = (phase + PI).rem_euclid(two_pi) - PI;
    // rem_euclid can round up to exactly 2*PI for tiny negative inputs.
    if wrapped >= PI {
        wrapped - two_pi
    } else {
        wrapped
    }
}

/// Time-ordered breakpoint trajectory with an integer label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PartialRecord", into = "PartialRecord")]
pub struct Partial {
    label: u32,
    breakpoints: Vec<(f64, Breakpoint)>,
}

/// Serialized form; breakpoints are re-sorted on load.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialRecord {
    #[serde(default)]
    label: u32,
    breakpoints: Vec<(f64, Breakpoint)>,
}

impl From<PartialRecord> for Partial {
    fn from(record: PartialRecord) -> Self {
        let mut partial: Partial = record.breakpoints.into_iter().collect();
        partial.label = record.label;
        partial
    }
}

impl From<Partial> for PartialRecord {
    fn from(partial: Partial) -> Self {
        Self {
            label: partial.label,
            breakpoints: partial.breakpoints,
        }
    }
}

/// Where a query time falls relative to the breakpoints.
#[derive(Debug, Clone, Copy)]
enum Bracket {
    Empty,
    Before,
    /// `t_i <= t < t_{i+1}`.
    Inside(usize),
    After,
}

impl Partial {
    /// Minimum spacing used when inserting null breakpoints next to existing
    /// ones, in seconds.
    pub const SHORTEST_SAFE_FADE_TIME: f64 = 1.0e-9;

    /// Creates an empty, unlabeled partial.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty partial with the given label.
    pub fn with_label(label: u32) -> Self {
        Self {
            label,
            breakpoints: Vec::new(),
        }
    }

    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn set_label(&mut self, label: u32) {
        self.label = label;
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Inserts a breakpoint, keeping times strictly increasing.
    ///
    /// A breakpoint already stored at exactly `time` is replaced.
    pub fn insert(&mut self, time: f64, breakpoint: Breakpoint) {
        // Normalizes -0.0 so that it collides with 0.0.
        let time = time + 0.0;
        match self
            .breakpoints
            .binary_search_by(|(t, _)| t.total_cmp(&time))
        {
            Ok(idx) => self.breakpoints[idx].1 = breakpoint,
            Err(idx) => self.breakpoints.insert(idx, (time, breakpoint)),
        }
    }

    /// Time of the first breakpoint, or 0 for an empty partial.
    pub fn start_time(&self) -> f64 {
        self.breakpoints.first().map(|(t, _)| *t).unwrap_or(0.0)
    }

    /// Time of the last breakpoint, or 0 for an empty partial.
    pub fn end_time(&self) -> f64 {
        self.breakpoints.last().map(|(t, _)| *t).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    pub fn first(&self) -> Option<(f64, &Breakpoint)> {
        self.breakpoints.first().map(|(t, bp)| (*t, bp))
    }

    pub fn last(&self) -> Option<(f64, &Breakpoint)> {
        self.breakpoints.last().map(|(t, bp)| (*t, bp))
    }

    /// Iterates `(time, breakpoint)` pairs in time order.
    ///
    /// The iterator borrows the partial; call `iter` again (or clone the
    /// iterator) to restart.
    pub fn iter(&self) -> Breakpoints<'_> {
        Breakpoints {
            inner: self.breakpoints.iter(),
        }
    }

    /// Iterates breakpoints mutably. Times are not editable through this.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (f64, &mut Breakpoint)> + '_ {
        self.breakpoints.iter_mut().map(|(t, bp)| (*t, bp))
    }

    fn bracket(&self, time: f64) -> Bracket {
        if self.breakpoints.is_empty() {
            return Bracket::Empty;
        }
        let at_or_before = self.breakpoints.partition_point(|(t, _)| *t <= time);
        if at_or_before == 0 {
            Bracket::Before
        } else if at_or_before == self.breakpoints.len() {
            Bracket::After
        } else {
            Bracket::Inside(at_or_before - 1)
        }
    }

    fn interpolate(&self, time: f64, field: impl Fn(&Breakpoint) -> f64) -> f64 {
        match self.bracket(time) {
            Bracket::Empty => 0.0,
            Bracket::Before => field(&self.breakpoints[0].1),
            Bracket::After => field(&self.breakpoints[self.breakpoints.len() - 1].1),
            Bracket::Inside(i) => {
                let (t0, ref b0) = self.breakpoints[i];
                let (t1, ref b1) = self.breakpoints[i + 1];
                let alpha = (time - t0) / (t1 - t0);
                let v0 = field(b0);
                v0 + (field(b1) - v0) * alpha
            }
        }
    }

    pub fn frequency_at(&self, time: f64) -> f64 {
        self.interpolate(time, Breakpoint::frequency)
    }

    pub fn amplitude_at(&self, time: f64) -> f64 {
        self.interpolate(time, Breakpoint::amplitude)
    }

    pub fn bandwidth_at(&self, time: f64) -> f64 {
        self.interpolate(time, Breakpoint::bandwidth)
    }

    /// Phase at `time`, wrapped to `[-PI, PI)`.
    ///
    /// Integrates the linearly interpolated frequency from the breakpoint at
    /// or before `time`. Before the first breakpoint the first frequency is
    /// integrated backwards; after the last, the last frequency forwards.
    pub fn phase_at(&self, time: f64) -> f64 {
        let phase = match self.bracket(time) {
            Bracket::Empty => 0.0,
            Bracket::Before => {
                let (t0, ref b0) = self.breakpoints[0];
                b0.phase() + 2.0 * PI * b0.frequency() * (time - t0)
            }
            Bracket::After => {
                let (tn, ref bn) = self.breakpoints[self.breakpoints.len() - 1];
                bn.phase() + 2.0 * PI * bn.frequency() * (time - tn)
            }
            Bracket::Inside(i) => {
                let (t0, ref b0) = self.breakpoints[i];
                let (t1, ref b1) = self.breakpoints[i + 1];
                integrate_phase(b0.phase(), b0.frequency(), b1.frequency(), t1 - t0, time - t0)
            }
        };
        wrap_phase(phase)
    }

    /// All parameters at `time` from a single search.
    pub fn parameters_at(&self, time: f64) -> Breakpoint {
        match self.bracket(time) {
            Bracket::Empty => Breakpoint::default(),
            Bracket::Before | Bracket::After => {
                Breakpoint::new(
                    self.frequency_at(time),
                    self.amplitude_at(time),
                    self.bandwidth_at(time),
                    self.phase_at(time),
                )
            }
            Bracket::Inside(i) => {
                let (t0, ref b0) = self.breakpoints[i];
                let (t1, ref b1) = self.breakpoints[i + 1];
                let dt = t1 - t0;
                let tau = time - t0;
                let alpha = tau / dt;
                let lerp = |a: f64, b: f64| a + (b - a) * alpha;
                Breakpoint::new(
                    lerp(b0.frequency(), b1.frequency()),
                    lerp(b0.amplitude(), b1.amplitude()),
                    lerp(b0.bandwidth(), b1.bandwidth()),
                    wrap_phase(integrate_phase(
                        b0.phase(),
                        b0.frequency(),
                        b1.frequency(),
                        dt,
                        tau,
                    )),
                )
            }
        }
    }

    /// Removes every breakpoint strictly earlier than `time`.
    pub fn remove_before(&mut self, time: f64) {
        let cut = self.breakpoints.partition_point(|(t, _)| *t < time);
        self.breakpoints.drain(..cut);
    }

    /// Removes every breakpoint strictly later than `time`.
    pub fn remove_after(&mut self, time: f64) {
        let keep = self.breakpoints.partition_point(|(t, _)| *t <= time);
        self.breakpoints.truncate(keep);
    }

    /// Replaces every breakpoint time with `warp(time)`.
    ///
    /// `warp` should be increasing. Times that collapse onto each other keep
    /// the later breakpoint.
    pub fn map_times(&mut self, mut warp: impl FnMut(f64) -> f64) {
        let old = std::mem::take(&mut self.breakpoints);
        for (t, bp) in old {
            self.insert(warp(t), bp);
        }
    }

    /// Largest breakpoint amplitude, 0 for an empty partial.
    pub fn peak_amplitude(&self) -> f64 {
        self.breakpoints
            .iter()
            .map(|(_, bp)| bp.amplitude())
            .fold(0.0, f64::max)
    }

    /// Arithmetic mean of breakpoint amplitudes, 0 for an empty partial.
    pub fn mean_amplitude(&self) -> f64 {
        if self.breakpoints.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.breakpoints.iter().map(|(_, bp)| bp.amplitude()).sum();
        sum / self.breakpoints.len() as f64
    }

    /// True if every time and parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.breakpoints
            .iter()
            .all(|(t, bp)| t.is_finite() && bp.is_finite())
    }
}

/// Phase reached after `tau` seconds from `phase0`, with frequency moving
/// linearly from `f0` to `f1` over `dt` seconds.
fn integrate_phase(phase0: f64, f0: f64, f1: f64, dt: f64, tau: f64) -> f64 {
    let slope = if dt > 0.0 { (f1 - f0) / dt } else { 0.0 };
    phase0 + 2.0 * PI * (f0 * tau + 0.5 * slope * tau * tau)
}

impl FromIterator<(f64, Breakpoint)> for Partial {
    fn from_iter<I: IntoIterator<Item = (f64, Breakpoint)>>(iter: I) -> Self {
        let mut partial = Partial::new();
        for (t, bp) in iter {
            partial.insert(t, bp);
        }
        partial
    }
}

impl<'a> IntoIterator for &'a Partial {
    type Item = (f64, &'a Breakpoint);
    type IntoIter = Breakpoints<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a partial's breakpoints.
#[derive(Debug, Clone)]
pub struct Breakpoints<'a> {
    inner: std::slice::Iter<'a, (f64, Breakpoint)>,
}

impl<'a> Iterator for Breakpoints<'a> {
    type Item = (f64, &'a Breakpoint);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(t, bp)| (*t, bp))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Breakpoints<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(t, bp)| (*t, bp))
    }
}

impl ExactSizeIterator for Breakpoints<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ramp() -> Partial {
        let mut p = Partial::with_label(3);
        p.insert(0.0, Breakpoint::new(100.0, 0.2, 0.0, 0.0));
        p.insert(1.0, Breakpoint::new(200.0, 0.6, 0.5, 0.0));
        p
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    #[test]
    fn test_insert_keeps_order() {
        let mut p = Partial::new();
        p.insert(0.5, Breakpoint::new(1.0, 0.0, 0.0, 0.0));
        p.insert(0.1, Breakpoint::new(2.0, 0.0, 0.0, 0.0));
        p.insert(0.3, Breakpoint::new(3.0, 0.0, 0.0, 0.0));
        let times: Vec<f64> = p.iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![0.1, 0.3, 0.5]);
    }

    #[test]
    fn test_insert_same_time_replaces() {
        let mut p = Partial::new();
        p.insert(0.5, Breakpoint::new(1.0, 0.1, 0.0, 0.0));
        p.insert(0.5, Breakpoint::new(2.0, 0.2, 0.0, 0.0));
        assert_eq!(p.len(), 1);
        assert_eq!(p.frequency_at(0.5), 2.0);
    }

    #[test]
    fn test_negative_zero_collides_with_zero() {
        let mut p = Partial::new();
        p.insert(0.0, Breakpoint::new(1.0, 0.1, 0.0, 0.0));
        p.insert(-0.0, Breakpoint::new(2.0, 0.1, 0.0, 0.0));
        assert_eq!(p.len(), 1);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[test]
    fn test_empty_partial_queries() {
        let p = Partial::new();
        assert_eq!(p.start_time(), 0.0);
        assert_eq!(p.end_time(), 0.0);
        assert_eq!(p.duration(), 0.0);
        assert_eq!(p.amplitude_at(1.0), 0.0);
        assert_eq!(p.phase_at(1.0), 0.0);
        assert_eq!(p.parameters_at(0.3), Breakpoint::default());
        assert!(p.first().is_none());
    }

    #[test]
    fn test_interpolation_midpoint() {
        let p = ramp();
        assert!((p.frequency_at(0.5) - 150.0).abs() < 1e-12);
        assert!((p.amplitude_at(0.5) - 0.4).abs() < 1e-12);
        assert!((p.bandwidth_at(0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_endpoints_are_exact() {
        let p = ramp();
        assert_eq!(p.amplitude_at(p.start_time()), 0.2);
        assert_eq!(p.amplitude_at(p.end_time()), 0.6);
        assert_eq!(p.frequency_at(1.0), 200.0);
    }

    #[test]
    fn test_queries_clamp_outside_span() {
        let p = ramp();
        assert_eq!(p.frequency_at(-3.0), 100.0);
        assert_eq!(p.amplitude_at(10.0), 0.6);
        assert_eq!(p.bandwidth_at(10.0), 0.5);
    }

    #[test]
    fn test_phase_integrates_linear_frequency() {
        let p = ramp();
        // Integral of 100 + 100 t over [0, 0.25] is 25 + 3.125 cycles.
        let expected = wrap_phase(2.0 * PI * 28.125);
        assert!((p.phase_at(0.25) - expected).abs() < 1e-9);
        assert!((expected - PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_phase_extrapolates_outside_span() {
        let mut p = Partial::new();
        p.insert(1.0, Breakpoint::new(10.0, 1.0, 0.0, 0.0));
        p.insert(2.0, Breakpoint::new(10.0, 1.0, 0.0, 0.0));
        // A quarter cycle before the start.
        let expected = wrap_phase(-PI / 2.0);
        assert!((p.phase_at(0.975) - expected).abs() < 1e-9);
        assert!((p.phase_at(2.025) - wrap_phase(PI / 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_parameters_at_matches_individual_queries() {
        let p = ramp();
        for &t in &[-0.5, 0.0, 0.25, 0.8, 1.0, 2.0] {
            let bp = p.parameters_at(t);
            assert!((bp.frequency() - p.frequency_at(t)).abs() < 1e-12);
            assert!((bp.amplitude() - p.amplitude_at(t)).abs() < 1e-12);
            assert!((bp.bandwidth() - p.bandwidth_at(t)).abs() < 1e-12);
            assert!((bp.phase() - p.phase_at(t)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_wrap_phase_range() {
        for &x in &[-10.0, -PI, 0.0, PI, 3.0 * PI, 1e6] {
            let w = wrap_phase(x);
            assert!((-PI..PI).contains(&w), "{x} wrapped to {w}");
        }
        assert_eq!(wrap_phase(PI), -PI);
    }

    // ========================================================================
    // Editing
    // ========================================================================

    #[test]
    fn test_iterator_restarts() {
        let p = ramp();
        let first: Vec<f64> = p.iter().map(|(t, _)| t).collect();
        let second: Vec<f64> = p.iter().map(|(t, _)| t).collect();
        assert_eq!(first, second);
        assert_eq!(p.iter().len(), 2);
    }

    #[test]
    fn test_iter_mut_edits_parameters() {
        let mut p = ramp();
        for (_, bp) in p.iter_mut() {
            bp.set_amplitude(1.0);
        }
        assert_eq!(p.peak_amplitude(), 1.0);
    }

    #[test]
    fn test_remove_before_and_after() {
        let mut p: Partial = (0..10)
            .map(|i| (i as f64 * 0.1, Breakpoint::new(100.0, 0.1, 0.0, 0.0)))
            .collect();
        p.remove_before(0.25);
        p.remove_after(0.65);
        let times: Vec<f64> = p.iter().map(|(t, _)| t).collect();
        assert_eq!(times.len(), 4);
        assert!((p.start_time() - 0.3).abs() < 1e-12);
        assert!((p.end_time() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_map_times_scales() {
        let mut p = ramp();
        p.map_times(|t| 2.0 * t + 1.0);
        assert_eq!(p.start_time(), 1.0);
        assert_eq!(p.end_time(), 3.0);
        assert_eq!(p.label(), 3);
    }

    #[test]
    fn test_deserialize_restores_order() {
        let json = concat!(
            r#"{"label":2,"breakpoints":["#,
            r#"[1.0,{"frequency":1.0,"amplitude":0.1,"bandwidth":0.0,"phase":0.0}],"#,
            r#"[0.5,{"frequency":2.0,"amplitude":0.1,"bandwidth":0.0,"phase":0.0}]]}"#,
        );
        let p: Partial = serde_json::from_str(json).unwrap();
        assert_eq!(p.label(), 2);
        assert_eq!(p.start_time(), 0.5);
        let back: Partial = serde_json::from_str(&serde_json::to_string(&p).unwrap()).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_mean_amplitude() {
        let p = ramp();
        assert!((p.mean_amplitude() - 0.4).abs() < 1e-12);
        assert_eq!(Partial::new().mean_amplitude(), 0.0);
    }
}
