//! Merging of same-label partials.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use partita_model::{wrap_phase, Breakpoint, Partial, PartialList, UNLABELED};
use tracing::{debug, warn};

use super::{PartialTransform, DEFAULT_FADE_TIME};
use crate::error::{require_non_negative, EngineResult};

/// Collapses all partials sharing a positive label into one partial.
///
/// A breakpoint survives only where its partial is the loudest of those
/// covering its time; the survivors are merged into a single partial. Where
/// the merged partial jumps across a silent gap longer than twice the fade
/// time, null breakpoints close the earlier segment and open the later one.
/// Unlabeled partials are left as they are. The output holds the distilled
/// partials in ascending label order followed by the unlabeled ones.
#[derive(Debug, Clone)]
pub struct Distiller {
    fade_time: f64,
}

impl Default for Distiller {
    fn default() -> Self {
        Self {
            fade_time: DEFAULT_FADE_TIME,
        }
    }
}

impl Distiller {
    pub fn new(fade_time: f64) -> EngineResult<Self> {
        require_non_negative("fade_time", fade_time)?;
        Ok(Self { fade_time })
    }

    pub fn fade_time(&self) -> f64 {
        self.fade_time
    }

    pub fn distill(&self, partials: &mut PartialList) {
        let before = partials.len();
        let mut groups: BTreeMap<u32, Vec<Partial>> = BTreeMap::new();
        let mut unlabeled = Vec::new();
        let mut dropped = 0usize;
        for partial in std::mem::take(partials) {
            if partial.label() == UNLABELED {
                unlabeled.push(partial);
            } else if partial.is_empty() {
                dropped += 1;
            } else {
                groups.entry(partial.label()).or_default().push(partial);
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped labeled partials with no breakpoints");
        }

        let channels = groups.len();
        for (label, group) in groups {
            partials.push(self.merge(label, &group));
        }
        partials.extend(unlabeled);

        debug!(
            before,
            after = partials.len(),
            channels,
            "distilled partials"
        );
    }

    /// Merges one label's partials.
    fn merge(&self, label: u32, group: &[Partial]) -> Partial {
        if group.len() == 1 {
            return group[0].clone();
        }

        // Surviving breakpoints tagged with their source partial.
        let mut kept: Vec<(f64, usize, Breakpoint)> = Vec::new();
        for (j, partial) in group.iter().enumerate() {
            for (t, bp) in partial.iter() {
                if is_loudest(group, j, t, bp.amplitude()) {
                    kept.push((t, j, *bp));
                }
            }
        }
        kept.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut merged = Partial::with_label(label);
        let mut prev: Option<(f64, usize, Breakpoint)> = None;
        for (t, j, bp) in kept {
            if let Some((pt, pj, pbp)) = prev {
                let gap = t - pt;
                let silent = pj != j && group[pj].end_time() < t && group[j].start_time() > pt;
                if silent && gap > 2.0 * self.fade_time {
                    let close =
                        wrap_phase(pbp.phase() + 2.0 * PI * pbp.frequency() * self.fade_time);
                    merged.insert(pt + self.fade_time, Breakpoint::null(pbp.frequency(), close));
                    let open = wrap_phase(bp.phase() - 2.0 * PI * bp.frequency() * self.fade_time);
                    merged.insert(t - self.fade_time, Breakpoint::null(bp.frequency(), open));
                }
            }
            merged.insert(t, bp);
            prev = Some((t, j, bp));
        }
        merged
    }
}

/// True when partial `j` is louder at `time` than every other partial of the
/// group that covers `time`. Equal amplitudes go to the earlier partial.
fn is_loudest(group: &[Partial], j: usize, time: f64, amplitude: f64) -> bool {
    group.iter().enumerate().all(|(k, other)| {
        if k == j || time < other.start_time() || time > other.end_time() {
            return true;
        }
        let a = other.amplitude_at(time);
        amplitude > a || (amplitude == a && j < k)
    })
}

impl PartialTransform for Distiller {
    fn name(&self) -> &'static str {
        "distill"
    }

    fn apply(&self, partials: &mut PartialList) -> EngineResult<()> {
        self.distill(partials);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(label: u32, f: f64, a: f64, t0: f64, t1: f64) -> Partial {
        let mut p = Partial::with_label(label);
        p.insert(t0, Breakpoint::new(f, a, 0.0, 0.0));
        p.insert(t1, Breakpoint::new(f, a, 0.0, 0.0));
        p
    }

    #[test]
    fn test_one_partial_per_label() {
        let mut partials: PartialList = vec![
            segment(2, 400.0, 0.2, 0.0, 0.5),
            segment(1, 200.0, 0.5, 0.0, 1.0),
            segment(2, 401.0, 0.3, 0.6, 1.0),
            segment(0, 999.0, 0.1, 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        Distiller::default().distill(&mut partials);

        let labels: Vec<u32> = partials.iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec![1, 2, 0]);
        let two = partials.get(1).unwrap();
        assert_eq!(two.start_time(), 0.0);
        assert_eq!(two.end_time(), 1.0);
    }

    #[test]
    fn test_overlap_keeps_louder() {
        let mut partials: PartialList = vec![
            segment(1, 200.0, 0.2, 0.0, 1.0),
            segment(1, 201.0, 0.8, 0.4, 0.6),
        ]
        .into_iter()
        .collect();
        Distiller::new(0.0).unwrap().distill(&mut partials);

        assert_eq!(partials.len(), 1);
        let p = partials.get(0).unwrap();
        // The quiet partial's breakpoints outside the overlap survive; the
        // loud partial's breakpoints win inside it.
        let times: Vec<f64> = p.iter().map(|(t, _)| t).collect();
        assert_eq!(times, vec![0.0, 0.4, 0.6, 1.0]);
        assert_eq!(p.amplitude_at(0.4), 0.8);
        assert_eq!(p.frequency_at(0.6), 201.0);
    }

    #[test]
    fn test_gap_gets_null_breakpoints() {
        let mut partials: PartialList = vec![
            segment(3, 600.0, 0.4, 0.0, 0.3),
            segment(3, 610.0, 0.4, 0.5, 0.8),
        ]
        .into_iter()
        .collect();
        Distiller::new(0.01).unwrap().distill(&mut partials);

        let p = partials.get(0).unwrap();
        assert_eq!(p.len(), 6);
        assert_eq!(p.amplitude_at(0.31), 0.0);
        assert_eq!(p.amplitude_at(0.49), 0.0);
        assert_eq!(p.amplitude_at(0.4), 0.0);
        assert_eq!(p.amplitude_at(0.5), 0.4);
    }

    #[test]
    fn test_short_gap_is_bridged() {
        let mut partials: PartialList = vec![
            segment(3, 600.0, 0.4, 0.0, 0.3),
            segment(3, 610.0, 0.4, 0.305, 0.8),
        ]
        .into_iter()
        .collect();
        Distiller::new(0.01).unwrap().distill(&mut partials);
        assert_eq!(partials.get(0).unwrap().len(), 4);
    }

    #[test]
    fn test_unlabeled_pass_through() {
        let mut partials: PartialList = vec![
            segment(0, 100.0, 0.1, 0.0, 1.0),
            segment(0, 150.0, 0.1, 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        let copy = partials.clone();
        Distiller::default().distill(&mut partials);
        assert_eq!(partials, copy);
    }

    #[test]
    fn test_negative_fade_is_rejected() {
        assert!(Distiller::new(-0.1).unwrap_err().is_configuration());
    }
}
