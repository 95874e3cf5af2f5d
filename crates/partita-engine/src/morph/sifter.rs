//! Removal of competing partials within a label.

use std::collections::BTreeMap;

use partita_model::{PartialList, UNLABELED};
use tracing::debug;

use super::{PartialTransform, DEFAULT_FADE_TIME};
use crate::error::{require_non_negative, EngineResult};

/// Ensures at most one partial per label is sounding at any time.
///
/// Within each positive label, partials are visited from the most to the
/// least salient (highest mean amplitude; then longest; then earliest in the
/// list). A partial whose span, widened by the fade time on both sides,
/// overlaps a partial already kept for that label loses its label.
#[derive(Debug, Clone)]
pub struct Sifter {
    fade_time: f64,
}

impl Default for Sifter {
    fn default() -> Self {
        Self {
            fade_time: DEFAULT_FADE_TIME,
        }
    }
}

impl Sifter {
    pub fn new(fade_time: f64) -> EngineResult<Self> {
        require_non_negative("fade_time", fade_time)?;
        Ok(Self { fade_time })
    }

    pub fn sift(&self, partials: &mut PartialList) {
        let mut by_label: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, partial) in partials.iter().enumerate() {
            if partial.label() != UNLABELED && !partial.is_empty() {
                by_label.entry(partial.label()).or_default().push(i);
            }
        }

        let mut rejected = vec![false; partials.len()];
        let mut relabeled = 0usize;
        for indices in by_label.values() {
            let mut ranked: Vec<(f64, f64, usize)> = indices
                .iter()
                .map(|&i| {
                    let p = &partials.as_slice()[i];
                    (p.mean_amplitude(), p.duration(), i)
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.0.total_cmp(&a.0)
                    .then(b.1.total_cmp(&a.1))
                    .then(a.2.cmp(&b.2))
            });

            let mut kept: Vec<(f64, f64)> = Vec::new();
            for &(_, _, i) in &ranked {
                let p = &partials.as_slice()[i];
                let span = (p.start_time() - self.fade_time, p.end_time() + self.fade_time);
                if kept.iter().any(|k| overlaps(*k, span)) {
                    rejected[i] = true;
                    relabeled += 1;
                } else {
                    kept.push(span);
                }
            }
        }

        for (partial, &reject) in partials.iter_mut().zip(&rejected) {
            if reject {
                partial.set_label(UNLABELED);
            }
        }
        debug!(
            partials = partials.len(),
            relabeled,
            "sifted partials"
        );
    }
}

fn overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

impl PartialTransform for Sifter {
    fn name(&self) -> &'static str {
        "sift"
    }

    fn apply(&self, partials: &mut PartialList) -> EngineResult<()> {
        self.sift(partials);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partita_model::{Breakpoint, Partial};

    fn segment(label: u32, a: f64, t0: f64, t1: f64) -> Partial {
        let mut p = Partial::with_label(label);
        p.insert(t0, Breakpoint::new(300.0, a, 0.0, 0.0));
        p.insert(t1, Breakpoint::new(300.0, a, 0.0, 0.0));
        p
    }

    fn labels(partials: &PartialList) -> Vec<u32> {
        partials.iter().map(|p| p.label()).collect()
    }

    #[test]
    fn test_quieter_overlapping_partial_is_unlabeled() {
        let mut partials: PartialList = vec![
            segment(1, 0.1, 0.0, 0.6),
            segment(1, 0.5, 0.4, 1.0),
            segment(2, 0.1, 0.0, 1.0),
        ]
        .into_iter()
        .collect();
        Sifter::default().sift(&mut partials);
        assert_eq!(labels(&partials), vec![0, 1, 2]);
    }

    #[test]
    fn test_disjoint_partials_keep_label() {
        let mut partials: PartialList = vec![segment(1, 0.1, 0.0, 0.4), segment(1, 0.5, 0.5, 1.0)]
            .into_iter()
            .collect();
        Sifter::default().sift(&mut partials);
        assert_eq!(labels(&partials), vec![1, 1]);
    }

    #[test]
    fn test_fade_time_widens_spans() {
        let mut partials: PartialList = vec![segment(1, 0.1, 0.0, 0.4), segment(1, 0.5, 0.5, 1.0)]
            .into_iter()
            .collect();
        Sifter::new(0.06).unwrap().sift(&mut partials);
        assert_eq!(labels(&partials), vec![0, 1]);
        Sifter::new(0.0).unwrap().sift(&mut partials);
        assert_eq!(labels(&partials), vec![0, 1]);
    }

    #[test]
    fn test_equal_amplitude_prefers_longer() {
        let mut partials: PartialList = vec![segment(4, 0.3, 0.0, 0.5), segment(4, 0.3, 0.2, 1.0)]
            .into_iter()
            .collect();
        Sifter::default().sift(&mut partials);
        assert_eq!(labels(&partials), vec![0, 4]);
    }

    #[test]
    fn test_many_fragments_of_one_label() {
        // Loud fragments every 10 ms, each overlapped by a quiet one.
        let mut partials: PartialList = (0..2000)
            .map(|i| {
                let t = (i / 2) as f64 * 0.01;
                if i % 2 == 0 {
                    segment(1, 0.5, t, t + 0.004)
                } else {
                    segment(1, 0.1, t + 0.002, t + 0.006)
                }
            })
            .collect();
        Sifter::new(0.0).unwrap().sift(&mut partials);

        let kept: Vec<usize> = (0..partials.len())
            .filter(|&i| partials.get(i).unwrap().label() == 1)
            .collect();
        assert_eq!(kept.len(), 1000);
        assert!(kept.iter().all(|i| i % 2 == 0));
    }

    #[test]
    fn test_unlabeled_untouched() {
        let mut partials: PartialList = vec![segment(0, 0.1, 0.0, 1.0), segment(0, 0.5, 0.0, 1.0)]
            .into_iter()
            .collect();
        Sifter::default().sift(&mut partials);
        assert_eq!(labels(&partials), vec![0, 0]);
    }
}
