//! Frame-to-frame partial tracking.
//!
//! Peaks from consecutive frames are linked into partials by greedy
//! nearest-frequency matching. Candidate (partial, peak) pairs within the
//! allowed drift are ranked by frequency distance; equal distances fall back
//! to amplitude distance, then to the louder peak, then to the older partial,
//! so the result does not depend on iteration order.

use std::cmp::Ordering;

use partita_model::{Breakpoint, Partial};
use tracing::trace;

use super::spectrum::SpectralPeak;

/// A partial that may still be extended.
#[derive(Debug)]
struct Track {
    id: u64,
    partial: Partial,
    last_frequency: f64,
    last_amplitude: f64,
    missed: usize,
}

/// Links per-frame peaks into partials. Frames must be fed in time order.
#[derive(Debug)]
pub struct PartialTracker {
    freq_drift: f64,
    max_gap_frames: usize,
    active: Vec<Track>,
    finished: Vec<(u64, Partial)>,
    next_id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    amp_distance: f64,
    peak_amplitude: f64,
    track: usize,
    peak: usize,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.amp_distance.total_cmp(&other.amp_distance))
            .then(other.peak_amplitude.total_cmp(&self.peak_amplitude))
            .then(self.track.cmp(&other.track))
            .then(self.peak.cmp(&other.peak))
    }
}

impl PartialTracker {
    pub fn new(freq_drift: f64, max_gap_frames: usize) -> Self {
        Self {
            freq_drift,
            max_gap_frames,
            active: Vec::new(),
            finished: Vec::new(),
            next_id: 0,
        }
    }

    /// Number of partials still open.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Consumes the peaks of the frame at `time`.
    pub fn advance(&mut self, time: f64, peaks: &[SpectralPeak]) {
        let mut candidates = Vec::new();
        for (t, track) in self.active.iter().enumerate() {
            for (p, peak) in peaks.iter().enumerate() {
                let distance = (peak.frequency - track.last_frequency).abs();
                if distance <= self.freq_drift {
                    candidates.push(Candidate {
                        distance,
                        amp_distance: (peak.amplitude - track.last_amplitude).abs(),
                        peak_amplitude: peak.amplitude,
                        track: t,
                        peak: p,
                    });
                }
            }
        }
        candidates.sort_by(Candidate::rank);

        let mut track_used = vec![false; self.active.len()];
        let mut peak_used = vec![false; peaks.len()];
        for c in candidates {
            if track_used[c.track] || peak_used[c.peak] {
                continue;
            }
            track_used[c.track] = true;
            peak_used[c.peak] = true;
            let track = &mut self.active[c.track];
            extend(track, time, &peaks[c.peak]);
        }

        // Retire tracks that have gone unmatched for too long.
        let mut kept = Vec::with_capacity(self.active.len());
        for (mut track, used) in self.active.drain(..).zip(track_used) {
            if !used {
                track.missed += 1;
            }
            if track.missed > self.max_gap_frames {
                self.finished.push((track.id, track.partial));
            } else {
                kept.push(track);
            }
        }
        self.active = kept;

        let mut born = 0usize;
        for (peak, used) in peaks.iter().zip(peak_used) {
            if used {
                continue;
            }
            let mut track = Track {
                id: self.next_id,
                partial: Partial::new(),
                last_frequency: peak.frequency,
                last_amplitude: peak.amplitude,
                missed: 0,
            };
            self.next_id += 1;
            extend(&mut track, time, peak);
            self.active.push(track);
            born += 1;
        }

        trace!(
            time,
            peaks = peaks.len(),
            born,
            active = self.active.len(),
            "tracked frame"
        );
    }

    /// Closes every open partial and returns all partials in creation order.
    pub fn finish(mut self) -> Vec<Partial> {
        for track in self.active.drain(..) {
            self.finished.push((track.id, track.partial));
        }
        self.finished.sort_by_key(|(id, _)| *id);
        self.finished.into_iter().map(|(_, p)| p).collect()
    }
}

fn extend(track: &mut Track, time: f64, peak: &SpectralPeak) {
    track.partial.insert(
        time,
        Breakpoint::new(peak.frequency, peak.amplitude, peak.bandwidth, peak.phase),
    );
    track.last_frequency = peak.frequency;
    track.last_amplitude = peak.amplitude;
    track.missed = 0;
}
