//! Parallel spectral frames feeding a sequential tracker.
//!
//! Worker threads each take every `n`-th frame, extract its peaks, and send
//! them over a bounded channel. The consumer buffers out-of-order frames and
//! hands them on strictly in frame order, so tracking is identical for any
//! number of workers.

use std::collections::BTreeMap;

use crossbeam_channel::bounded;
use tracing::debug;

use super::spectrum::{FrameAnalyzer, PeakCriteria, SpectralPeak};
use super::window::KaiserWindow;

/// Frame layout over a sample buffer.
#[derive(Debug, Clone, Copy)]
pub struct FramePlan {
    /// Samples between frame centers.
    pub hop: usize,
    /// Number of frames; frame `i` is centered on sample `i * hop`.
    pub count: usize,
}

impl FramePlan {
    pub fn new(len: usize, hop: usize) -> Self {
        let hop = hop.max(1);
        Self {
            hop,
            count: len.div_ceil(hop),
        }
    }

    pub fn center(&self, frame: usize) -> usize {
        frame * self.hop
    }
}

/// Computes peaks for every frame and calls `consume(frame_index, peaks)`
/// in ascending frame order.
pub fn for_each_frame(
    samples: &[f64],
    sample_rate: f64,
    window: &KaiserWindow,
    criteria: &PeakCriteria,
    plan: FramePlan,
    threads: usize,
    mut consume: impl FnMut(usize, Vec<SpectralPeak>),
) {
    let threads = threads.clamp(1, plan.count.max(1));

    if threads == 1 {
        let mut analyzer = FrameAnalyzer::new(window, sample_rate);
        for i in 0..plan.count {
            consume(i, analyzer.analyze(samples, plan.center(i), criteria));
        }
        return;
    }

    let (tx, rx) = bounded::<(usize, Vec<SpectralPeak>)>(threads * 4);
    std::thread::scope(|scope| {
        for worker in 0..threads {
            let tx = tx.clone();
            scope.spawn(move || {
                let mut analyzer = FrameAnalyzer::new(window, sample_rate);
                for i in (worker..plan.count).step_by(threads) {
                    let peaks = analyzer.analyze(samples, plan.center(i), criteria);
                    if tx.send((i, peaks)).is_err() {
                        break;
                    }
                }
            });
        }
        // Workers hold the remaining senders; the loop ends when they finish.
        drop(tx);

        let mut pending: BTreeMap<usize, Vec<SpectralPeak>> = BTreeMap::new();
        let mut next = 0usize;
        for (i, peaks) in rx.iter() {
            pending.insert(i, peaks);
            while let Some(peaks) = pending.remove(&next) {
                consume(next, peaks);
                next += 1;
            }
        }
        debug!(threads, frames = next, "spectral workers finished");
    });
}
