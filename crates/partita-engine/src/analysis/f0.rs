//! Fundamental frequency estimation from partials.
//!
//! At regular times, every sounding partial votes for candidate fundamentals
//! with its amplitude as weight. A candidate scores well when each voting
//! frequency is close to one of its harmonics:
//!
//! ```text
//! score(f0) = sum_i a_i * cos(2 pi f_i / f0) / sum_i a_i
//! ```
//!
//! The score is 1 at the true fundamental and at all of its subharmonics, so
//! among near-best candidates the highest frequency is chosen.

use std::f64::consts::PI;

use partita_model::{LinearEnvelope, PartialList};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{require_positive, EngineError, EngineResult};

/// Default minimum score for an estimate to be kept.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;
/// Default highest partial frequency that takes part in the vote (Hz).
pub const DEFAULT_MAX_PARTIAL_FREQ: f64 = 5000.0;

/// Score difference within which a higher candidate beats a lower one.
const TIE_TOLERANCE: f64 = 0.01;
/// Cap on candidate grid size per estimate.
const MAX_GRID_POINTS: usize = 20_000;
const REFINE_ITERATIONS: usize = 48;

/// Fundamental frequency estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundamentalEstimator {
    /// Lowest admissible fundamental (Hz).
    pub min_freq: f64,
    /// Highest admissible fundamental (Hz).
    pub max_freq: f64,
    /// Seconds between estimates.
    pub interval: f64,
    /// Estimates scoring below this are omitted.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Partials above this frequency do not vote (Hz).
    #[serde(default = "default_max_partial_freq")]
    pub max_partial_freq: f64,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn default_max_partial_freq() -> f64 {
    DEFAULT_MAX_PARTIAL_FREQ
}

impl FundamentalEstimator {
    pub fn new(min_freq: f64, max_freq: f64, interval: f64) -> Self {
        Self {
            min_freq,
            max_freq,
            interval,
            confidence: DEFAULT_CONFIDENCE,
            max_partial_freq: DEFAULT_MAX_PARTIAL_FREQ,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        require_positive("min_freq", self.min_freq)?;
        require_positive("max_freq", self.max_freq)?;
        require_positive("interval", self.interval)?;
        require_positive("max_partial_freq", self.max_partial_freq)?;
        if self.min_freq >= self.max_freq {
            return Err(EngineError::config(
                "min_freq",
                format!(
                    "must be below max_freq ({} >= {})",
                    self.min_freq, self.max_freq
                ),
            ));
        }
        if !self.confidence.is_finite() {
            return Err(EngineError::config("confidence", "must be finite"));
        }
        Ok(())
    }

    /// Builds an envelope of fundamental estimates over the span of
    /// `partials`. Times with no confident estimate are left out.
    pub fn estimate(&self, partials: &PartialList) -> EngineResult<LinearEnvelope> {
        self.validate()?;
        let mut envelope = LinearEnvelope::new();
        if partials.iter().all(|p| p.is_empty()) {
            return Ok(envelope);
        }

        let start = partials.min_start_time();
        let end = partials.max_end_time();
        let steps = ((end - start) / self.interval).floor() as usize;
        let mut skipped = 0usize;

        for k in 0..=steps {
            let t = start + k as f64 * self.interval;
            match self.estimate_at(partials, t) {
                Some(f0) => envelope.insert_breakpoint(t, f0),
                None => skipped += 1,
            }
        }

        debug!(
            estimates = envelope.len(),
            skipped, "estimated fundamental"
        );
        Ok(envelope)
    }

    /// Estimates the fundamental at one time.
    pub fn estimate_at(&self, partials: &PartialList, time: f64) -> Option<f64> {
        let votes: Vec<(f64, f64)> = partials
            .iter()
            .filter(|p| !p.is_empty() && p.start_time() <= time && time <= p.end_time())
            .map(|p| (p.frequency_at(time), p.amplitude_at(time)))
            .filter(|&(f, a)| a > 0.0 && f > 0.0 && f <= self.max_partial_freq)
            .collect();
        if votes.is_empty() {
            return None;
        }
        let total: f64 = votes.iter().map(|v| v.1).sum();
        let score = |f0: f64| -> f64 {
            votes
                .iter()
                .map(|&(f, a)| a * (2.0 * PI * f / f0).cos())
                .sum::<f64>()
                / total
        };

        // Score peaks narrow as harmonic numbers grow, so the grid step
        // shrinks with the highest harmonic that can occur.
        let max_vote = votes.iter().map(|v| v.0).fold(0.0, f64::max);
        let max_harmonic = (max_vote / self.min_freq).clamp(1.0, 1000.0);
        let span = (self.max_freq / self.min_freq).ln();
        let points = ((span * 8.0 * max_harmonic).ceil() as usize).clamp(16, MAX_GRID_POINTS);
        let ratio = (span / points as f64).exp();

        // Descending grid; local maxima are refined and compared.
        let grid: Vec<f64> = (0..=points)
            .map(|i| self.max_freq / ratio.powi(i as i32))
            .collect();
        let scores: Vec<f64> = grid.iter().map(|&f| score(f)).collect();

        let mut candidates: Vec<(f64, f64)> = Vec::new();
        for i in 0..grid.len() {
            let left = if i > 0 { scores[i - 1] } else { f64::NEG_INFINITY };
            let right = if i + 1 < grid.len() { scores[i + 1] } else { f64::NEG_INFINITY };
            if scores[i] >= left && scores[i] >= right {
                let hi = if i > 0 { grid[i - 1] } else { grid[i] };
                let lo = if i + 1 < grid.len() { grid[i + 1] } else { grid[i] };
                let f = refine(&score, lo, hi);
                candidates.push((f, score(f)));
            }
        }

        let best = candidates.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        if best < self.confidence {
            return None;
        }
        candidates
            .iter()
            .filter(|c| c.1 >= best - TIE_TOLERANCE)
            .map(|c| c.0)
            .reduce(f64::max)
    }
}

/// Golden-section search for the maximum of a unimodal function on
/// `[lo, hi]`.
fn refine(score: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;
    let mut a = hi - inv_phi * (hi - lo);
    let mut b = lo + inv_phi * (hi - lo);
    let (mut fa, mut fb) = (score(a), score(b));
    for _ in 0..REFINE_ITERATIONS {
        if fa < fb {
            lo = a;
            a = b;
            fa = fb;
            b = lo + inv_phi * (hi - lo);
            fb = score(b);
        } else {
            hi = b;
            b = a;
            fb = fa;
            a = hi - inv_phi * (hi - lo);
            fa = score(a);
        }
    }
    0.5 * (lo + hi)
}
