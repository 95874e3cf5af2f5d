//! Piecewise-linear time warping.

use partita_model::PartialList;
use tracing::debug;

use super::PartialTransform;
use crate::error::{EngineError, EngineResult};

/// Moves the time markers `initial[i]` to `target[i]` and warps every
/// breakpoint time linearly between them.
///
/// Before the first marker, times scale proportionally when that marker is
/// positive and shift otherwise; after the last marker they shift.
#[derive(Debug, Clone, PartialEq)]
pub struct Dilator {
    initial: Vec<f64>,
    target: Vec<f64>,
}

impl Dilator {
    /// # Errors
    /// `Configuration` when the lists differ in length, are not strictly
    /// increasing, hold non-finite times, or would reverse time before the
    /// first marker.
    pub fn new(initial: Vec<f64>, target: Vec<f64>) -> EngineResult<Self> {
        if initial.len() != target.len() {
            return Err(EngineError::config(
                "markers",
                format!(
                    "{} initial markers but {} target markers",
                    initial.len(),
                    target.len()
                ),
            ));
        }
        check_increasing("initial", &initial)?;
        check_increasing("target", &target)?;
        if let (Some(&i0), Some(&t0)) = (initial.first(), target.first()) {
            if i0 > 0.0 && t0 <= 0.0 {
                return Err(EngineError::config(
                    "target",
                    format!("first marker must be positive when the initial one is, got {}", t0),
                ));
            }
        }
        Ok(Self { initial, target })
    }

    /// Builds a dilator from `(initial, target)` marker pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> EngineResult<Self> {
        Self::new(
            pairs.iter().map(|p| p.0).collect(),
            pairs.iter().map(|p| p.1).collect(),
        )
    }

    /// Warped time of `time`.
    pub fn warp(&self, time: f64) -> f64 {
        let n = self.initial.len();
        if n == 0 {
            return time;
        }
        let (i0, t0) = (self.initial[0], self.target[0]);
        if time <= i0 {
            return if i0 > 0.0 {
                time * t0 / i0
            } else {
                time + (t0 - i0)
            };
        }
        let (il, tl) = (self.initial[n - 1], self.target[n - 1]);
        if time >= il {
            return time + (tl - il);
        }
        // First marker after `time`; the one before it exists.
        let k = self.initial.partition_point(|&m| m <= time);
        let (ia, ib) = (self.initial[k - 1], self.initial[k]);
        let (ta, tb) = (self.target[k - 1], self.target[k]);
        ta + (time - ia) * (tb - ta) / (ib - ia)
    }

    pub fn dilate(&self, partials: &mut PartialList) {
        for partial in partials.iter_mut() {
            partial.map_times(|t| self.warp(t));
        }
        debug!(
            partials = partials.len(),
            markers = self.initial.len(),
            "dilated partials"
        );
    }
}

fn check_increasing(name: &str, markers: &[f64]) -> EngineResult<()> {
    if let Some(t) = markers.iter().find(|t| !t.is_finite()) {
        return Err(EngineError::config(name, format!("marker {} is not finite", t)));
    }
    if let Some(w) = markers.windows(2).find(|w| w[1] <= w[0]) {
        return Err(EngineError::config(
            name,
            format!("markers must strictly increase ({} then {})", w[0], w[1]),
        ));
    }
    Ok(())
}

impl PartialTransform for Dilator {
    fn name(&self) -> &'static str {
        "dilate"
    }

    fn apply(&self, partials: &mut PartialList) -> EngineResult<()> {
        self.dilate(partials);
        Ok(())
    }
}
