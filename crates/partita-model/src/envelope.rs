//! Piecewise-linear control functions of time.
//!
//! Used for morph weights, the reference fundamental in channelization, and
//! fundamental-frequency estimates.

use serde::{Deserialize, Serialize};

/// Piecewise-linear function defined by `(time, value)` points.
///
/// Values between points are linearly interpolated; outside the defined
/// range the nearest endpoint value is held. An empty envelope evaluates to 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct LinearEnvelope {
    points: Vec<(f64, f64)>,
}

impl LinearEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope holding `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            points: vec![(0.0, value)],
        }
    }

    /// Adds a point, replacing any point at exactly the same time.
    pub fn insert_breakpoint(&mut self, time: f64, value: f64) {
        let time = time + 0.0;
        match self.points.binary_search_by(|(t, _)| t.total_cmp(&time)) {
            Ok(idx) => self.points[idx].1 = value,
            Err(idx) => self.points.insert(idx, (time, value)),
        }
    }

    /// Value at `time`.
    pub fn value_at(&self, time: f64) -> f64 {
        let Some(&(first_t, first_v)) = self.points.first() else {
            return 0.0;
        };
        if time <= first_t {
            return first_v;
        }
        let idx = self.points.partition_point(|(t, _)| *t <= time);
        if idx == self.points.len() {
            return self.points[idx - 1].1;
        }
        let (t0, v0) = self.points[idx - 1];
        let (t1, v1) = self.points[idx];
        v0 + (v1 - v0) * (time - t0) / (t1 - t0)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().copied()
    }
}

impl FromIterator<(f64, f64)> for LinearEnvelope {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let mut env = LinearEnvelope::new();
        for (t, v) in iter {
            env.insert_breakpoint(t, v);
        }
        env
    }
}

impl From<Vec<(f64, f64)>> for LinearEnvelope {
    fn from(points: Vec<(f64, f64)>) -> Self {
        points.into_iter().collect()
    }
}

impl From<LinearEnvelope> for Vec<(f64, f64)> {
    fn from(env: LinearEnvelope) -> Self {
        env.points
    }
}
