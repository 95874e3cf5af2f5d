//! Harmonic channel labeling.

use partita_model::{LinearEnvelope, Partial, PartialList, UNLABELED};
use tracing::debug;

use super::PartialTransform;
use crate::error::{require_non_negative, EngineError, EngineResult};

/// Labels partials with their harmonic number relative to a reference
/// frequency envelope.
///
/// `reference` tracks the frequency of harmonic `reference_label`, so the
/// fundamental at time `t` is `reference(t) / reference_label`. Each
/// breakpoint is assigned a fractional harmonic number; the partial's label
/// is the rounded weighted mean of those numbers, each weighted by the time
/// it represents and by its amplitude raised to `amp_weighting`. A mean
/// below one half leaves the partial unlabeled.
///
/// With a non-zero `stretch` B, harmonics follow `f_n = n f_1 sqrt(1 + B n^2)`
/// as in stiff strings.
#[derive(Debug, Clone)]
pub struct Channelizer {
    reference: LinearEnvelope,
    reference_label: u32,
    stretch: f64,
    amp_weighting: f64,
}

impl Channelizer {
    pub fn new(reference: LinearEnvelope, reference_label: u32) -> EngineResult<Self> {
        if reference_label == 0 {
            return Err(EngineError::config("reference_label", "must be at least 1"));
        }
        if reference.is_empty() {
            return Err(EngineError::config("reference", "envelope has no breakpoints"));
        }
        if let Some((t, v)) = reference
            .iter()
            .find(|(t, v)| !t.is_finite() || !v.is_finite() || *v <= 0.0)
        {
            return Err(EngineError::config(
                "reference",
                format!("frequency must be positive and finite, got {} at {} s", v, t),
            ));
        }
        Ok(Self {
            reference,
            reference_label,
            stretch: 0.0,
            amp_weighting: 0.0,
        })
    }

    /// Channelizer following a constant reference frequency.
    pub fn constant(frequency: f64, reference_label: u32) -> EngineResult<Self> {
        Self::new(LinearEnvelope::constant(frequency), reference_label)
    }

    pub fn with_stretch(mut self, stretch: f64) -> EngineResult<Self> {
        require_non_negative("stretch", stretch)?;
        self.stretch = stretch;
        Ok(self)
    }

    pub fn with_amp_weighting(mut self, amp_weighting: f64) -> EngineResult<Self> {
        require_non_negative("amp_weighting", amp_weighting)?;
        self.amp_weighting = amp_weighting;
        Ok(self)
    }

    /// Fractional harmonic number of `frequency` at `time`.
    pub fn harmonic_number(&self, time: f64, frequency: f64) -> f64 {
        let fundamental = self.reference.value_at(time) / self.reference_label as f64;
        let ratio = frequency / fundamental;
        if self.stretch == 0.0 {
            ratio
        } else {
            let b = self.stretch;
            (((1.0 + 4.0 * b * ratio * ratio).sqrt() - 1.0) / (2.0 * b)).sqrt()
        }
    }

    /// Label that `channelize` would assign to `partial`.
    pub fn label_for(&self, partial: &Partial) -> u32 {
        let points: Vec<(f64, f64, f64)> = partial
            .iter()
            .map(|(t, bp)| (t, bp.frequency(), bp.amplitude()))
            .collect();
        if points.is_empty() {
            return UNLABELED;
        }

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (i, &(t, f, a)) in points.iter().enumerate() {
            // Half of each adjacent interval belongs to this breakpoint.
            let before = if i > 0 { t - points[i - 1].0 } else { 0.0 };
            let after = if i + 1 < points.len() { points[i + 1].0 - t } else { 0.0 };
            let w = 0.5 * (before + after) * a.powf(self.amp_weighting);
            weighted += w * self.harmonic_number(t, f);
            total += w;
        }
        let mean = if total > 0.0 {
            weighted / total
        } else {
            points
                .iter()
                .map(|&(t, f, _)| self.harmonic_number(t, f))
                .sum::<f64>()
                / points.len() as f64
        };

        if mean.is_finite() && mean >= 0.5 {
            mean.round().min(u32::MAX as f64) as u32
        } else {
            UNLABELED
        }
    }

    /// Labels every partial in place.
    pub fn channelize(&self, partials: &mut PartialList) {
        let mut labeled = 0usize;
        for partial in partials.iter_mut() {
            let label = self.label_for(partial);
            if label != UNLABELED {
                labeled += 1;
            }
            partial.set_label(label);
        }
        debug!(
            partials = partials.len(),
            labeled,
            channels = partials.labels().len(),
            "channelized partials"
        );
    }
}

impl PartialTransform for Channelizer {
    fn name(&self) -> &'static str {
        "channelize"
    }

    fn apply(&self, partials: &mut PartialList) -> EngineResult<()> {
        self.channelize(partials);
        Ok(())
    }
}
