//! Instantaneous sinusoid parameters.

use serde::{Deserialize, Serialize};

/// Parameters of a partial at one instant.
///
/// Amplitude is never negative and bandwidth is kept in `[0, 1]`; setters
/// and deserialization clamp rather than reject. Phase is in radians and is
/// not normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BreakpointRecord")]
pub struct Breakpoint {
    frequency: f64,
    amplitude: f64,
    bandwidth: f64,
    phase: f64,
}

/// Deserialized form, clamped through [`Breakpoint::new`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BreakpointRecord {
    frequency: f64,
    amplitude: f64,
    bandwidth: f64,
    phase: f64,
}

impl From<BreakpointRecord> for Breakpoint {
    fn from(r: BreakpointRecord) -> Self {
        Breakpoint::new(r.frequency, r.amplitude, r.bandwidth, r.phase)
    }
}

impl Breakpoint {
    /// Creates a breakpoint, clamping amplitude and bandwidth into range.
    ///
    /// # Arguments
    /// * `frequency` - Instantaneous frequency in Hz
    /// * `amplitude` - Linear amplitude (clamped to >= 0)
    /// * `bandwidth` - Noise fraction (clamped to [0, 1])
    /// * `phase` - Instantaneous phase in radians
    pub fn new(frequency: f64, amplitude: f64, bandwidth: f64, phase: f64) -> Self {
        Self {
            frequency,
            amplitude: clamp_amplitude(amplitude),
            bandwidth: clamp_bandwidth(bandwidth),
            phase,
        }
    }

    /// Creates a silent breakpoint at the given frequency and phase.
    pub fn null(frequency: f64, phase: f64) -> Self {
        Self::new(frequency, 0.0, 0.0, phase)
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = clamp_amplitude(amplitude);
    }

    pub fn set_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidth = clamp_bandwidth(bandwidth);
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Returns true if every field is a finite number.
    pub fn is_finite(&self) -> bool {
        self.frequency.is_finite()
            && self.amplitude.is_finite()
            && self.bandwidth.is_finite()
            && self.phase.is_finite()
    }
}

fn clamp_amplitude(amplitude: f64) -> f64 {
    // NaN passes through so that validation can report it.
    if amplitude < 0.0 {
        0.0
    } else {
        amplitude
    }
}

fn clamp_bandwidth(bandwidth: f64) -> f64 {
    if bandwidth < 0.0 {
        0.0
    } else if bandwidth > 1.0 {
        1.0
    } else {
        bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_amplitude_and_bandwidth() {
        let bp = Breakpoint::new(440.0, -0.5, 1.5, 0.25);
        assert_eq!(bp.amplitude(), 0.0);
        assert_eq!(bp.bandwidth(), 1.0);
        assert_eq!(bp.frequency(), 440.0);
        assert_eq!(bp.phase(), 0.25);
    }

    #[test]
    fn test_setters_clamp() {
        let mut bp = Breakpoint::new(100.0, 0.1, 0.1, 0.0);
        bp.set_amplitude(-1.0);
        bp.set_bandwidth(-0.2);
        assert_eq!(bp.amplitude(), 0.0);
        assert_eq!(bp.bandwidth(), 0.0);
    }

    #[test]
    fn test_null_is_silent() {
        let bp = Breakpoint::null(220.0, 1.0);
        assert_eq!(bp.amplitude(), 0.0);
        assert_eq!(bp.frequency(), 220.0);
        assert_eq!(bp.phase(), 1.0);
    }

    #[test]
    fn test_nan_is_reported_not_clamped() {
        let bp = Breakpoint::new(f64::NAN, 0.5, 0.0, 0.0);
        assert!(!bp.is_finite());
        let bp = Breakpoint::new(100.0, f64::NAN, 0.0, 0.0);
        assert!(!bp.is_finite());
    }

    #[test]
    fn test_serde_roundtrip() {
        let bp = Breakpoint::new(440.0, 0.5, 0.1, -1.0);
        let json = serde_json::to_string(&bp).unwrap();
        let parsed: Breakpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(bp, parsed);
    }

    #[test]
    fn test_deserialize_clamps() {
        let json = r#"{"frequency":440.0,"amplitude":-0.5,"bandwidth":1.5,"phase":0.25}"#;
        let bp: Breakpoint = serde_json::from_str(json).unwrap();
        assert_eq!(bp, Breakpoint::new(440.0, 0.0, 1.0, 0.25));
        assert_eq!(bp.amplitude(), 0.0);
        assert_eq!(bp.bandwidth(), 1.0);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let json = r#"{"frequency":1.0,"amplitude":0.1,"bandwidth":0.0,"phase":0.0,"gain":2.0}"#;
        assert!(serde_json::from_str::<Breakpoint>(json).is_err());
    }
}
