//! Low-pass shaping for bandwidth-enhancement noise.
//!
//! Sections are second-order low-pass designs from the Audio EQ Cookbook,
//! run in transposed direct form II.

use std::f64::consts::PI;

/// Second-order low-pass coefficients, normalized so that `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowpassCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl LowpassCoeffs {
    /// Designs a low-pass section.
    ///
    /// # Arguments
    /// * `cutoff` - Cutoff frequency in Hz, limited to just below Nyquist
    /// * `q` - Resonance, at least 0.5; 0.707 is Butterworth
    /// * `sample_rate` - Sample rate in Hz
    pub fn design(cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff.min(0.49 * sample_rate) / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(0.5));
        let norm = 1.0 / (1.0 + alpha);
        let edge = 0.5 * (1.0 - cos_w0) * norm;

        Self {
            b0: edge,
            b1: 2.0 * edge,
            b2: edge,
            a1: -2.0 * cos_w0 * norm,
            a2: (1.0 - alpha) * norm,
        }
    }
}

/// One transposed direct form II section.
#[derive(Debug, Clone)]
pub struct LowpassSection {
    coeffs: LowpassCoeffs,
    s1: f64,
    s2: f64,
}

impl LowpassSection {
    pub fn new(coeffs: LowpassCoeffs) -> Self {
        Self {
            coeffs,
            s1: 0.0,
            s2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let c = self.coeffs;
        let y = c.b0 * x + self.s1;
        self.s1 = c.b1 * x - c.a1 * y + self.s2;
        self.s2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }
}

/// Cascade of identical low-pass sections.
#[derive(Debug, Clone)]
pub struct FilterCascade {
    sections: Vec<LowpassSection>,
}

impl FilterCascade {
    /// Creates `stages` identical sections.
    pub fn lowpass(cutoff: f64, q: f64, sample_rate: f64, stages: usize) -> Self {
        let coeffs = LowpassCoeffs::design(cutoff, q, sample_rate);
        Self {
            sections: vec![LowpassSection::new(coeffs); stages],
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.sections.iter_mut().fold(x, |acc, s| s.process(acc))
    }

    pub fn reset(&mut self) {
        self.sections.iter_mut().for_each(LowpassSection::reset);
    }

    /// Sum of squared impulse response samples over `len` samples.
    ///
    /// For unit-variance white input this is the output variance.
    pub fn impulse_energy(&self, len: usize) -> f64 {
        let mut cascade = self.clone();
        cascade.reset();
        (0..len)
            .map(|n| cascade.process(if n == 0 { 1.0 } else { 0.0 }))
            .map(|h| h * h)
            .sum()
    }
}
