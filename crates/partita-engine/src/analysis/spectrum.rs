//! Short-time spectra and reassigned peak extraction.
//!
//! Each frame is windowed twice, once with the Kaiser window and once with
//! its time derivative. The ratio of the two spectra at a magnitude peak
//! gives the reassigned (corrected) frequency of the underlying sinusoid.
//! Peaks whose correction exceeds one bin are sidelobe or leakage artifacts
//! and are dropped.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::window::KaiserWindow;

/// A spectral peak at one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    /// Reassigned frequency (Hz).
    pub frequency: f64,
    /// Sinusoidal amplitude, including attributed noise energy.
    pub amplitude: f64,
    /// Noise fraction in `[0, 1]`.
    pub bandwidth: f64,
    /// Phase at the frame center (radians).
    pub phase: f64,
}

/// Peak selection thresholds, resolved to linear units.
#[derive(Debug, Clone, Copy)]
pub struct PeakCriteria {
    pub amp_floor: f64,
    pub freq_floor: f64,
    pub freq_resolution: f64,
    pub bw_region_width: f64,
}

/// Reusable per-thread spectral analyzer.
pub struct FrameAnalyzer<'w> {
    window: &'w KaiserWindow,
    sample_rate: f64,
    fft: Arc<dyn Fft<f64>>,
    spectrum: Vec<Complex<f64>>,
    deriv_spectrum: Vec<Complex<f64>>,
    power: Vec<f64>,
}

/// Unrefined local maximum.
#[derive(Debug, Clone, Copy)]
struct RawPeak {
    bin: usize,
    omega: f64,
    amplitude: f64,
    phase: f64,
}

impl<'w> FrameAnalyzer<'w> {
    pub fn new(window: &'w KaiserWindow, sample_rate: f64) -> Self {
        let n = window.fft_len();
        let fft = FftPlanner::new().plan_fft_forward(n);
        Self {
            window,
            sample_rate,
            fft,
            spectrum: vec![Complex::new(0.0, 0.0); n],
            deriv_spectrum: vec![Complex::new(0.0, 0.0); n],
            power: vec![0.0; n / 2 + 1],
        }
    }

    /// Extracts peaks from the frame centered on sample `center`.
    ///
    /// Samples outside `samples` are treated as zero. The returned peaks are
    /// sorted by frequency and separated by at least the frequency
    /// resolution.
    pub fn analyze(
        &mut self,
        samples: &[f64],
        center: usize,
        criteria: &PeakCriteria,
    ) -> Vec<SpectralPeak> {
        self.transform(samples, center);
        let raw = self.pick_peaks(criteria);
        let resolution = 2.0 * PI * criteria.freq_resolution / self.sample_rate;
        let thinned = thin_peaks(raw, resolution);
        self.estimate_bandwidth(&thinned, criteria)
    }

    fn transform(&mut self, samples: &[f64], center: usize) {
        let n = self.window.fft_len();
        let half = self.window.half_len() as isize;
        let zero = Complex::new(0.0, 0.0);
        self.spectrum.iter_mut().for_each(|c| *c = zero);
        self.deriv_spectrum.iter_mut().for_each(|c| *c = zero);

        let w = self.window.samples();
        let dw = self.window.derivative();
        for m in -half..=half {
            let pos = center as isize + m;
            if pos < 0 || pos as usize >= samples.len() {
                continue;
            }
            let x = samples[pos as usize];
            let wi = (m + half) as usize;
            let idx = m.rem_euclid(n as isize) as usize;
            self.spectrum[idx].re = x * w[wi];
            self.deriv_spectrum[idx].re = x * dw[wi];
        }

        self.fft.process(&mut self.spectrum);
        self.fft.process(&mut self.deriv_spectrum);

        for (p, c) in self.power.iter_mut().zip(&self.spectrum) {
            *p = c.norm_sqr();
        }
    }

    fn pick_peaks(&self, criteria: &PeakCriteria) -> Vec<RawPeak> {
        let n = self.window.fft_len();
        let bin_width = 2.0 * PI / n as f64;
        let nyquist = PI;
        let mut peaks = Vec::new();

        for k in 1..n / 2 {
            let p = self.power[k];
            if !(p > self.power[k - 1] && p >= self.power[k + 1]) {
                continue;
            }
            let x = self.spectrum[k];
            let cross = self.deriv_spectrum[k] * x.conj();
            let correction = cross.im / p;
            if correction.abs() > bin_width {
                continue;
            }
            let omega_k = k as f64 * bin_width;
            let omega = omega_k - correction;
            if omega <= 0.0 || omega >= nyquist {
                continue;
            }
            let w = self.window.transform(omega_k - omega);
            if w <= 0.0 {
                continue;
            }
            let amplitude = 2.0 * p.sqrt() / w;
            let frequency = omega * self.sample_rate / (2.0 * PI);
            if amplitude < criteria.amp_floor || frequency < criteria.freq_floor {
                continue;
            }
            peaks.push(RawPeak {
                bin: k,
                omega,
                amplitude,
                phase: x.arg(),
            });
        }
        peaks
    }

    /// Attributes the spectral energy around each peak to it.
    fn estimate_bandwidth(&self, peaks: &[RawPeak], criteria: &PeakCriteria) -> Vec<SpectralPeak> {
        let n = self.window.fft_len();
        let bin_width = 2.0 * PI / n as f64;
        let half_region = PI * criteria.bw_region_width / self.sample_rate;
        let max_bin = n / 2;

        peaks
            .iter()
            .enumerate()
            .map(|(i, peak)| {
                let mut lo = peak.omega - half_region;
                let mut hi = peak.omega + half_region;
                if i > 0 {
                    lo = lo.max(0.5 * (peaks[i - 1].omega + peak.omega));
                }
                if i + 1 < peaks.len() {
                    hi = hi.min(0.5 * (peak.omega + peaks[i + 1].omega));
                }
                let first = ((lo / bin_width).ceil() as usize).max(1);
                let last = ((hi / bin_width).floor() as usize).min(max_bin);

                let mut total = 0.0;
                let mut modeled = 0.0;
                for k in first..=last {
                    total += self.power[k];
                    let offset = k as f64 * bin_width - peak.omega;
                    let w = 0.5 * peak.amplitude * self.window.transform(offset);
                    modeled += w * w;
                }
                let (bandwidth, amplitude) = if total > modeled && modeled > 0.0 {
                    (
                        ((total - modeled) / total).clamp(0.0, 1.0),
                        peak.amplitude * (total / modeled).sqrt(),
                    )
                } else {
                    (0.0, peak.amplitude)
                };

                SpectralPeak {
                    frequency: peak.omega * self.sample_rate / (2.0 * PI),
                    amplitude,
                    bandwidth,
                    phase: peak.phase,
                }
            })
            .collect()
    }
}

/// Keeps the loudest peaks such that no two are closer than `resolution`
/// radians per sample, then restores frequency order.
fn thin_peaks(mut peaks: Vec<RawPeak>, resolution: f64) -> Vec<RawPeak> {
    // Loudest first; ties resolve toward the lower bin.
    peaks.sort_by(|a, b| b.amplitude.total_cmp(&a.amplitude).then(a.bin.cmp(&b.bin)));
    let mut kept: Vec<RawPeak> = Vec::with_capacity(peaks.len());
    for peak in peaks {
        if kept
            .iter()
            .all(|k| (k.omega - peak.omega).abs() >= resolution)
        {
            kept.push(peak);
        }
    }
    kept.sort_by(|a, b| a.omega.total_cmp(&b.omega));
    kept
}
