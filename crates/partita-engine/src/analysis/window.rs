//! Kaiser analysis window, its time derivative, and its transform.
//!
//! The window is stored centered: index `m + half_len` holds `w(m)` for
//! `m` in `-half_len..=half_len`. Frames are placed zero-phase, so the
//! spectrum of a stationary sinusoid has the sinusoid's phase at the frame
//! center.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::dsp::{bessel_i0, bessel_i1_over_x};

/// Largest transform table, in complex samples.
const MAX_TABLE_FFT: usize = 1 << 21;
/// Preferred oversampling of the transform table relative to the frame FFT.
const TABLE_OVERSAMPLING: usize = 32;

/// Kaiser shape parameter for a desired sidelobe attenuation in dB.
pub fn kaiser_beta(sidelobe_db: f64) -> f64 {
    if sidelobe_db > 60.0 {
        0.12438 * (sidelobe_db + 6.3)
    } else if sidelobe_db > 13.26 {
        0.76609 * (sidelobe_db - 13.26).powf(0.4) + 0.09834 * (sidelobe_db - 13.26)
    } else {
        0.0
    }
}

/// Odd window length giving a main lobe `width_hz` wide at `sample_rate`.
pub fn kaiser_length(width_hz: f64, sample_rate: f64, beta: f64) -> usize {
    let norm_width = width_hz / sample_rate;
    let len = 1.0 + 2.0 * (PI * PI + beta * beta).sqrt() / (PI * norm_width);
    let len = len.round().max(3.0) as usize;
    len | 1
}

/// Precomputed analysis window.
#[derive(Debug, Clone)]
pub struct KaiserWindow {
    beta: f64,
    half_len: usize,
    fft_len: usize,
    samples: Vec<f64>,
    derivative: Vec<f64>,
    sum: f64,
    table: Vec<f64>,
    table_step: f64,
}

impl KaiserWindow {
    /// Builds the window for a main-lobe width and sidelobe level.
    ///
    /// # Arguments
    /// * `width_hz` - Main-lobe width in Hz
    /// * `sidelobe_db` - Sidelobe attenuation in dB
    /// * `sample_rate` - Sample rate of the analyzed signal
    pub fn new(width_hz: f64, sidelobe_db: f64, sample_rate: f64) -> Self {
        let beta = kaiser_beta(sidelobe_db);
        let len = kaiser_length(width_hz, sample_rate, beta);
        let half_len = (len - 1) / 2;
        let m_max = half_len as f64;
        let denom = bessel_i0(beta);

        let mut samples = Vec::with_capacity(len);
        let mut derivative = Vec::with_capacity(len);
        for i in 0..len {
            let m = i as f64 - m_max;
            let x = m / m_max;
            let u = beta * (1.0 - x * x).max(0.0).sqrt();
            samples.push(bessel_i0(u) / denom);
            // d/dm I0(beta*sqrt(1-(m/M)^2)) = -(beta^2 m / M^2) * I1(u)/u
            derivative.push(-(beta * beta * m / (m_max * m_max)) * bessel_i1_over_x(u) / denom);
        }
        let sum = samples.iter().sum();

        let fft_len = 2 * len.next_power_of_two();
        let (table, table_step) = transform_table(&samples, half_len, fft_len);

        Self {
            beta,
            half_len,
            fft_len,
            samples,
            derivative,
            sum,
            table,
            table_step,
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples on each side of the center.
    pub fn half_len(&self) -> usize {
        self.half_len
    }

    /// Frame FFT length: twice the next power of two above the window length.
    pub fn fft_len(&self) -> usize {
        self.fft_len
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Time derivative of the window, per sample.
    pub fn derivative(&self) -> &[f64] {
        &self.derivative
    }

    /// Window transform magnitude at zero offset.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Window transform at a frequency offset in radians per sample.
    ///
    /// Interpolated from a table oversampled relative to the frame FFT. Beyond
    /// the table the transform is treated as zero.
    pub fn transform(&self, offset: f64) -> f64 {
        let pos = offset.abs() / self.table_step;
        let idx = pos.floor() as usize;
        if idx + 1 >= self.table.len() {
            return 0.0;
        }
        let frac = pos - idx as f64;
        self.table[idx] + (self.table[idx + 1] - self.table[idx]) * frac
    }
}

/// Tabulates the window transform over `[0, PI]` radians per sample.
fn transform_table(samples: &[f64], half_len: usize, fft_len: usize) -> (Vec<f64>, f64) {
    let oversampling = (MAX_TABLE_FFT / fft_len).clamp(1, TABLE_OVERSAMPLING);
    let table_len = fft_len * oversampling;

    let mut buffer = vec![Complex::new(0.0, 0.0); table_len];
    for (i, &w) in samples.iter().enumerate() {
        let m = i as isize - half_len as isize;
        let idx = m.rem_euclid(table_len as isize) as usize;
        buffer[idx].re = w;
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(table_len).process(&mut buffer);

    // A symmetric, zero-phase window has a real transform.
    let table = buffer[..=table_len / 2].iter().map(|c| c.re).collect();
    (table, 2.0 * PI / table_len as f64)
}
