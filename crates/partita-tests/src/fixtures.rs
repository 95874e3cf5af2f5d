//! Synthetic test signals.

use std::f64::consts::TAU;

/// A sine of `frequency` Hz and `amplitude`, `duration` seconds long.
pub fn sine_tone(frequency: f64, amplitude: f64, duration: f64, sample_rate: f64) -> Vec<f64> {
    harmonic_tone(frequency, &[amplitude], duration, sample_rate)
}

/// A harmonic tone whose `k`th harmonic (1-based) has amplitude
/// `amplitudes[k - 1]`.
///
/// Harmonics at or above Nyquist are left out.
pub fn harmonic_tone(
    fundamental: f64,
    amplitudes: &[f64],
    duration: f64,
    sample_rate: f64,
) -> Vec<f64> {
    let len = (duration * sample_rate).round() as usize;
    let nyquist = 0.5 * sample_rate;
    let harmonics: Vec<(f64, f64)> = amplitudes
        .iter()
        .enumerate()
        .map(|(k, &a)| (fundamental * (k + 1) as f64, a))
        .filter(|&(f, _)| f < nyquist)
        .collect();

    (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate;
            harmonics.iter().map(|&(f, a)| a * (TAU * f * t).cos()).sum()
        })
        .collect()
}
