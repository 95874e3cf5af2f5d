//! Signal measurements for comparing rendered audio.

/// Calculate RMS (Root Mean Square) of samples.
///
/// # Arguments
///
/// * `samples` - Audio samples.
///
/// # Returns
///
/// The RMS value. Returns 0.0 for empty input.
///
/// # Example
///
/// ```rust
/// use partita_tests::audio_analysis::calculate_rms;
///
/// assert_eq!(calculate_rms(&[0.0; 100]), 0.0);
/// assert_eq!(calculate_rms(&[1.0; 100]), 1.0);
/// ```
pub fn calculate_rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|s| s * s).sum();
    (sum_of_squares / samples.len() as f64).sqrt()
}

/// Calculate peak amplitude (maximum absolute sample value).
///
/// Returns 0.0 for empty input.
pub fn peak_amplitude(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
}

/// Signal-to-noise ratio of `actual` against `reference`, in dB.
///
/// The noise is the sample-wise difference over the common length of the
/// two buffers.
///
/// # Arguments
///
/// * `reference` - The expected signal.
/// * `actual` - The signal under test.
///
/// # Returns
///
/// `f64::INFINITY` when the buffers match exactly, `f64::NEG_INFINITY` when
/// the reference is silent but the difference is not.
///
/// # Example
///
/// ```rust
/// use partita_tests::audio_analysis::snr_db;
///
/// let reference = [1.0, -1.0, 1.0, -1.0];
/// let actual = [0.9, -0.9, 0.9, -0.9];
/// assert!((snr_db(&reference, &actual) - 20.0).abs() < 1e-9);
/// ```
pub fn snr_db(reference: &[f64], actual: &[f64]) -> f64 {
    let len = reference.len().min(actual.len());
    let (signal, noise) = reference[..len]
        .iter()
        .zip(&actual[..len])
        .fold((0.0, 0.0), |(s, n), (r, a)| (s + r * r, n + (r - a) * (r - a)));

    if noise == 0.0 {
        return f64::INFINITY;
    }
    if signal == 0.0 {
        return f64::NEG_INFINITY;
    }
    10.0 * (signal / noise).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_sine() {
        let sine: Vec<f64> = (0..1000)
            .map(|n| (2.0 * std::f64::consts::PI * n as f64 / 100.0).sin())
            .collect();
        assert!((calculate_rms(&sine) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_peak_amplitude() {
        assert_eq!(peak_amplitude(&[]), 0.0);
        assert_eq!(peak_amplitude(&[0.25, -0.75, 0.5]), 0.75);
    }

    #[test]
    fn test_snr_edge_cases() {
        assert_eq!(snr_db(&[0.5, 0.5], &[0.5, 0.5]), f64::INFINITY);
        assert_eq!(snr_db(&[0.0, 0.0], &[0.1, 0.0]), f64::NEG_INFINITY);
        // Only the common prefix is compared.
        assert_eq!(snr_db(&[0.5], &[0.5, 9.0]), f64::INFINITY);
    }
}
