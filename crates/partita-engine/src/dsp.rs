//! Small numeric helpers shared by analysis and synthesis.

pub use partita_model::wrap_phase;

/// Maximum number of series terms for the Bessel expansions.
const BESSEL_MAX_TERMS: usize = 60;
/// Relative convergence threshold for the Bessel series.
const BESSEL_CONVERGENCE: f64 = 1e-16;

/// Zeroth-order modified Bessel function of the first kind.
/// Computed via series expansion.
#[inline]
pub fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let x_half = x / 2.0;
    for k in 1..BESSEL_MAX_TERMS {
        term *= (x_half / k as f64) * (x_half / k as f64);
        sum += term;
        if term < BESSEL_CONVERGENCE * sum {
            break;
        }
    }
    sum
}

/// `I1(x) / x`, finite at `x = 0` where it equals 1/2.
#[inline]
pub fn bessel_i1_over_x(x: f64) -> f64 {
    // I1(x)/x = 1/2 * sum_k (x^2/4)^k / (k! (k+1)!)
    let q = x * x / 4.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..BESSEL_MAX_TERMS {
        term *= q / (k as f64 * (k + 1) as f64);
        sum += term;
        if term < BESSEL_CONVERGENCE * sum {
            break;
        }
    }
    0.5 * sum
}

/// Converts decibels to linear amplitude.
#[inline]
pub fn db_to_amp(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Converts linear amplitude to decibels; silence maps to negative infinity.
#[inline]
pub fn amp_to_db(amp: f64) -> f64 {
    20.0 * amp.log10()
}
