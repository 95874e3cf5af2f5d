//! Determinism verification for rendered sample buffers.
//!
//! Buffers are compared bit for bit: two runs only match when every sample
//! has the same `f64` bit pattern.

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// Number of samples in the reference output.
    pub output_len: usize,
    /// BLAKE3 hash of the reference output.
    pub hash: String,
    /// If non-deterministic, the first difference found.
    pub diff: Option<SampleDiff>,
}

/// The first sample that differs between two runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDiff {
    /// Sample index, or the shorter length when the lengths differ.
    pub index: usize,
    /// Value from the first run, if it has a sample at `index`.
    pub expected: Option<f64>,
    /// Value from the differing run, if it has a sample at `index`.
    pub actual: Option<f64>,
    /// Which run (0-indexed) produced the differing output.
    pub run_index: usize,
}

impl fmt::Display for SampleDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} differs at sample {}: expected {:?}, got {:?}",
            self.run_index, self.index, self.expected, self.actual
        )
    }
}

impl DeterminismResult {
    /// Panics with the first difference if the runs did not match.
    pub fn assert_deterministic(&self) {
        if let Some(diff) = &self.diff {
            panic!("Non-deterministic output over {} runs: {}", self.runs, diff);
        }
    }
}

/// Compute the BLAKE3 hash of a sample buffer.
///
/// Samples are hashed as little-endian `f64` bit patterns.
pub fn compute_hash(samples: &[f64]) -> String {
    let mut hasher = blake3::Hasher::new();
    for s in samples {
        hasher.update(&s.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Verify that a generation function produces identical samples across
/// multiple runs.
///
/// # Arguments
///
/// * `generate_fn` - Function that renders a buffer
/// * `runs` - Number of times to run (minimum 2)
///
/// # Returns
///
/// A [`DeterminismResult`] holding the reference hash and, on failure,
/// the first differing sample.
///
/// # Example
///
/// ```rust
/// use partita_tests::determinism::verify_determinism;
///
/// let result = verify_determinism(|| vec![0.25; 16], 3);
/// assert!(result.is_deterministic);
/// ```
pub fn verify_determinism<F>(generate_fn: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> Vec<f64>,
{
    assert!(runs >= 2, "Must run at least 2 times to verify determinism");

    let reference = generate_fn();
    let hash = compute_hash(&reference);
    let mut diff = None;

    for run_index in 1..runs {
        let output = generate_fn();
        if let Some(found) = find_first_difference(&reference, &output, run_index) {
            diff = Some(found);
            break;
        }
    }

    DeterminismResult {
        is_deterministic: diff.is_none(),
        runs,
        output_len: reference.len(),
        hash,
        diff,
    }
}

/// Find the first sample whose bits differ between two buffers.
pub fn find_first_difference(
    expected: &[f64],
    actual: &[f64],
    run_index: usize,
) -> Option<SampleDiff> {
    let mismatch = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e.to_bits() != a.to_bits());

    let index = match mismatch {
        Some(index) => index,
        None if expected.len() == actual.len() => return None,
        None => expected.len().min(actual.len()),
    };

    Some(SampleDiff {
        index,
        expected: expected.get(index).copied(),
        actual: actual.get(index).copied(),
        run_index,
    })
}
