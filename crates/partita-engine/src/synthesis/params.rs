//! Synthesis parameters.

use serde::{Deserialize, Serialize};

use crate::error::{require_non_negative, require_positive, EngineError, EngineResult};

/// Shaping of the noise that realizes partial bandwidth.
///
/// White Gaussian noise passes through a cascade of identical lowpass
/// biquads and is normalized back to unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseFilterConfig {
    /// Cutoff frequency in Hz.
    pub cutoff: f64,
    /// Resonance of each section.
    #[serde(default = "default_q")]
    pub q: f64,
    /// Number of cascaded sections.
    #[serde(default = "default_stages")]
    pub stages: usize,
}

fn default_q() -> f64 {
    std::f64::consts::FRAC_1_SQRT_2
}

fn default_stages() -> usize {
    2
}

impl Default for NoiseFilterConfig {
    fn default() -> Self {
        Self {
            cutoff: 500.0,
            q: default_q(),
            stages: default_stages(),
        }
    }
}

impl NoiseFilterConfig {
    pub fn validate(&self) -> EngineResult<()> {
        require_positive("filter.cutoff", self.cutoff)?;
        require_positive("filter.q", self.q)?;
        if self.stages == 0 {
            return Err(EngineError::config("filter.stages", "must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters for [`super::Synthesizer`].
///
/// `Default` gives 44.1 kHz, a 1 ms fade, the default noise filter and
/// seed 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisParams {
    /// Output sample rate in Hz.
    pub sample_rate: f64,
    /// Length of the linear fade in and out around every partial (seconds).
    #[serde(default = "default_fade_time")]
    pub fade_time: f64,
    /// Noise shaping.
    #[serde(default)]
    pub filter: NoiseFilterConfig,
    /// Base seed for the per-partial noise streams.
    #[serde(default)]
    pub seed: u32,
}

fn default_fade_time() -> f64 {
    0.001
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            fade_time: default_fade_time(),
            filter: NoiseFilterConfig::default(),
            seed: 0,
        }
    }
}

impl SynthesisParams {
    /// Creates parameters for `sample_rate` with default fade, filter and seed.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn with_fade_time(mut self, fade_time: f64) -> Self {
        self.fade_time = fade_time;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_filter(mut self, filter: NoiseFilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Parses parameters from JSON.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config("synthesis", e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// True when the sample rate is positive and the fade time non-negative.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> EngineResult<()> {
        require_positive("sample_rate", self.sample_rate)?;
        require_non_negative("fade_time", self.fade_time)?;
        self.filter.validate()
    }
}
