//! Analyzer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{require_non_negative, require_positive, EngineError, EngineResult};

/// Default amplitude floor, in dB relative to full scale.
pub const DEFAULT_AMP_FLOOR_DB: f64 = -90.0;
/// Default window sidelobe attenuation in dB.
pub const DEFAULT_SIDELOBE_LEVEL_DB: f64 = 90.0;
/// Default bandwidth association region width in Hz.
pub const DEFAULT_BW_REGION_WIDTH: f64 = 2000.0;
/// Default offset of the null breakpoints added at partial ends, in seconds.
pub const DEFAULT_FADE_TIME: f64 = 0.001;
/// Default bound on phase-correction frequency adjustments, in percent.
pub const DEFAULT_MAX_FIX_PCT: f64 = 0.2;

/// Parameters controlling spectral analysis and partial tracking.
///
/// Construct with [`AnalyzerConfig::new`], which derives every other field
/// from the frequency resolution and window width, then adjust with the
/// `with_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnalyzerConfigRecord")]
pub struct AnalyzerConfig {
    /// Minimum frequency separation between retained peaks (Hz).
    pub freq_resolution: f64,
    /// Main-lobe width of the analysis window (Hz).
    pub window_width: f64,
    /// Time between analysis frames (seconds).
    pub hop_time: f64,
    /// Largest frequency change allowed between matched breakpoints (Hz).
    pub freq_drift: f64,
    /// Peaks quieter than this are ignored (dBFS).
    pub amp_floor_db: f64,
    /// Offset of the null breakpoints added at partial ends (seconds).
    pub fade_time: f64,
    /// Peaks below this frequency are ignored (Hz).
    pub freq_floor: f64,
    /// Sidelobe attenuation of the Kaiser window (dB).
    pub sidelobe_level_db: f64,
    /// Width of the spectral region whose energy is attributed to a peak (Hz).
    pub bw_region_width: f64,
    /// Frames a partial may go unmatched before it ends.
    pub max_gap_frames: usize,
    /// Adjust frequencies so stored phases agree with integrated frequency.
    pub phase_correct: bool,
    /// Largest phase-correction frequency adjustment (percent of frequency).
    pub max_fix_pct: f64,
    /// Spectral worker threads; 0 uses the available parallelism.
    pub threads: usize,
}

impl AnalyzerConfig {
    /// Creates a configuration from a frequency resolution and window width.
    ///
    /// # Arguments
    /// * `freq_resolution` - Minimum separation of partials in Hz
    /// * `window_width` - Analysis window main-lobe width in Hz
    pub fn new(freq_resolution: f64, window_width: f64) -> Self {
        Self {
            freq_resolution,
            window_width,
            hop_time: 1.0 / window_width,
            freq_drift: 0.5 * freq_resolution,
            amp_floor_db: DEFAULT_AMP_FLOOR_DB,
            fade_time: DEFAULT_FADE_TIME,
            freq_floor: freq_resolution,
            sidelobe_level_db: DEFAULT_SIDELOBE_LEVEL_DB,
            bw_region_width: DEFAULT_BW_REGION_WIDTH,
            max_gap_frames: 0,
            phase_correct: true,
            max_fix_pct: DEFAULT_MAX_FIX_PCT,
            threads: 0,
        }
    }

    /// Parses a configuration from JSON. Omitted fields take the values
    /// [`AnalyzerConfig::new`] would derive.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config("analyzer", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_hop_time(mut self, hop_time: f64) -> Self {
        self.hop_time = hop_time;
        self
    }

    pub fn with_freq_drift(mut self, freq_drift: f64) -> Self {
        self.freq_drift = freq_drift;
        self
    }

    pub fn with_amp_floor_db(mut self, amp_floor_db: f64) -> Self {
        self.amp_floor_db = amp_floor_db;
        self
    }

    pub fn with_fade_time(mut self, fade_time: f64) -> Self {
        self.fade_time = fade_time;
        self
    }

    pub fn with_freq_floor(mut self, freq_floor: f64) -> Self {
        self.freq_floor = freq_floor;
        self
    }

    pub fn with_sidelobe_level_db(mut self, sidelobe_level_db: f64) -> Self {
        self.sidelobe_level_db = sidelobe_level_db;
        self
    }

    pub fn with_bw_region_width(mut self, bw_region_width: f64) -> Self {
        self.bw_region_width = bw_region_width;
        self
    }

    pub fn with_max_gap_frames(mut self, max_gap_frames: usize) -> Self {
        self.max_gap_frames = max_gap_frames;
        self
    }

    pub fn with_phase_correct(mut self, phase_correct: bool) -> Self {
        self.phase_correct = phase_correct;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Checks every parameter, returning the first violation.
    pub fn validate(&self) -> EngineResult<()> {
        require_positive("freq_resolution", self.freq_resolution)?;
        require_positive("window_width", self.window_width)?;
        require_positive("hop_time", self.hop_time)?;
        require_positive("freq_drift", self.freq_drift)?;
        require_non_negative("fade_time", self.fade_time)?;
        require_non_negative("freq_floor", self.freq_floor)?;
        require_positive("sidelobe_level_db", self.sidelobe_level_db)?;
        require_positive("bw_region_width", self.bw_region_width)?;
        require_non_negative("max_fix_pct", self.max_fix_pct)?;
        if !self.amp_floor_db.is_finite() {
            return Err(EngineError::config(
                "amp_floor_db",
                format!("must be finite, got {}", self.amp_floor_db),
            ));
        }
        Ok(())
    }

    /// Number of spectral worker threads to use.
    pub(crate) fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Deserialized form; derived fields may be omitted.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AnalyzerConfigRecord {
    freq_resolution: f64,
    window_width: f64,
    #[serde(default)]
    hop_time: Option<f64>,
    #[serde(default)]
    freq_drift: Option<f64>,
    #[serde(default)]
    amp_floor_db: Option<f64>,
    #[serde(default)]
    fade_time: Option<f64>,
    #[serde(default)]
    freq_floor: Option<f64>,
    #[serde(default)]
    sidelobe_level_db: Option<f64>,
    #[serde(default)]
    bw_region_width: Option<f64>,
    #[serde(default)]
    max_gap_frames: Option<usize>,
    #[serde(default)]
    phase_correct: Option<bool>,
    #[serde(default)]
    max_fix_pct: Option<f64>,
    #[serde(default)]
    threads: Option<usize>,
}

impl From<AnalyzerConfigRecord> for AnalyzerConfig {
    fn from(r: AnalyzerConfigRecord) -> Self {
        let d = AnalyzerConfig::new(r.freq_resolution, r.window_width);
        Self {
            hop_time: r.hop_time.unwrap_or(d.hop_time),
            freq_drift: r.freq_drift.unwrap_or(d.freq_drift),
            amp_floor_db: r.amp_floor_db.unwrap_or(d.amp_floor_db),
            fade_time: r.fade_time.unwrap_or(d.fade_time),
            freq_floor: r.freq_floor.unwrap_or(d.freq_floor),
            sidelobe_level_db: r.sidelobe_level_db.unwrap_or(d.sidelobe_level_db),
            bw_region_width: r.bw_region_width.unwrap_or(d.bw_region_width),
            max_gap_frames: r.max_gap_frames.unwrap_or(d.max_gap_frames),
            phase_correct: r.phase_correct.unwrap_or(d.phase_correct),
            max_fix_pct: r.max_fix_pct.unwrap_or(d.max_fix_pct),
            threads: r.threads.unwrap_or(d.threads),
            ..d
        }
    }
}
