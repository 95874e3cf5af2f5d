//! Reassigned bandwidth-enhanced analysis.
//!
//! The [`Analyzer`] turns a buffer of samples into a [`PartialList`]:
//!
//! 1. A Kaiser window shaped by the sidelobe level frames the signal every
//!    `hop_time` seconds.
//! 2. Each frame yields reassigned spectral peaks with a noise fraction
//!    (see [`spectrum`]). Frames are computed on worker threads.
//! 3. Peaks are linked frame to frame into partials (see [`tracker`]).
//! 4. Finished partials get phase-consistent frequencies and null
//!    breakpoints at both ends (see [`phase_fix`]).

pub mod config;
pub mod f0;
pub mod phase_fix;
pub mod pipeline;
pub mod spectrum;
pub mod tracker;
pub mod window;


use partita_model::PartialList;
use tracing::{debug, info};

pub use config::AnalyzerConfig;
pub use f0::FundamentalEstimator;

use crate::dsp::db_to_amp;
use crate::error::{require_positive, EngineError, EngineResult};
use phase_fix::{add_fade_breakpoints, fix_phases};
use pipeline::{for_each_frame, FramePlan};
use spectrum::PeakCriteria;
use tracker::PartialTracker;
use window::KaiserWindow;

/// Analyzes sampled audio into partials.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Creates an analyzer, rejecting invalid configurations up front.
    pub fn new(config: AnalyzerConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes `samples` recorded at `sample_rate` Hz.
    ///
    /// # Arguments
    /// * `samples` - Mono samples, nominally in [-1, 1]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// The tracked partials, unlabeled, in order of their first frame.
    pub fn analyze(&self, samples: &[f64], sample_rate: f64) -> EngineResult<PartialList> {
        require_positive("sample_rate", sample_rate)?;
        if samples.is_empty() {
            return Ok(PartialList::new());
        }
        if let Some(idx) = samples.iter().position(|x| !x.is_finite()) {
            return Err(EngineError::non_finite(format!("sample {}", idx)));
        }

        let cfg = &self.config;
        let window = KaiserWindow::new(cfg.window_width, cfg.sidelobe_level_db, sample_rate);
        let criteria = PeakCriteria {
            amp_floor: db_to_amp(cfg.amp_floor_db),
            freq_floor: cfg.freq_floor,
            freq_resolution: cfg.freq_resolution,
            bw_region_width: cfg.bw_region_width,
        };
        let hop = (cfg.hop_time * sample_rate).round().max(1.0) as usize;
        let plan = FramePlan::new(samples.len(), hop);
        let threads = cfg.worker_threads();

        debug!(
            window_len = window.len(),
            fft_len = window.fft_len(),
            hop,
            frames = plan.count,
            "analysis started"
        );

        let mut tracker = PartialTracker::new(cfg.freq_drift, cfg.max_gap_frames);
        let mut peak_count = 0usize;
        for_each_frame(
            samples,
            sample_rate,
            &window,
            &criteria,
            plan,
            threads,
            |frame, peaks| {
                peak_count += peaks.len();
                let time = plan.center(frame) as f64 / sample_rate;
                tracker.advance(time, &peaks);
            },
        );

        let mut partials: PartialList = tracker.finish().into_iter().collect();
        for partial in partials.iter_mut() {
            if cfg.phase_correct {
                fix_phases(partial, cfg.max_fix_pct);
            }
            add_fade_breakpoints(partial, cfg.fade_time);
        }

        info!(
            partials = partials.len(),
            peaks = peak_count,
            breakpoints = partials.breakpoint_count(),
            "analysis finished"
        );
        Ok(partials)
    }
}
