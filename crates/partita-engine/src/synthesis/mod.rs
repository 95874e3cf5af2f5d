//! Bandwidth-enhanced additive synthesis.
//!
//! Partials are rendered independently (see [`oscillator`]) and summed into
//! an accumulating output buffer. Partials are grouped into fixed-size jobs;
//! each job renders into its own buffer on a worker thread and the job
//! buffers are added to the output in job order, so the result is the same
//! for any number of threads.
//!
//! Bandwidth is rendered the bandwidth-enhanced way: the noise multiplies
//! the carrier instead of being mixed in beside it, so a noisy partial is a
//! band of noise around its frequency rather than broadband hiss.

pub mod oscillator;
pub mod params;

#[cfg(test)]
mod tests;

use partita_model::{Partial, PartialList};
use tracing::debug;

pub use params::{NoiseFilterConfig, SynthesisParams};

use crate::error::{EngineError, EngineResult};
use crate::filter::FilterCascade;
use oscillator::{render_partial, sample_span, NoiseSource};

/// Partials rendered per job.
const JOB_SIZE: usize = 64;

/// Largest output buffer, in samples (about 6.7 hours at 44.1 kHz).
pub const MAX_OUTPUT_SAMPLES: usize = 1 << 30;

/// Renders partials into a sample buffer.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    params: SynthesisParams,
    samples: Vec<f64>,
}

/// Partials of one job with their positions in the input list.
struct Job<'a> {
    partials: Vec<(u64, &'a Partial)>,
    first: usize,
    last: usize,
}

impl Synthesizer {
    pub fn new(params: SynthesisParams) -> EngineResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            samples: Vec::new(),
        })
    }

    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    pub fn set_fade_time(&mut self, fade_time: f64) -> EngineResult<()> {
        let params = self.params.clone().with_fade_time(fade_time);
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) -> EngineResult<()> {
        let params = SynthesisParams {
            sample_rate,
            ..self.params.clone()
        };
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// The accumulated output.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut Vec<f64> {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Adds every partial of `partials` to the output buffer, growing it to
    /// cover the latest partial end plus the fade time.
    ///
    /// # Errors
    /// * `Configuration` - the fade time exceeds half the duration of the
    ///   shortest partial
    /// * `MalformedInput` - a partial holds a non-finite value
    pub fn synthesize(&mut self, partials: &PartialList) -> EngineResult<()> {
        let indexed: Vec<(u64, &Partial)> = partials
            .iter()
            .enumerate()
            .map(|(i, p)| (i as u64, p))
            .collect();
        self.render(&indexed)
    }

    /// Adds a single partial to the output buffer, using noise stream 0.
    pub fn synthesize_partial(&mut self, partial: &Partial) -> EngineResult<()> {
        self.render(&[(0, partial)])
    }

    fn render(&mut self, partials: &[(u64, &Partial)]) -> EngineResult<()> {
        let fade = self.params.fade_time;
        let sr = self.params.sample_rate;
        check_partials(partials, fade)?;

        let Some(end) = partials
            .iter()
            .filter(|(_, p)| !p.is_empty())
            .map(|(_, p)| p.end_time())
            .reduce(f64::max)
        else {
            return Ok(());
        };
        if end + fade >= 0.0 {
            let len = output_len(end + fade, sr)?;
            if self.samples.len() < len {
                self.samples.resize(len, 0.0);
            }
        }

        let filter = &self.params.filter;
        let noise = NoiseSource::new(
            FilterCascade::lowpass(filter.cutoff, filter.q, sr, filter.stages),
            self.params.seed,
        );
        let jobs = plan_jobs(partials, fade, sr, self.samples.len());
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, jobs.len().max(1));

        let rendered: Vec<Vec<f64>> = if threads == 1 {
            jobs.iter()
                .map(|job| render_job(job, fade, sr, &noise))
                .collect()
        } else {
            render_parallel(&jobs, threads, fade, sr, &noise)
        };

        for (job, buffer) in jobs.iter().zip(rendered) {
            for (out, x) in self.samples[job.first..=job.last].iter_mut().zip(buffer) {
                *out += x;
            }
        }

        debug!(
            partials = partials.len(),
            jobs = jobs.len(),
            threads,
            samples = self.samples.len(),
            "synthesized partials"
        );
        Ok(())
    }
}

/// Samples needed to cover `[0, end]` seconds, bounded by
/// [`MAX_OUTPUT_SAMPLES`].
fn output_len(end: f64, sample_rate: f64) -> EngineResult<usize> {
    let last = (end * sample_rate).floor();
    if !(last < MAX_OUTPUT_SAMPLES as f64) {
        return Err(EngineError::malformed(format!(
            "partials end at {} s, beyond the {} samples a synthesis buffer may hold",
            end, MAX_OUTPUT_SAMPLES
        )));
    }
    Ok(last as usize + 1)
}

/// Rejects non-finite partials and fade times longer than half the
/// shortest partial.
fn check_partials(partials: &[(u64, &Partial)], fade_time: f64) -> EngineResult<()> {
    let mut shortest = f64::INFINITY;
    for (index, partial) in partials {
        if !partial.is_finite() {
            return Err(EngineError::malformed(format!(
                "partial {} has a non-finite time or parameter",
                index
            )));
        }
        if partial.len() >= 2 {
            shortest = shortest.min(partial.duration());
        }
    }
    if fade_time > 0.5 * shortest + Partial::SHORTEST_SAFE_FADE_TIME {
        return Err(EngineError::config(
            "fade_time",
            format!(
                "{} s exceeds half the shortest partial duration ({} s)",
                fade_time, shortest
            ),
        ));
    }
    Ok(())
}

fn plan_jobs<'a>(
    partials: &[(u64, &'a Partial)],
    fade_time: f64,
    sample_rate: f64,
    len: usize,
) -> Vec<Job<'a>> {
    partials
        .chunks(JOB_SIZE)
        .filter_map(|chunk| {
            let spans: Vec<(usize, usize)> = chunk
                .iter()
                .filter_map(|(_, p)| sample_span(p, fade_time, sample_rate, len))
                .collect();
            let first = spans.iter().map(|s| s.0).min()?;
            let last = spans.iter().map(|s| s.1).max()?;
            Some(Job {
                partials: chunk.to_vec(),
                first,
                last,
            })
        })
        .collect()
}

fn render_job(job: &Job<'_>, fade_time: f64, sample_rate: f64, noise: &NoiseSource) -> Vec<f64> {
    let mut buffer = vec![0.0; job.last - job.first + 1];
    for &(index, partial) in &job.partials {
        render_partial(partial, index, fade_time, sample_rate, noise, job.first, &mut buffer);
    }
    buffer
}

fn render_parallel(
    jobs: &[Job<'_>],
    threads: usize,
    fade_time: f64,
    sample_rate: f64,
    noise: &NoiseSource,
) -> Vec<Vec<f64>> {
    let mut rendered: Vec<Vec<f64>> = vec![Vec::new(); jobs.len()];
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                scope.spawn(move || {
                    (worker..jobs.len())
                        .step_by(threads)
                        .map(|j| (j, render_job(&jobs[j], fade_time, sample_rate, noise)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            // A panicking worker re-raises its panic here.
            let results = match handle.join() {
                Ok(results) => results,
                Err(payload) => std::panic::resume_unwind(payload),
            };
            for (j, buffer) in results {
                rendered[j] = buffer;
            }
        }
    });
    rendered
}
