//! Clip extraction: cut short clips around loud moments of every source video.

use std::path::{Path, PathBuf};

use montage_common::error::{MontageError, MontageResult};
use montage_media_model::clip::is_video_file;
use montage_processing_core::peak::{PeakDetector, PeakDetectorConfig};
use montage_processing_core::window::{plan_clip_windows, WindowPlan};

use crate::media::{EncodeSettings, MediaEngine, Progress, ProgressCallback, Stage};

/// Parameters of one extraction batch.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub pre_secs: f64,
    /// Every peak is cut once per value, in order.
    pub post_secs_values: Vec<f64>,
    pub detector: PeakDetectorConfig,
    pub encode: EncodeSettings,
}

impl ExtractionRequest {
    pub fn validate(&self) -> MontageResult<()> {
        self.detector.validate()?;
        if !(self.pre_secs.is_finite() && self.pre_secs >= 0.0) {
            return Err(MontageError::config(format!(
                "pre-roll must be non-negative, got {}",
                self.pre_secs
            )));
        }
        if self.post_secs_values.is_empty() {
            return Err(MontageError::config("no post-roll values given"));
        }
        if let Some(bad) = self
            .post_secs_values
            .iter()
            .find(|v| !(v.is_finite() && **v >= 0.0))
        {
            return Err(MontageError::config(format!(
                "post-roll values must be non-negative, got {bad}"
            )));
        }
        Ok(())
    }
}

/// Why a source produced nothing without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoAudioTrack,
    NoPeaks,
}

/// What happened to one source file.
#[derive(Debug)]
pub enum SourceOutcome {
    Extracted {
        clips: Vec<PathBuf>,
        /// Windows dropped for being shorter than the minimum clip length.
        too_short: usize,
    },
    Skipped(SkipReason),
    /// `written` holds clips that reached disk before the failure.
    Failed {
        error: MontageError,
        written: Vec<PathBuf>,
    },
}

#[derive(Debug)]
pub struct SourceReport {
    pub source: PathBuf,
    pub outcome: SourceOutcome,
}

/// Per-source results of one batch, in processing order.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub sources: Vec<SourceReport>,
}

impl ExtractionReport {
    /// All written clip files, including those of sources that failed midway.
    pub fn clips(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|r| match &r.outcome {
                SourceOutcome::Extracted { clips, .. } => Some(clips),
                SourceOutcome::Failed { written, .. } => Some(written),
                SourceOutcome::Skipped(_) => None,
            })
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn clip_count(&self) -> usize {
        self.clips().len()
    }

    pub fn skipped(&self) -> usize {
        self.sources
            .iter()
            .filter(|r| matches!(r.outcome, SourceOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.sources
            .iter()
            .filter(|r| matches!(r.outcome, SourceOutcome::Failed { .. }))
            .count()
    }
}

/// Runs extraction batches against a [`MediaEngine`].
pub struct ClipExtractor<'e> {
    engine: &'e dyn MediaEngine,
    request: ExtractionRequest,
}

impl<'e> ClipExtractor<'e> {
    pub fn new(engine: &'e dyn MediaEngine, request: ExtractionRequest) -> Self {
        Self { engine, request }
    }

    pub fn request(&self) -> &ExtractionRequest {
        &self.request
    }

    /// Video files directly inside the input directory, sorted by name.
    pub fn list_sources(&self) -> MontageResult<Vec<PathBuf>> {
        let input_dir = &self.request.input_dir;
        if !input_dir.is_dir() {
            return Err(MontageError::FileNotFound {
                path: input_dir.clone(),
            });
        }

        let mut sources = Vec::new();
        for entry in std::fs::read_dir(input_dir)? {
            let path = entry?.path();
            if path.is_file() && is_video_file(&path) {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Process every source. Per-file problems end up in the report; only
    /// invalid parameters, a missing input directory, or an unusable engine
    /// abort the batch.
    pub fn run(&self, progress: Option<&ProgressCallback>) -> MontageResult<ExtractionReport> {
        self.request.validate()?;
        if !self.engine.is_available() {
            return Err(MontageError::media(format!(
                "media engine '{}' is not available",
                self.engine.name()
            )));
        }

        let sources = self.list_sources()?;
        std::fs::create_dir_all(&self.request.output_dir)?;

        if sources.is_empty() {
            tracing::warn!(
                input_dir = %self.request.input_dir.display(),
                "No video files found in input directory"
            );
            return Ok(ExtractionReport::default());
        }

        tracing::info!(
            sources = sources.len(),
            pre_secs = self.request.pre_secs,
            post_secs = ?self.request.post_secs_values,
            threshold = self.request.detector.threshold,
            engine = self.engine.name(),
            "Starting clip extraction"
        );

        let total = sources.len() as u64;
        let mut report = ExtractionReport::default();
        for (i, source) in sources.into_iter().enumerate() {
            if let Some(cb) = progress {
                cb(Progress {
                    stage: Stage::Extracting,
                    completed: i as u64,
                    total,
                });
            }

            let outcome = match self.process_source(&source) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(
                        source = %source.display(),
                        error = %err,
                        "Failed to process source, continuing with next file"
                    );
                    SourceOutcome::Failed {
                        error: err,
                        written: Vec::new(),
                    }
                }
            };
            report.sources.push(SourceReport { source, outcome });
        }

        if let Some(cb) = progress {
            cb(Progress {
                stage: Stage::Complete,
                completed: total,
                total,
            });
        }

        tracing::info!(
            clips = report.clip_count(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Clip extraction finished"
        );
        Ok(report)
    }

    fn process_source(&self, source: &Path) -> MontageResult<SourceOutcome> {
        let info = self.engine.probe(source)?;
        if !info.has_audio() {
            tracing::info!(source = %source.display(), "No audio track, skipping");
            return Ok(SourceOutcome::Skipped(SkipReason::NoAudioTrack));
        }

        let signal = self.engine.decode_audio(source, &info)?;
        let peaks: Vec<_> = PeakDetector::new(self.request.detector)
            .detect(&signal)
            .collect();
        if peaks.is_empty() {
            tracing::info!(
                source = %source.display(),
                threshold = self.request.detector.threshold,
                "No peaks above threshold"
            );
            return Ok(SourceOutcome::Skipped(SkipReason::NoPeaks));
        }
        tracing::info!(source = %source.display(), peaks = peaks.len(), "Detected audio peaks");

        let base_name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let plans = plan_clip_windows(
            source,
            &base_name,
            &peaks,
            self.request.pre_secs,
            &self.request.post_secs_values,
            info.duration_secs,
        );

        let mut clips = Vec::new();
        let mut too_short = 0;
        for plan in plans {
            match plan {
                WindowPlan::Render { window, name } => {
                    let output = self.request.output_dir.join(name.file_name());
                    let result = self
                        .engine
                        .write_subclip(&window, &output, &self.request.encode);
                    if let Err(e) = result {
                        let error = MontageError::extraction(format!(
                            "{} at {:.3}s: {e}",
                            source.display(),
                            window.start_secs
                        ));
                        tracing::error!(
                            source = %source.display(),
                            error = %error,
                            written = ?clips,
                            "Clip write failed, clips already written are kept"
                        );
                        return Ok(SourceOutcome::Failed {
                            error,
                            written: clips,
                        });
                    }
                    tracing::debug!(
                        output = %output.display(),
                        start_secs = window.start_secs,
                        end_secs = window.end_secs,
                        "Wrote clip"
                    );
                    clips.push(output);
                }
                WindowPlan::TooShort {
                    ordinal,
                    peak_secs,
                    post_secs,
                } => {
                    tracing::warn!(
                        source = %source.display(),
                        ordinal,
                        peak_secs,
                        post_secs,
                        "Clip window too short, skipping"
                    );
                    too_short += 1;
                }
            }
        }

        Ok(SourceOutcome::Extracted { clips, too_short })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(post: Vec<f64>) -> ExtractionRequest {
        ExtractionRequest {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            pre_secs: 3.0,
            post_secs_values: post,
            detector: PeakDetectorConfig::default(),
            encode: EncodeSettings::clip_defaults(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(request(vec![2.0, 3.5]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(request(vec![]).validate().is_err());
        assert!(request(vec![-1.0]).validate().is_err());

        let mut req = request(vec![2.0]);
        req.pre_secs = f64::NAN;
        assert!(req.validate().is_err());

        let mut req = request(vec![2.0]);
        req.detector = PeakDetectorConfig::with_threshold(1.5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_report_counts() {
        let report = ExtractionReport {
            sources: vec![
                SourceReport {
                    source: PathBuf::from("a.mp4"),
                    outcome: SourceOutcome::Extracted {
                        clips: vec![PathBuf::from("a_1"), PathBuf::from("a_2")],
                        too_short: 1,
                    },
                },
                SourceReport {
                    source: PathBuf::from("b.mp4"),
                    outcome: SourceOutcome::Skipped(SkipReason::NoAudioTrack),
                },
                SourceReport {
                    source: PathBuf::from("c.mp4"),
                    outcome: SourceOutcome::Failed {
                        error: MontageError::media("corrupt"),
                        written: Vec::new(),
                    },
                },
                SourceReport {
                    source: PathBuf::from("d.mp4"),
                    outcome: SourceOutcome::Failed {
                        error: MontageError::extraction("disk full"),
                        written: vec![PathBuf::from("d_1")],
                    },
                },
            ],
        };
        assert_eq!(report.clip_count(), 3);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 2);
    }
}
