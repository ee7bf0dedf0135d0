//! Timeline compositor: lays note-triggered library clips out on a grid.
//!
//! Every note event resolves to one library clip, which gets the next grid
//! position from a shuffled FIFO pool and starts at the event's time. The
//! clips are drawn in event order over a black canvas that lasts one second
//! past the last event.

use std::path::{Path, PathBuf};

use montage_clip_library::index::LibraryIndex;
use montage_clip_library::select::{SelectionStrategy, UniformRandom};
use montage_common::config::{AudioMixMode, MontageConfig};
use montage_common::error::{MontageError, MontageResult};
use montage_media_model::clip::LibraryClip;
use montage_media_model::grid::{Canvas, GridCell, GridLayout, GridSize, PositionPool};
use montage_media_model::note::{timeline_duration, NoteEvent};
use montage_processing_core::fit::fit_within;
use rand::RngCore;

use crate::media::{
    AudioSegment, CompositeJob, EncodeSettings, MediaEngine, Progress, ProgressCallback, Stage,
    VideoLayer,
};

/// Output shape and encoding of a montage.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSettings {
    pub grid: GridSize,
    /// Final output size, after any rotation.
    pub target: Canvas,
    pub rotate_ccw_90: bool,
    pub pre_roll_secs: f64,
    pub audio_mode: AudioMixMode,
    pub encode: EncodeSettings,
}

impl CompositeSettings {
    pub fn from_config(config: &MontageConfig, grid: GridSize) -> Self {
        Self {
            grid,
            target: Canvas::new(
                config.output_video_width_phone(),
                config.output_video_height_phone(),
            ),
            rotate_ccw_90: config.rotate_final_video_ccw_90(),
            pre_roll_secs: config.pre_roll_duration_seconds(),
            audio_mode: config.audio_mix_mode(),
            encode: EncodeSettings::from_config(config),
        }
    }

    /// Canvas the grid is laid out on.
    pub fn canvas(&self) -> Canvas {
        Canvas::pre_rotation(self.target, self.rotate_ccw_90)
    }
}

/// Why an event contributed nothing without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSkip {
    NoMatchingClip,
}

/// Where a resolved clip ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub clip: LibraryClip,
    pub cell: GridCell,
    pub start_secs: f64,
    pub size: Canvas,
    pub has_audio: bool,
}

#[derive(Debug)]
pub enum EventOutcome {
    Placed(Placement),
    Skipped(EventSkip),
    Failed(MontageError),
}

/// A render job together with what happened to each event.
#[derive(Debug)]
pub struct CompositePlan {
    pub job: CompositeJob,
    /// One entry per input event, in input order.
    pub outcomes: Vec<EventOutcome>,
}

/// Summary of a finished montage.
#[derive(Debug)]
pub struct CompositeReport {
    pub output: PathBuf,
    pub duration_secs: f64,
    /// Size of the written video.
    pub canvas: Canvas,
    pub events: Vec<EventOutcome>,
    pub audio_segments: usize,
}

impl CompositeReport {
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.events.iter().filter_map(|e| match e {
            EventOutcome::Placed(p) => Some(p),
            _ => None,
        })
    }

    pub fn placed(&self) -> usize {
        self.placements().count()
    }

    pub fn skipped(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EventOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EventOutcome::Failed(_)))
            .count()
    }
}

pub struct TimelineCompositor<'a> {
    engine: &'a dyn MediaEngine,
    index: &'a LibraryIndex,
    settings: CompositeSettings,
    strategy: Box<dyn SelectionStrategy>,
}

impl<'a> TimelineCompositor<'a> {
    /// Compositor that breaks ties between matching clips at random.
    pub fn new(
        engine: &'a dyn MediaEngine,
        index: &'a LibraryIndex,
        settings: CompositeSettings,
    ) -> Self {
        Self {
            engine,
            index,
            settings,
            strategy: Box::new(UniformRandom),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn SelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn settings(&self) -> &CompositeSettings {
        &self.settings
    }

    /// Resolve every event and build the render job without rendering.
    ///
    /// `rng` drives the position shuffle and clip tie-breaking.
    pub fn plan(
        &self,
        events: &[NoteEvent],
        rng: &mut dyn RngCore,
    ) -> MontageResult<CompositePlan> {
        self.plan_with_progress(events, rng, None)
    }

    fn plan_with_progress(
        &self,
        events: &[NoteEvent],
        rng: &mut dyn RngCore,
        progress: Option<&ProgressCallback>,
    ) -> MontageResult<CompositePlan> {
        if events.is_empty() {
            return Err(MontageError::precondition("Notes list is empty"));
        }

        let valid: Vec<NoteEvent> = events
            .iter()
            .filter(|e| has_valid_timing(e))
            .cloned()
            .collect();
        let duration_secs = timeline_duration(&valid)
            .ok_or_else(|| MontageError::precondition("No note event has a usable time range"))?;

        let canvas = self.settings.canvas();
        let layout = GridLayout::new(self.settings.grid, canvas);
        let cell_bounds = Canvas::new(layout.cell_width, layout.cell_height);
        let mut pool = PositionPool::shuffled(self.settings.grid, &mut *rng);
        let pre_roll = self.settings.pre_roll_secs.max(0.0);

        tracing::info!(
            events = events.len(),
            duration_secs,
            grid = %self.settings.grid,
            canvas_width = canvas.width,
            canvas_height = canvas.height,
            "Planning montage"
        );

        let mut layers = Vec::new();
        let mut audio = Vec::new();
        let mut outcomes = Vec::with_capacity(events.len());
        let total = events.len() as u64;

        for (i, event) in events.iter().enumerate() {
            if let Some(cb) = progress {
                cb(Progress {
                    stage: Stage::Preparing,
                    completed: i as u64,
                    total,
                });
            }

            if !has_valid_timing(event) {
                tracing::warn!(
                    note = %event.note_name,
                    time = event.time,
                    duration = event.duration,
                    "Note event has an invalid time range, skipping"
                );
                outcomes.push(EventOutcome::Failed(MontageError::composite(format!(
                    "invalid time range for note {} (time {}, duration {})",
                    event.note_name, event.time, event.duration
                ))));
                continue;
            }

            let Some(clip) = self.index.lookup(
                &event.note_name,
                event.category(),
                self.strategy.as_ref(),
                rng,
            ) else {
                outcomes.push(EventOutcome::Skipped(EventSkip::NoMatchingClip));
                continue;
            };

            let info = match self.engine.probe(&clip.path) {
                Ok(info) => info,
                Err(err) => {
                    tracing::error!(
                        note = %event.note_name,
                        time = event.time,
                        clip = %clip.path.display(),
                        error = %err,
                        "Failed to open library clip, skipping event"
                    );
                    outcomes.push(EventOutcome::Failed(err));
                    continue;
                }
            };

            // The pool always holds every grid position.
            let Some((row, col)) = pool.next_position() else {
                return Err(MontageError::composite("grid has no positions"));
            };
            let cell = layout.cell(row, col);
            let size = fit_within(info.frame_size(), cell_bounds);

            layers.push(VideoLayer {
                source: clip.path.clone(),
                start_secs: event.time,
                pre_roll_secs: pre_roll,
                x: cell.x,
                y: cell.y,
                size,
            });

            let has_audio = info.has_audio();
            if has_audio {
                audio.push(AudioSegment {
                    source: clip.path.clone(),
                    start_secs: event.time + pre_roll,
                    duration_secs: event.duration.min(info.duration_secs),
                });
            }

            tracing::debug!(
                note = %event.note_name,
                time = event.time,
                row,
                col,
                clip = %clip.path.display(),
                "Placed clip"
            );
            outcomes.push(EventOutcome::Placed(Placement {
                clip: clip.clone(),
                cell,
                start_secs: event.time,
                size,
                has_audio,
            }));
        }

        if layers.is_empty() {
            return Err(MontageError::precondition(format!(
                "None of the {} note events resolved to a usable clip",
                events.len()
            )));
        }
        if audio.is_empty() {
            tracing::warn!("No placed clip has audio, the montage will be silent");
        }

        Ok(CompositePlan {
            job: CompositeJob {
                canvas,
                duration_secs,
                layers,
                audio,
                audio_mode: self.settings.audio_mode,
                rotate_ccw_90: self.settings.rotate_ccw_90,
            },
            outcomes,
        })
    }

    /// Plan and render a montage to `output`.
    ///
    /// The video is rendered next to `output` under a `.partial` name and
    /// moved into place only after the engine succeeds.
    pub fn compose(
        &self,
        events: &[NoteEvent],
        output: &Path,
        rng: &mut dyn RngCore,
        progress: Option<&ProgressCallback>,
    ) -> MontageResult<CompositeReport> {
        if events.is_empty() {
            return Err(MontageError::precondition("Notes list is empty"));
        }
        if !self.engine.is_available() {
            return Err(MontageError::media(format!(
                "media engine '{}' is not available",
                self.engine.name()
            )));
        }

        let plan = self.plan_with_progress(events, rng, progress)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let partial = partial_path(output);

        tracing::info!(
            output = %output.display(),
            layers = plan.job.layers.len(),
            audio_segments = plan.job.audio.len(),
            audio_mode = ?plan.job.audio_mode,
            rotate_ccw_90 = plan.job.rotate_ccw_90,
            engine = self.engine.name(),
            "Rendering montage"
        );

        if let Err(err) =
            self.engine
                .render_composite(&plan.job, &partial, &self.settings.encode, progress)
        {
            discard(&partial);
            return Err(err);
        }
        if let Err(err) = std::fs::rename(&partial, output) {
            discard(&partial);
            return Err(err.into());
        }

        let report = CompositeReport {
            output: output.to_path_buf(),
            duration_secs: plan.job.duration_secs,
            canvas: self.settings.target,
            audio_segments: plan.job.audio.len(),
            events: plan.outcomes,
        };
        tracing::info!(
            output = %report.output.display(),
            placed = report.placed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Montage written"
        );
        Ok(report)
    }
}

fn has_valid_timing(event: &NoteEvent) -> bool {
    event.time.is_finite()
        && event.duration.is_finite()
        && event.time >= 0.0
        && event.duration > 0.0
}

/// `dir/name.mp4` -> `dir/name.partial.mp4`.
fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "montage".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    output.with_file_name(format!("{stem}.partial.{ext}"))
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "Failed to remove partial output");
        }
    }
}
