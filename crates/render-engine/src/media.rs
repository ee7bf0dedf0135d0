//! The media engine contract and the jobs handed to it.
//!
//! The pipelines never touch containers or codecs directly. They describe
//! what they want (a probe, a decoded signal, a sub-range, a composite) and a
//! [`MediaEngine`] carries it out.

use std::path::{Path, PathBuf};

use montage_common::config::{defaults, AudioMixMode, MontageConfig};
use montage_common::error::MontageResult;
use montage_media_model::clip::ClipWindow;
use montage_media_model::grid::Canvas;
use montage_media_model::signal::AudioSignal;

/// What a probe reports about a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    /// `None` when the file has no audio stream.
    pub audio: Option<AudioStreamInfo>,
}

/// First audio stream of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u32,
}

impl MediaInfo {
    pub fn frame_size(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// Encoder parameters for a written file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    /// Output frame rate; `None` keeps the source rate.
    pub fps: Option<u32>,
    /// Video bitrate in ffmpeg notation (`5000k`); `None` lets the encoder decide.
    pub bitrate: Option<String>,
}

impl EncodeSettings {
    /// H.264/AAC at source frame rate, used for extracted clips.
    pub fn clip_defaults() -> Self {
        Self {
            video_codec: defaults::OUTPUT_VIDEO_CODEC.to_string(),
            audio_codec: defaults::OUTPUT_AUDIO_CODEC.to_string(),
            fps: None,
            bitrate: None,
        }
    }

    /// Montage output settings from the config file.
    pub fn from_config(config: &MontageConfig) -> Self {
        Self {
            video_codec: config.output_video_codec(),
            audio_codec: defaults::OUTPUT_AUDIO_CODEC.to_string(),
            fps: Some(config.output_video_fps()),
            bitrate: Some(config.output_video_bitrate()),
        }
    }
}

/// One clip placed on the montage canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoLayer {
    pub source: PathBuf,
    /// When the layer (including its pre-roll) appears on the timeline.
    pub start_secs: f64,
    /// Black, silent lead-in before the clip's first frame.
    pub pre_roll_secs: f64,
    /// Top-left pixel offset on the pre-rotation canvas.
    pub x: u32,
    pub y: u32,
    /// Size after the aspect-preserving fit into the cell.
    pub size: Canvas,
}

/// Audio taken from a placed clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub source: PathBuf,
    /// Intended start on the timeline; only honored in [`AudioMixMode::Mix`].
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Everything needed to render one montage.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeJob {
    /// Pre-rotation canvas size.
    pub canvas: Canvas,
    pub duration_secs: f64,
    /// Drawn in order over a black background; later layers cover earlier ones.
    pub layers: Vec<VideoLayer>,
    pub audio: Vec<AudioSegment>,
    pub audio_mode: AudioMixMode,
    pub rotate_ccw_90: bool,
}

/// Progress callback for long-running pipeline steps.
pub type ProgressCallback = Box<dyn Fn(Progress) + Send>;

/// Progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub stage: Stage,
    /// Items (files, events) or per-mille of render time completed.
    pub completed: u64,
    pub total: u64,
}

/// Pipeline stages reported through [`ProgressCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Preparing,
    Rendering,
    Complete,
}

/// Narrow interface to the decode/encode machinery.
pub trait MediaEngine {
    /// Duration, frame size, and audio stream parameters of a file.
    fn probe(&self, path: &Path) -> MontageResult<MediaInfo>;

    /// First audio channel of `path` as f32 samples at the native rate.
    fn decode_audio(&self, path: &Path, info: &MediaInfo) -> MontageResult<AudioSignal>;

    /// Encode `window` of its source to `output`.
    fn write_subclip(
        &self,
        window: &ClipWindow,
        output: &Path,
        settings: &EncodeSettings,
    ) -> MontageResult<()>;

    /// Render a full montage to `output`.
    fn render_composite(
        &self,
        job: &CompositeJob,
        output: &Path,
        settings: &EncodeSettings,
        progress: Option<&ProgressCallback>,
    ) -> MontageResult<()>;

    /// Check if this engine can run on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}
