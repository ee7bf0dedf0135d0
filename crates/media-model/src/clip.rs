//! Peak events, clip windows, and clip naming.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::note::{find_note_token, Pitch};

/// Shortest clip window worth rendering (seconds).
pub const MIN_CLIP_DURATION_SECS: f64 = 0.1;

/// File extensions (lowercase) treated as video sources and library clips.
pub const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "mov"];

/// Whether `path` has a recognized video extension (case-insensitive).
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// A detected amplitude peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakEvent {
    /// Index into the analyzed signal.
    pub sample_index: usize,
    /// `sample_index / sample_rate`.
    pub time_secs: f64,
}

/// A time range carved out of a source file.
///
/// Always satisfies `0 <= start < end <= source_duration` and
/// `end - start >= MIN_CLIP_DURATION_SECS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub source: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl ClipWindow {
    /// Validate and build a window, or `None` if it breaks the invariants.
    pub fn new(
        source: impl Into<PathBuf>,
        start_secs: f64,
        end_secs: f64,
        source_duration: f64,
    ) -> Option<Self> {
        let valid = start_secs.is_finite()
            && end_secs.is_finite()
            && start_secs >= 0.0
            && start_secs < end_secs
            && end_secs <= source_duration
            && end_secs - start_secs >= MIN_CLIP_DURATION_SECS;
        valid.then(|| Self {
            source: source.into(),
            start_secs,
            end_secs,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Deterministic name of an extracted clip:
/// `{base}_clip_{ordinal}_{peak_ms}ms_post{post}s.mp4`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedClipName {
    /// Source file stem.
    pub base: String,
    /// 1-based position of the peak within its source.
    pub ordinal: usize,
    /// Peak time truncated to whole milliseconds.
    pub peak_ms: u64,
    /// Post-roll used for this clip.
    pub post_secs: f64,
}

impl ExtractedClipName {
    pub fn new(base: impl Into<String>, ordinal: usize, peak_secs: f64, post_secs: f64) -> Self {
        Self {
            base: base.into(),
            ordinal,
            peak_ms: (peak_secs.max(0.0) * 1000.0) as u64,
            post_secs,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_clip_{}_{}ms_post{}s.mp4",
            self.base,
            self.ordinal,
            self.peak_ms,
            format_secs(self.post_secs)
        )
    }
}

/// Seconds with at least one decimal place: `2.0`, `2.5`, `0.25`.
pub fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 && secs.is_finite() {
        format!("{secs:.1}")
    } else {
        format!("{secs}")
    }
}

/// A clip found in the note library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryClip {
    pub path: PathBuf,

    /// First directory below the library root, if the clip is not at the root.
    pub category: Option<String>,

    /// Note token found in the file name, if any.
    #[serde(skip)]
    pub inferred_pitch: Option<Pitch>,
}

impl LibraryClip {
    /// Describe a clip at `path` under `root`.
    pub fn from_path(root: &Path, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let category = path
            .strip_prefix(root)
            .ok()
            .and_then(|rel| {
                let mut components = rel.components();
                let first = components.next()?;
                // A bare file name at the root has no category.
                components.next()?;
                Some(first.as_os_str().to_string_lossy().into_owned())
            });
        let inferred_pitch = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(find_note_token);
        Self {
            path,
            category,
            inferred_pitch,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
