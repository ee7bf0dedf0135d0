//! Montage Render Engine
//!
//! Everything that touches media files: the [`MediaEngine`] seam with its
//! ffmpeg implementation, the peak-driven clip extractor, and the grid
//! montage compositor.
//!
//! # Pipeline Architecture
//!
//! ```text
//! sources/*.mp4 ── probe ── decode audio ── peaks ── windows ── subclips
//!                                                                  │
//!                                                          library/<category>/
//!                                                                  │
//! notes.json ── lookup ── position pool ── fit to cell ── overlay ─┤
//!                                                                  ├── audio concat | mix
//!                                                                  ▼
//!                                                   rotate? ── encode ── montage.mp4
//! ```

pub mod compositor;
pub mod extract;
pub mod ffmpeg;
pub mod media;

pub use compositor::{
    CompositePlan, CompositeReport, CompositeSettings, EventOutcome, EventSkip, Placement,
    TimelineCompositor,
};
pub use extract::{
    ClipExtractor, ExtractionReport, ExtractionRequest, SkipReason, SourceOutcome, SourceReport,
};
pub use ffmpeg::FfmpegEngine;
pub use media::*;
