//! Montage Processing Core
//!
//! Decides what gets cut and where it goes:
//! - **Peaks:** Amplitude peak detection with non-maximum suppression
//! - **Windows:** Clip windows around peaks, clamped to the source
//! - **Fit:** Aspect-preserving sizing of clips into grid cells
//!
//! This crate is pure computation: no I/O, no media engine.
//! All inputs are data; all outputs are data.

pub mod fit;
pub mod peak;
pub mod window;

pub use fit::fit_within;
pub use peak::{PeakDetector, PeakDetectorConfig};
pub use window::{clip_window, plan_clip_windows, WindowPlan};
