//! Montage Media Model
//!
//! Defines the data contracts shared by both pipelines:
//! - **Signal:** Decoded mono amplitude samples used for peak detection
//! - **Clip:** Peak events, clip windows, and the self-describing names of
//!   extracted clips and library entries
//! - **Note:** Timeline note events and the note-name to pitch mapping
//! - **Grid:** Canvas sizing, grid cells, and the FIFO position pool
//!
//! All times are in seconds as `f64`; all pixel values are `u32`.

pub mod clip;
pub mod grid;
pub mod note;
pub mod signal;

pub use clip::*;
pub use grid::*;
pub use note::*;
pub use signal::*;
