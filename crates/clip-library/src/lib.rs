//! Montage Clip Library
//!
//! Maps note names to clips in a library directory laid out as
//! `<root>/<category>/.../<file containing the note name>.mp4`.
//! File names are the only index; there are no sidecar files.
//!
//! - **Scan:** Pluggable index-building step (directory walk by default)
//! - **Select:** Tie-breaking strategy among matching clips
//! - **Index:** Category-first lookup with whole-library fallback

pub mod index;
pub mod scan;
pub mod select;

pub use index::LibraryIndex;
pub use scan::{DirectoryScanner, LibraryScanner};
pub use select::{FirstMatch, SelectionStrategy, UniformRandom};
