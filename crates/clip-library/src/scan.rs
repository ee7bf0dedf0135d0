//! Building the list of library clips.

use std::path::Path;

use montage_common::error::{MontageError, MontageResult};
use montage_media_model::clip::{is_video_file, LibraryClip};
use walkdir::WalkDir;

/// Produces the clips an index is built from. Invoked once per index build;
/// nothing is cached between runs.
pub trait LibraryScanner {
    fn scan(&self, root: &Path) -> MontageResult<Vec<LibraryClip>>;
}

/// Recursively walks the library root for video files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryScanner;

impl LibraryScanner for DirectoryScanner {
    fn scan(&self, root: &Path) -> MontageResult<Vec<LibraryClip>> {
        if !root.exists() {
            return Err(MontageError::FileNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(MontageError::library(format!(
                "library root {} is not a directory",
                root.display()
            )));
        }

        let mut clips = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable library entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && is_video_file(entry.path()) {
                clips.push(LibraryClip::from_path(root, entry.into_path()));
            }
        }

        tracing::debug!(root = %root.display(), clips = clips.len(), "Scanned clip library");
        Ok(clips)
    }
}
