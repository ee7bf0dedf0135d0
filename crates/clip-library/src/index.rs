//! Note lookup over a scanned library.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use montage_common::error::MontageResult;
use montage_media_model::clip::LibraryClip;
use montage_media_model::note::{filename_key, note_name_to_midi};
use rand::RngCore;

use crate::scan::LibraryScanner;
use crate::select::SelectionStrategy;

/// All clips of one library root, built once per composite run.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    root: PathBuf,
    clips: Vec<LibraryClip>,
}

impl LibraryIndex {
    /// Scan `root` with `scanner` and index the result.
    pub fn build(root: impl Into<PathBuf>, scanner: &dyn LibraryScanner) -> MontageResult<Self> {
        let root = root.into();
        let clips = scanner.scan(&root)?;
        let index = Self::from_clips(root, clips);
        tracing::info!(
            root = %index.root.display(),
            clips = index.clips.len(),
            notes = ?index.note_counts(),
            "Clip library indexed"
        );
        Ok(index)
    }

    pub fn from_clips(root: impl Into<PathBuf>, clips: Vec<LibraryClip>) -> Self {
        Self {
            root: root.into(),
            clips,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clips(&self) -> &[LibraryClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Number of clips per note found in file names, keyed by sharp spelling.
    pub fn note_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for pitch in self.clips.iter().filter_map(|c| c.inferred_pitch) {
            *counts.entry(pitch.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Clips whose file name contains the note, searching `category` first
    /// and the whole library if the category yields nothing.
    ///
    /// An unparseable note name yields no candidates.
    pub fn candidates(&self, note_name: &str, category: Option<&str>) -> Vec<&LibraryClip> {
        let midi = match note_name_to_midi(note_name) {
            Ok(midi) => midi,
            Err(err) => {
                tracing::warn!(note = note_name, error = %err, "Cannot map note name to a pitch");
                return Vec::new();
            }
        };

        let key = filename_key(note_name);
        tracing::trace!(note = note_name, midi, key = %key, "Matching library file names");
        let matches_note = |clip: &&LibraryClip| filename_key(&clip.file_name()).contains(&key);

        if let Some(category) = category {
            let category_root = self.root.join(category);
            let hinted: Vec<&LibraryClip> = self
                .clips
                .iter()
                .filter(|clip| clip.path.starts_with(&category_root))
                .filter(matches_note)
                .collect();
            if !hinted.is_empty() {
                return hinted;
            }
            tracing::debug!(
                note = note_name,
                category,
                "No clip in hinted category, searching whole library"
            );
        }

        self.clips.iter().filter(matches_note).collect()
    }

    /// Resolve a note to one clip, or `None` on a miss.
    pub fn lookup(
        &self,
        note_name: &str,
        category: Option<&str>,
        strategy: &dyn SelectionStrategy,
        rng: &mut dyn RngCore,
    ) -> Option<&LibraryClip> {
        let candidates = self.candidates(note_name, category);
        let chosen = strategy.choose(&candidates, rng);
        match chosen {
            Some(clip) => tracing::debug!(
                note = note_name,
                candidates = candidates.len(),
                clip = %clip.path.display(),
                "Selected library clip"
            ),
            None => tracing::warn!(
                note = note_name,
                category = category.unwrap_or("<none>"),
                "No suitable clip found"
            ),
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::FirstMatch;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn index(paths: &[&str]) -> LibraryIndex {
        let root = Path::new("/lib");
        let clips = paths
            .iter()
            .map(|p| LibraryClip::from_path(root, root.join(p)))
            .collect();
        LibraryIndex::from_clips(root, clips)
    }

    #[test]
    fn test_category_searched_first() {
        let index = index(&["drops/C4_a.mp4", "swings/C4_b.mp4"]);
        let found = index.candidates("C4", Some("swings"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name(), "C4_b.mp4");
    }

    #[test]
    fn test_falls_back_to_whole_library() {
        let index = index(&["drops/C4_a.mp4", "swings/D4_b.mp4"]);
        let found = index.candidates("C4", Some("swings"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name(), "C4_a.mp4");

        let found = index.candidates("C4", Some("no_such_category"));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_sharp_and_flat_match_s_spelling() {
        let index = index(&["drops/Cs5_take.mp4", "drops/G#3_take.mp4"]);
        assert_eq!(index.candidates("C#5", None).len(), 1);
        assert_eq!(index.candidates("Db5", None).len(), 1);
        assert_eq!(index.candidates("G#3", None).len(), 1);
        assert_eq!(index.candidates("Ab3", None).len(), 1);
        assert!(index.candidates("C5", None).is_empty());
    }

    #[test]
    fn test_flat_spelled_file_matches_both_spellings() {
        let index = index(&["drops/Db5_drop.mp4", "drops/Bb2_hit.mp4"]);
        for note in ["Db5", "C#5", "Cs5"] {
            let found = index.candidates(note, Some("drops"));
            assert_eq!(found.len(), 1, "{note}");
            assert_eq!(found[0].file_name(), "Db5_drop.mp4");
        }
        assert_eq!(index.candidates("A#2", None).len(), 1);
        assert!(index.candidates("D5", None).is_empty());
    }

    #[test]
    fn test_invalid_note_is_a_miss() {
        let index = index(&["drops/H4.mp4"]);
        assert!(index.candidates("H4", None).is_empty());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(index.lookup("H4", None, &FirstMatch, &mut rng).is_none());
    }

    #[test]
    fn test_note_counts() {
        let index = index(&["a/C4_1.mp4", "a/C4_2.mp4", "b/Db2_x.mp4", "b/intro.mp4"]);
        let counts = index.note_counts();
        assert_eq!(counts.get("C4"), Some(&2));
        assert_eq!(counts.get("C#2"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
