//! Choosing one clip among several that match the same note.

use montage_media_model::clip::LibraryClip;
use rand::seq::IndexedRandom;
use rand::RngCore;

/// Picks one candidate. Implementations must be pure apart from `rng`.
pub trait SelectionStrategy {
    fn choose<'a>(
        &self,
        candidates: &[&'a LibraryClip],
        rng: &mut dyn RngCore,
    ) -> Option<&'a LibraryClip>;
}

/// Uniform random choice, for visual variety across repeated notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandom;

impl SelectionStrategy for UniformRandom {
    fn choose<'a>(
        &self,
        candidates: &[&'a LibraryClip],
        rng: &mut dyn RngCore,
    ) -> Option<&'a LibraryClip> {
        candidates.choose(rng).copied()
    }
}

/// Always the first candidate in scan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl SelectionStrategy for FirstMatch {
    fn choose<'a>(
        &self,
        candidates: &[&'a LibraryClip],
        _rng: &mut dyn RngCore,
    ) -> Option<&'a LibraryClip> {
        candidates.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::path::Path;

    fn clips() -> Vec<LibraryClip> {
        ["a/C4_1.mp4", "a/C4_2.mp4", "b/C4_3.mp4"]
            .iter()
            .map(|p| LibraryClip::from_path(Path::new(""), *p))
            .collect()
    }

    #[test]
    fn test_first_match_is_deterministic() {
        let clips = clips();
        let refs: Vec<&LibraryClip> = clips.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        let chosen = FirstMatch.choose(&refs, &mut rng).unwrap();
        assert_eq!(chosen.file_name(), "C4_1.mp4");
        assert!(FirstMatch.choose(&[], &mut rng).is_none());
    }

    #[test]
    fn test_uniform_random_reaches_every_candidate() {
        let clips = clips();
        let refs: Vec<&LibraryClip> = clips.iter().collect();
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<String> = (0..200)
            .filter_map(|_| UniformRandom.choose(&refs, &mut rng))
            .map(LibraryClip::file_name)
            .collect();
        assert_eq!(seen.len(), 3);
        assert!(UniformRandom.choose(&[], &mut rng).is_none());
    }

    #[test]
    fn test_uniform_random_is_reproducible_with_seed() {
        let clips = clips();
        let refs: Vec<&LibraryClip> = clips.iter().collect();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .filter_map(|_| UniformRandom.choose(&refs, &mut rng))
                .map(LibraryClip::file_name)
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }
}
