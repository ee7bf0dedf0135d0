use std::path::Path;

use montage_clip_library::{DirectoryScanner, FirstMatch, LibraryIndex, UniformRandom};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

#[test]
fn note_in_one_hinted_file_resolves_to_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("drops/A4_hole_in_one.mp4"));
    touch(&root.join("drops/B4_lipout.mp4"));
    touch(&root.join("swings/C4_drive.mp4"));

    let index = LibraryIndex::build(root, &DirectoryScanner).unwrap();
    assert_eq!(index.len(), 3);

    let mut rng = StdRng::seed_from_u64(3);
    let clip = index
        .lookup("A4", Some("drops"), &UniformRandom, &mut rng)
        .expect("A4 should resolve");
    assert_eq!(clip.path, root.join("drops/A4_hole_in_one.mp4"));
}

#[test]
fn absent_note_is_a_miss_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("drops/A4_hole_in_one.mp4"));

    let index = LibraryIndex::build(root, &DirectoryScanner).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    assert!(index.lookup("F#2", Some("drops"), &UniformRandom, &mut rng).is_none());
    assert!(index.lookup("F#2", None, &FirstMatch, &mut rng).is_none());
    assert!(index.lookup("not-a-note", None, &FirstMatch, &mut rng).is_none());
}

#[test]
fn rebuild_sees_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("drops/A4_one.mp4"));
    let before = LibraryIndex::build(root, &DirectoryScanner).unwrap();

    touch(&root.join("drops/A4_two.mp4"));
    let after = LibraryIndex::build(root, &DirectoryScanner).unwrap();

    assert_eq!(before.candidates("A4", None).len(), 1);
    assert_eq!(after.candidates("A4", None).len(), 2);
}
