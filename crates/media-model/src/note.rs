//! Note events and the note-name to pitch mapping.
//!
//! Note names are a pitch class followed by a non-negative octave, e.g. `C4`,
//! `G#5`, `Bb3`. Flat spellings are rewritten to their sharp equivalent before
//! anything else happens, so `Db5` and `C#5` are the same note everywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The twelve pitch classes in sharp spelling; the index is the MIDI offset.
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FLAT_TO_SHARP: [(&str, &str); 5] = [
    ("Db", "C#"),
    ("Eb", "D#"),
    ("Gb", "F#"),
    ("Ab", "G#"),
    ("Bb", "A#"),
];

/// Seconds of black tail appended after the last note ends.
pub const TIMELINE_TAIL_SECS: f64 = 1.0;

/// Errors from note-name parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("unknown pitch class in note name {name:?}")]
    UnknownPitchClass { name: String },

    #[error("missing or invalid octave in note name {name:?}")]
    InvalidOctave { name: String },
}

/// Rewrite flat spellings (`Db`, `Eb`, `Gb`, `Ab`, `Bb`) to sharps.
pub fn normalize_flats(name: &str) -> String {
    FLAT_TO_SHARP
        .iter()
        .fold(name.to_string(), |acc, (flat, sharp)| acc.replace(flat, sharp))
}

/// Filesystem-safe form of a note name used for filename matching:
/// flats become sharps and `#` becomes `s` (`Db5` -> `Cs5`).
pub fn filename_key(name: &str) -> String {
    normalize_flats(name).replace('#', "s")
}

/// A pitch class plus octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch {
    pitch_class: u8,
    octave: u32,
    midi: u32,
}

impl Pitch {
    /// MIDI-style identity: `pitch_class_offset + (octave + 1) * 12`.
    pub fn midi(&self) -> u32 {
        self.midi
    }

    pub fn pitch_class(&self) -> u8 {
        self.pitch_class
    }

    pub fn octave(&self) -> u32 {
        self.octave
    }
}

impl FromStr for Pitch {
    type Err = NoteError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_flats(name.trim());
        let class_part = normalized.trim_end_matches(|c: char| c.is_ascii_digit());
        let octave_part = &normalized[class_part.len()..];

        let octave: u32 = octave_part.parse().map_err(|_| NoteError::InvalidOctave {
            name: name.to_string(),
        })?;

        let pitch_class = PITCH_CLASSES
            .iter()
            .position(|pc| *pc == class_part)
            .ok_or_else(|| NoteError::UnknownPitchClass {
                name: name.to_string(),
            })? as u8;

        let midi = octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|base| base.checked_add(pitch_class as u32))
            .ok_or_else(|| NoteError::InvalidOctave {
                name: name.to_string(),
            })?;

        Ok(Self {
            pitch_class,
            octave,
            midi,
        })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            PITCH_CLASSES[self.pitch_class as usize], self.octave
        )
    }
}

/// Convert a note name to its MIDI-style number.
pub fn note_name_to_midi(name: &str) -> Result<u32, NoteError> {
    name.parse::<Pitch>().map(|p| p.midi())
}

/// Find the first note token (`A4`, `Cs5`, `Bb2`, `G#3`) in a file stem.
///
/// Used to label library entries; lookups still match by substring.
pub fn find_note_token(stem: &str) -> Option<Pitch> {
    let chars: Vec<char> = stem.chars().collect();
    for start in 0..chars.len() {
        if !('A'..='G').contains(&chars[start]) {
            continue;
        }
        if start > 0 && chars[start - 1].is_ascii_alphabetic() {
            continue;
        }
        let mut end = start + 1;
        let mut token = String::from(chars[start]);
        if let Some(&accidental) = chars.get(end) {
            match accidental {
                '#' | 's' => {
                    token.push('#');
                    end += 1;
                }
                'b' => {
                    token.push('b');
                    end += 1;
                }
                _ => {}
            }
        }
        let digits: String = chars[end..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            continue;
        }
        token.push_str(&digits);
        if let Ok(pitch) = token.parse::<Pitch>() {
            return Some(pitch);
        }
    }
    None
}

/// A scheduled trigger on the montage timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Start time on the output timeline (seconds).
    pub time: f64,

    /// How long the event's audio plays (seconds).
    pub duration: f64,

    /// Note name, e.g. `C4`, `G#5`, `Db3`.
    #[serde(rename = "note")]
    pub note_name: String,

    /// Library category subdirectory to search first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_hint: Option<String>,
}

impl NoteEvent {
    pub fn new(time: f64, duration: f64, note_name: impl Into<String>) -> Self {
        Self {
            time,
            duration,
            note_name: note_name.into(),
            category_hint: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_hint = Some(category.into());
        self
    }

    pub fn end_secs(&self) -> f64 {
        self.time + self.duration
    }

    /// Category hint, treating an empty string as absent.
    pub fn category(&self) -> Option<&str> {
        self.category_hint.as_deref().filter(|c| !c.is_empty())
    }
}

/// Parse a JSON array of note event records.
pub fn parse_note_events(json: &str) -> Result<Vec<NoteEvent>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Total timeline length: the latest event end plus [`TIMELINE_TAIL_SECS`].
///
/// `None` for an empty list.
pub fn timeline_duration(events: &[NoteEvent]) -> Option<f64> {
    events
        .iter()
        .map(NoteEvent::end_secs)
        .max_by(f64::total_cmp)
        .map(|end| end + TIMELINE_TAIL_SECS)
}
