#![forbid(unsafe_code)]

//! Musical notes attached to a document.

use serde::{Deserialize, Serialize};

use crate::id::ElementId;

/// A control point inside a note: pitch bend, timbre and lyric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pit {
    /// Offset from the note start, in beat ticks.
    pub beat: i64,
    /// Pitch offset in semitones.
    pub pitch: f64,
    /// Timbre weight in `[0, 1]`.
    pub tone: f64,
    pub lyric: String,
}

/// A timed pitch event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: ElementId,
    /// Start position in beat ticks.
    pub beat: i64,
    /// Duration in beat ticks.
    pub length: i64,
    /// Base pitch (MIDI note number, fractional for microtones).
    pub pitch: f64,
    pub pits: Vec<Pit>,
}

impl Note {
    #[must_use]
    pub fn new(id: ElementId, beat: i64, length: i64, pitch: f64) -> Self {
        Self {
            id,
            beat,
            length,
            pitch,
            pits: Vec::new(),
        }
    }

    /// End position in beat ticks.
    #[must_use]
    pub fn end_beat(&self) -> i64 {
        self.beat + self.length
    }
}

/// Global score settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOption {
    /// Beats per minute.
    pub tempo: f64,
    /// Key as semitone offset from C.
    pub key: i32,
    pub enabled: bool,
}

impl Default for ScoreOption {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            key: 0,
            enabled: true,
        }
    }
}

/// Notes, draft notes and options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub notes: Vec<Note>,
    pub draft_notes: Vec<Note>,
    pub option: ScoreOption,
}

impl Score {
    /// Largest note id over both layers.
    #[must_use]
    pub fn max_element_id(&self) -> Option<ElementId> {
        self.notes.iter().chain(&self.draft_notes).map(|n| n.id).max()
    }
}
