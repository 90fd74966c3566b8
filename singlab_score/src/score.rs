// Score input model.
//
// A score is a flat list of notes with lyrics, in the shape UTAU-style editors
// export: MIDI note numbers, lengths in ticks at 480 per quarter note, and an
// optional per-note tempo change. Loaded from JSON:
//
// ```json
// {
//   "tempo": 120.0,
//   "key": 0,
//   "language": "JPN",
//   "notes": [
//     { "lyric": "R", "notenum": 60, "length": 480 },
//     { "lyric": "か", "notenum": 69, "length": 960 }
//   ]
// }
// ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Ticks per quarter note in score lengths.
pub const TICKS_PER_QUARTER: u32 = 480;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Initial tempo in BPM.
    pub tempo: f64,
    /// Key as a count of sharps (negative for flats).
    #[serde(default)]
    pub key: i32,
    #[serde(default = "default_beat")]
    pub beat: String,
    /// Syllable language tag (a4/b4/c4), if any.
    #[serde(default)]
    pub language: Option<String>,
    pub notes: Vec<NoteEvent>,
}

fn default_beat() -> String {
    "4/4".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub lyric: String,
    pub notenum: u8,
    /// Length in ticks, 480 per quarter note.
    pub length: u32,
    /// Length in milliseconds; derived from the tempo when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_ms: Option<f64>,
    /// Tempo change taking effect at this note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

impl NoteEvent {
    pub fn new(lyric: impl Into<String>, notenum: u8, length: u32) -> Self {
        NoteEvent {
            lyric: lyric.into(),
            notenum,
            length,
            length_ms: None,
            tempo: None,
        }
    }

    /// Length in milliseconds at `tempo` BPM, unless given explicitly.
    pub fn duration_ms(&self, tempo: f64) -> f64 {
        self.length_ms
            .unwrap_or_else(|| f64::from(self.length) * 60_000.0 / (tempo * f64::from(TICKS_PER_QUARTER)))
    }
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("cannot read score: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid score JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Score {
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, ScoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
