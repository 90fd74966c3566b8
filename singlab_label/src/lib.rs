// Singing-voice full-context labels.
//
// Models the HTS singing label format, where each line describes one phonetic
// segment plus a wide context window: the identities and flags of the
// neighbouring phonemes, the previous/current/next syllable, note and phrase,
// and song-wide counts. The centre of the crate is the propagation engine,
// which takes a sequence whose "current" windows are known and fills every
// neighbour window and derived field, so the result can be written back in the
// exact textual grammar.
//
// Architecture:
// - field.rs: `Field`, a token or the `xx` placeholder
// - grammar.rs: group markers and separators, `parse_line` / `format_segment`
// - window.rs: typed windows with named fields and the `Window` trait
// - segment.rs: `Segment`, a time interval plus its eleven windows
// - sequence.rs: `Sequence` container (load, serialize, hints, validate)
// - groups.rs: group-id pre-pass (syllable, note, phrase)
// - phonology.rs: vowel / consonant / pause / silence classification
// - propagate.rs: the six propagation passes
// - validate.rs: invariant checks reported as `Inconsistency` values
// - export.rs: CSV and JSON projections
// - pitch.rs: note names, relative pitch, pitch-difference tokens
// - config.rs: `PropagationConfig`, loaded from JSON
//
// Everything is single-threaded and in-memory; I/O happens only in the
// `read`/`write` helpers.

pub mod config;
pub mod export;
pub mod field;
pub mod grammar;
pub mod groups;
pub mod phonology;
pub mod pitch;
pub mod propagate;
pub mod segment;
pub mod sequence;
pub mod validate;
pub mod window;

// Re-export key types at crate root for convenience.
pub use config::{ConfigError, EdgeFill, GroupNesting, PropagationConfig};
pub use field::{Field, PLACEHOLDER};
pub use grammar::{FormatError, format_segment, parse_line};
pub use groups::GroupKind;
pub use phonology::{PhonemeClass, PhonemeClassifier, Phonology};
pub use propagate::{PropagationReport, propagate};
pub use segment::Segment;
pub use sequence::{LoadError, Sequence};
pub use validate::Inconsistency;
pub use window::{
    NoteContext, NoteWindow, PhonemeWindow, PhraseWindow, SongWindow, SyllableWindow, Window,
};
