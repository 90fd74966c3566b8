// One phonetic segment: a time interval plus its eleven context windows.
//
// Times are in 100-nanosecond ticks over the half-open interval
// `[start, end)`. Every window is owned by value; the propagation engine copies
// neighbour windows by cloning, so segments never alias each other.
//
// `Display` and `FromStr` go through the field grammar, so a segment can be
// written with `{}` and read back with `line.parse::<Segment>()`.

use crate::field::Field;
use crate::grammar::{self, FormatError};
use crate::window::{
    NoteContext, NoteWindow, PhonemeWindow, PhraseWindow, SongWindow, SyllableWindow, Window,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticks per second (the label time unit is 100 ns).
pub const TICKS_PER_SECOND: u64 = 10_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
    pub phoneme: PhonemeWindow,
    pub syllable_prev: SyllableWindow,
    pub syllable_cur: SyllableWindow,
    pub syllable_next: SyllableWindow,
    pub note_prev: NoteWindow,
    pub note_cur: NoteContext,
    pub note_next: NoteWindow,
    pub phrase_prev: PhraseWindow,
    pub phrase_cur: PhraseWindow,
    pub phrase_next: PhraseWindow,
    pub song: SongWindow,
}

impl Segment {
    /// A segment with every field at placeholder.
    pub fn new(start: u64, end: u64) -> Self {
        Segment {
            start,
            end,
            ..Default::default()
        }
    }

    /// A placeholder segment singing `phoneme`.
    pub fn with_phoneme(start: u64, end: u64, phoneme: impl Into<Field>) -> Self {
        let mut segment = Segment::new(start, end);
        segment.phoneme.current = phoneme.into();
        segment
    }

    /// Length of the interval in ticks (zero for inverted intervals).
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// All 118 context fields in line order (p1 .. j3).
    pub fn context_fields(&self) -> Vec<&Field> {
        let mut out = Vec::with_capacity(118);
        self.phoneme.collect(&mut out);
        self.syllable_prev.collect(&mut out);
        self.syllable_cur.collect(&mut out);
        self.syllable_next.collect(&mut out);
        self.note_prev.collect(&mut out);
        self.note_cur.collect(&mut out);
        self.note_next.collect(&mut out);
        self.phrase_prev.collect(&mut out);
        self.phrase_cur.collect(&mut out);
        self.phrase_next.collect(&mut out);
        self.song.collect(&mut out);
        out
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&grammar::format_segment(self))
    }
}

impl FromStr for Segment {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        grammar::parse_line(s)
    }
}
