// Typed context windows: the eleven sub-records of a label line.
//
// Each window is a plain struct of named `Field`s in wire order. The `Window`
// trait gives the grammar a uniform way to flatten a window into its ordered
// field list and to rebuild it from one, so field order is written down exactly
// once (in `collect`/`read`) instead of being scattered across index constants.
//
// The current-note record (`NoteContext`, e1-e60) nests its repeated shapes:
// the first nine fields are a `NoteWindow` (the part that also appears as the
// previous/next note), then metric positions (`MetricPosition`, 8 fields),
// mark distances (`MarkDistance`, 6 fields) and scalar flags.
//
// Windows are owned by value inside each `Segment`; copying a neighbour's
// window always clones, so no two segments share storage.

use crate::field::Field;
use serde::{Deserialize, Serialize};

/// Sequential reader over a window's field list.
///
/// Missing trailing fields read as the placeholder; the grammar guarantees the
/// arity before any window is built, so this only matters for hand-built input.
pub struct FieldReader {
    fields: std::vec::IntoIter<Field>,
}

impl FieldReader {
    pub fn new(fields: Vec<Field>) -> Self {
        FieldReader {
            fields: fields.into_iter(),
        }
    }

    pub fn next_field(&mut self) -> Field {
        self.fields.next().unwrap_or_default()
    }
}

/// A fixed-arity group of fields with a defined wire order.
pub trait Window: Clone + Default + PartialEq {
    /// Number of fields in wire order.
    const ARITY: usize;

    /// Append references to every field, in wire order.
    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>);

    /// Consume `ARITY` fields from the reader.
    fn read(reader: &mut FieldReader) -> Self;

    fn fields(&self) -> Vec<&Field> {
        let mut out = Vec::with_capacity(Self::ARITY);
        self.collect(&mut out);
        out
    }

    fn from_fields(fields: Vec<Field>) -> Self {
        Self::read(&mut FieldReader::new(fields))
    }

    /// A window with every field set to `value`.
    fn filled(value: &Field) -> Self {
        Self::from_fields(vec![value.clone(); Self::ARITY])
    }

    /// True when every field is the placeholder.
    fn is_unset(&self) -> bool {
        self.fields().iter().all(|f| f.is_unset())
    }
}

// ---------------------------------------------------------------------------
// Phoneme window (p1-p16)
// ---------------------------------------------------------------------------

/// Phoneme identities and flags around the current segment, plus positions
/// inside the syllable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeWindow {
    /// p1: language independent identity (`v`, `c`, `p`, `s`).
    pub class: Field,
    /// p2
    pub two_before: Field,
    /// p3
    pub before: Field,
    /// p4: the phoneme this segment sings.
    pub current: Field,
    /// p5
    pub next: Field,
    /// p6
    pub two_after: Field,
    /// p7
    pub flag_two_before: Field,
    /// p8
    pub flag_before: Field,
    /// p9
    pub flag_current: Field,
    /// p10
    pub flag_next: Field,
    /// p11
    pub flag_two_after: Field,
    /// p12: 1 at the first phoneme of the syllable.
    pub position_forward: Field,
    /// p13: 1 at the last phoneme of the syllable.
    pub position_backward: Field,
    /// p14: distance from the previous vowel in the syllable.
    pub vowel_distance_before: Field,
    /// p15: distance to the next vowel in the syllable.
    pub vowel_distance_after: Field,
    /// p16: undefined context.
    pub user: Field,
}

impl PhonemeWindow {
    /// Identity slot at `offset` in `-2..=2`.
    pub fn identity(&self, offset: i8) -> Option<&Field> {
        match offset {
            -2 => Some(&self.two_before),
            -1 => Some(&self.before),
            0 => Some(&self.current),
            1 => Some(&self.next),
            2 => Some(&self.two_after),
            _ => None,
        }
    }

    /// Flag slot at `offset` in `-2..=2`.
    pub fn flag(&self, offset: i8) -> Option<&Field> {
        match offset {
            -2 => Some(&self.flag_two_before),
            -1 => Some(&self.flag_before),
            0 => Some(&self.flag_current),
            1 => Some(&self.flag_next),
            2 => Some(&self.flag_two_after),
            _ => None,
        }
    }
}

impl Window for PhonemeWindow {
    const ARITY: usize = 16;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([
            &self.class,
            &self.two_before,
            &self.before,
            &self.current,
            &self.next,
            &self.two_after,
            &self.flag_two_before,
            &self.flag_before,
            &self.flag_current,
            &self.flag_next,
            &self.flag_two_after,
            &self.position_forward,
            &self.position_backward,
            &self.vowel_distance_before,
            &self.vowel_distance_after,
            &self.user,
        ]);
    }

    fn read(r: &mut FieldReader) -> Self {
        PhonemeWindow {
            class: r.next_field(),
            two_before: r.next_field(),
            before: r.next_field(),
            current: r.next_field(),
            next: r.next_field(),
            two_after: r.next_field(),
            flag_two_before: r.next_field(),
            flag_before: r.next_field(),
            flag_current: r.next_field(),
            flag_next: r.next_field(),
            flag_two_after: r.next_field(),
            position_forward: r.next_field(),
            position_backward: r.next_field(),
            vowel_distance_before: r.next_field(),
            vowel_distance_after: r.next_field(),
            user: r.next_field(),
        }
    }
}

// ---------------------------------------------------------------------------
// Syllable window (a/b/c)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyllableWindow {
    pub phoneme_count: Field,
    pub position_in_note_forward: Field,
    pub position_in_note_backward: Field,
    pub language: Field,
    /// Language dependent context.
    pub language_context: Field,
}

impl Window for SyllableWindow {
    const ARITY: usize = 5;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([
            &self.phoneme_count,
            &self.position_in_note_forward,
            &self.position_in_note_backward,
            &self.language,
            &self.language_context,
        ]);
    }

    fn read(r: &mut FieldReader) -> Self {
        SyllableWindow {
            phoneme_count: r.next_field(),
            position_in_note_forward: r.next_field(),
            position_in_note_backward: r.next_field(),
            language: r.next_field(),
            language_context: r.next_field(),
        }
    }
}

// ---------------------------------------------------------------------------
// Note windows (d/f, and the head of e)
// ---------------------------------------------------------------------------

/// The nine note attributes shared by the previous, current and next note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteWindow {
    /// Note name, C0-G9.
    pub absolute_pitch: Field,
    /// Pitch class relative to the key's tonic, 0-11.
    pub relative_pitch: Field,
    /// Key as a count of sharps.
    pub key: Field,
    /// Time signature, e.g. `4/4`.
    pub beat: Field,
    pub tempo: Field,
    pub length_syllables: Field,
    /// Length in units of 0.01 second.
    pub length_centiseconds: Field,
    /// Length in units of one third of a 32nd note (24 per quarter).
    pub length_ticks: Field,
    pub user: Field,
}

impl Window for NoteWindow {
    const ARITY: usize = 9;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([
            &self.absolute_pitch,
            &self.relative_pitch,
            &self.key,
            &self.beat,
            &self.tempo,
            &self.length_syllables,
            &self.length_centiseconds,
            &self.length_ticks,
            &self.user,
        ]);
    }

    fn read(r: &mut FieldReader) -> Self {
        NoteWindow {
            absolute_pitch: r.next_field(),
            relative_pitch: r.next_field(),
            key: r.next_field(),
            beat: r.next_field(),
            tempo: r.next_field(),
            length_syllables: r.next_field(),
            length_centiseconds: r.next_field(),
            length_ticks: r.next_field(),
            user: r.next_field(),
        }
    }
}

/// A forward/backward pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub forward: Field,
    pub backward: Field,
}

impl Window for Position {
    const ARITY: usize = 2;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([&self.forward, &self.backward]);
    }

    fn read(r: &mut FieldReader) -> Self {
        Position {
            forward: r.next_field(),
            backward: r.next_field(),
        }
    }
}

/// Position of the note inside a span (measure, phrase, crescendo...) in
/// four units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPosition {
    pub by_note: Position,
    /// 0.01 s for measures and phrases, 1 s for hairpins.
    pub by_time: Position,
    pub by_tick: Position,
    pub by_percent: Position,
}

impl Window for MetricPosition {
    const ARITY: usize = 8;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        self.by_note.collect(out);
        self.by_time.collect(out);
        self.by_tick.collect(out);
        self.by_percent.collect(out);
    }

    fn read(r: &mut FieldReader) -> Self {
        MetricPosition {
            by_note: Position::read(r),
            by_time: Position::read(r),
            by_tick: Position::read(r),
            by_percent: Position::read(r),
        }
    }
}

/// Distances to the next and previous occurrence of a mark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distance {
    pub next: Field,
    pub previous: Field,
}

impl Window for Distance {
    const ARITY: usize = 2;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([&self.next, &self.previous]);
    }

    fn read(r: &mut FieldReader) -> Self {
        Distance {
            next: r.next_field(),
            previous: r.next_field(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDistance {
    pub by_note: Distance,
    pub by_time: Distance,
    pub by_tick: Distance,
}

impl Window for MarkDistance {
    const ARITY: usize = 6;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        self.by_note.collect(out);
        self.by_time.collect(out);
        self.by_tick.collect(out);
    }

    fn read(r: &mut FieldReader) -> Self {
        MarkDistance {
            by_note: Distance::read(r),
            by_time: Distance::read(r),
            by_tick: Distance::read(r),
        }
    }
}

/// The current note (e1-e60).
///
/// Only `note` takes part in note grouping and neighbour propagation; the rest
/// is intra-note positional and ornament data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContext {
    /// e1-e9
    pub note: NoteWindow,
    /// e10-e17
    pub in_measure: MetricPosition,
    /// e18-e25
    pub in_phrase: MetricPosition,
    /// e26
    pub slur_with_previous: Field,
    /// e27
    pub slur_with_next: Field,
    /// e28
    pub dynamic_mark: Field,
    /// e29-e34
    pub accent: MarkDistance,
    /// e35-e40
    pub staccato: MarkDistance,
    /// e41-e48
    pub crescendo: MetricPosition,
    /// e49-e56
    pub decrescendo: MetricPosition,
    /// e57
    pub pitch_difference_previous: Field,
    /// e58
    pub pitch_difference_next: Field,
    /// e59
    pub user_a: Field,
    /// e60
    pub user_b: Field,
}

impl Window for NoteContext {
    const ARITY: usize = 60;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        self.note.collect(out);
        self.in_measure.collect(out);
        self.in_phrase.collect(out);
        out.extend([
            &self.slur_with_previous,
            &self.slur_with_next,
            &self.dynamic_mark,
        ]);
        self.accent.collect(out);
        self.staccato.collect(out);
        self.crescendo.collect(out);
        self.decrescendo.collect(out);
        out.extend([
            &self.pitch_difference_previous,
            &self.pitch_difference_next,
            &self.user_a,
            &self.user_b,
        ]);
    }

    fn read(r: &mut FieldReader) -> Self {
        NoteContext {
            note: NoteWindow::read(r),
            in_measure: MetricPosition::read(r),
            in_phrase: MetricPosition::read(r),
            slur_with_previous: r.next_field(),
            slur_with_next: r.next_field(),
            dynamic_mark: r.next_field(),
            accent: MarkDistance::read(r),
            staccato: MarkDistance::read(r),
            crescendo: MetricPosition::read(r),
            decrescendo: MetricPosition::read(r),
            pitch_difference_previous: r.next_field(),
            pitch_difference_next: r.next_field(),
            user_a: r.next_field(),
            user_b: r.next_field(),
        }
    }
}

// ---------------------------------------------------------------------------
// Phrase and song windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhraseWindow {
    pub syllable_count: Field,
    pub phoneme_count: Field,
}

impl Window for PhraseWindow {
    const ARITY: usize = 2;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([&self.syllable_count, &self.phoneme_count]);
    }

    fn read(r: &mut FieldReader) -> Self {
        PhraseWindow {
            syllable_count: r.next_field(),
            phoneme_count: r.next_field(),
        }
    }
}

/// Song-wide aggregates, identical on every segment of a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongWindow {
    /// Syllables (or measures) in the song.
    pub syllable_count: Field,
    /// Phonemes (or measures) in the song.
    pub phoneme_count: Field,
    pub phrase_count: Field,
}

impl Window for SongWindow {
    const ARITY: usize = 3;

    fn collect<'a>(&'a self, out: &mut Vec<&'a Field>) {
        out.extend([&self.syllable_count, &self.phoneme_count, &self.phrase_count]);
    }

    fn read(r: &mut FieldReader) -> Self {
        SongWindow {
            syllable_count: r.next_field(),
            phoneme_count: r.next_field(),
            phrase_count: r.next_field(),
        }
    }
}
