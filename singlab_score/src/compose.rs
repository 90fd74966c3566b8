// Score to label sequence.
//
// `compose` turns a `Score` into a label `Sequence` with only the current
// windows written; the engine fills the rest. Each sung note expands to one
// segment per phoneme from the dictionary, and each rest to a single `pau`
// segment (`sil` at either end of the song).
//
// Consecutive rests collapse into one segment covering their total length,
// so no two adjacent groups are both rests.
//
// Timing: a note covers `length_ms` of song time. Its interval is split among
// its phonemes so segments are contiguous: every phoneme but the last gets
// `LEAD_TICKS` (or an equal share when the note is shorter than that), the
// last takes the remainder.
//
// Groups: the composer knows the real boundaries, so it leaves syllable and
// note hints at every note's first segment and a phrase hint at every phrase
// start and every rest. Two identical adjacent notes stay separate groups,
// and once propagated their syllable positions keep them apart on reload.
//
// A phrase is a maximal run of sung notes between rests. Rests keep
// placeholder syllable and phrase windows; the song window counts sung notes
// only.

use crate::score::Score;
use singlab_label::pitch;
use singlab_label::{
    Field, GroupKind, NoteWindow, PhraseWindow, Segment, Sequence, SongWindow, SyllableWindow,
};
use singlab_lexicon::{LookupError, Lyric, PhonemeTable, normalize_lyric};
use thiserror::Error;
use tracing::{debug, warn};

/// Ticks given to each leading phoneme of a note (50 ms).
pub const LEAD_TICKS: u64 = 500_000;

/// Ticks of score length per 96th note.
const TICKS_PER_96TH: u32 = 20;

const TEMPO_RANGE: std::ops::RangeInclusive<f64> = 20.0..=400.0;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("score has no notes")]
    Empty,
    #[error("note {note_index}: {source}")]
    Lookup {
        note_index: usize,
        #[source]
        source: LookupError,
    },
    #[error("note {note_index}: tempo must be a positive number")]
    InvalidTempo { note_index: usize },
    #[error("note {note_index}: length is not finite or too short for its phonemes")]
    InvalidLength { note_index: usize },
}

/// One note after lookup and timing.
struct Placed<'a> {
    phonemes: Vec<&'a str>,
    rest: bool,
    notenum: u8,
    /// Score length in ticks at 480 per quarter.
    length: u32,
    tempo: f64,
    ms: f64,
    ticks: u64,
}

/// Build the producer-side sequence for `score`.
pub fn compose(score: &Score, table: &PhonemeTable) -> Result<Sequence, ComposeError> {
    if score.notes.is_empty() {
        return Err(ComposeError::Empty);
    }
    let last = score.notes.len() - 1;
    let mut tempo = score.tempo;
    let mut placed = Vec::with_capacity(score.notes.len());

    for (note_index, note) in score.notes.iter().enumerate() {
        if let Some(change) = note.tempo {
            tempo = change;
        }
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(ComposeError::InvalidTempo { note_index });
        }
        if !TEMPO_RANGE.contains(&tempo) {
            warn!(target: "singlab::compose", note_index, tempo, "tempo outside the usual range");
        }

        let lyric = normalize_lyric(&note.lyric);
        let rest = lyric.is_rest();
        let phonemes = match lyric {
            Lyric::Rest if note_index == 0 || note_index == last => vec!["sil"],
            Lyric::Rest => vec!["pau"],
            Lyric::Sung(syllable) => table
                .lookup(&syllable)
                .map_err(|source| ComposeError::Lookup { note_index, source })?
                .iter()
                .map(String::as_str)
                .collect(),
        };

        let ms = note.duration_ms(tempo);
        if !ms.is_finite() || ms * 10_000.0 < phonemes.len() as f64 {
            return Err(ComposeError::InvalidLength { note_index });
        }

        let ticks = (ms * 10_000.0).round() as u64;
        if let Some(prev) = placed.last_mut().filter(|p: &&mut Placed<'_>| rest && p.rest) {
            prev.length += note.length;
            prev.ms += ms;
            prev.ticks += ticks;
            if note_index == last {
                prev.phonemes = phonemes;
            }
            continue;
        }
        placed.push(Placed {
            phonemes,
            rest,
            notenum: note.notenum,
            length: note.length,
            tempo,
            ms,
            ticks,
        });
    }

    let song = song_window(&placed);
    let phrases = phrase_windows(&placed);

    let mut seq = Sequence::new();
    let mut t = 0;
    for (i, (note, phrase)) in placed.iter().zip(&phrases).enumerate() {
        let first = seq.len();
        seq.mark_group_start(GroupKind::Syllable, first);
        seq.mark_group_start(GroupKind::Note, first);
        if i == 0 || note.rest || placed[i - 1].rest {
            seq.mark_group_start(GroupKind::Phrase, first);
        }

        let syllable = if note.rest {
            SyllableWindow::default()
        } else {
            syllable_window(score, note.phonemes.len())
        };

        let window = note_window(score, note);
        let intervals = split(t, note.ticks, note.phonemes.len());
        for (&phoneme, (start, end)) in note.phonemes.iter().zip(intervals) {
            let mut seg = Segment::with_phoneme(start, end, phoneme);
            seg.phoneme.flag_current = Field::new("00");
            seg.syllable_cur = syllable.clone();
            seg.note_cur.note = window.clone();
            seg.phrase_cur = phrase.clone();
            seg.song = song.clone();
            seq.push(seg);
        }
        t += note.ticks;
    }

    debug!(
        target: "singlab::compose",
        notes = score.notes.len(),
        segments = seq.len(),
        phrases = %song.phrase_count,
        "composed score"
    );
    Ok(seq)
}

/// Contiguous `(start, end)` intervals for `parts` phonemes sharing `ticks`.
fn split(start: u64, ticks: u64, parts: usize) -> impl Iterator<Item = (u64, u64)> {
    let parts = parts as u64;
    let lead = LEAD_TICKS.min(ticks / parts);
    (0..parts).map(move |i| {
        let begin = start + i * lead;
        let end = if i + 1 == parts { start + ticks } else { begin + lead };
        (begin, end)
    })
}

fn syllable_window(score: &Score, phonemes: usize) -> SyllableWindow {
    SyllableWindow {
        phoneme_count: Field::int(phonemes),
        position_in_note_forward: Field::int(1),
        position_in_note_backward: Field::int(1),
        language: score.language.clone().map(Field::new).unwrap_or_default(),
        language_context: Field::unset(),
    }
}

/// The key is written as its tonic pitch class (0-11), never negative, so it
/// reads back from every group it is copied into.
fn note_window(score: &Score, note: &Placed<'_>) -> NoteWindow {
    let mut window = NoteWindow {
        beat: Field::new(score.beat.as_str()),
        tempo: Field::int(note.tempo as u32),
        length_syllables: Field::int(1),
        length_centiseconds: Field::int((note.ms / 10.0).floor() as u64),
        length_ticks: Field::int(note.length / TICKS_PER_96TH),
        ..NoteWindow::default()
    };
    if !note.rest {
        window.absolute_pitch = Field::new(pitch::note_name(note.notenum));
        window.relative_pitch = Field::int(pitch::relative_pitch(note.notenum, score.key));
        window.key = Field::int(pitch::key_tonic(score.key));
    }
    window
}

/// Per-note phrase windows: (syllables, phonemes) of the enclosing phrase,
/// placeholder for rests.
fn phrase_windows(placed: &[Placed<'_>]) -> Vec<PhraseWindow> {
    let mut windows = vec![PhraseWindow::default(); placed.len()];
    let mut i = 0;
    while i < placed.len() {
        if placed[i].rest {
            i += 1;
            continue;
        }
        let end = placed[i..]
            .iter()
            .position(|n| n.rest)
            .map_or(placed.len(), |len| i + len);
        let window = PhraseWindow {
            syllable_count: Field::int(end - i),
            phoneme_count: Field::int(phoneme_total(&placed[i..end])),
        };
        windows[i..end].fill(window);
        i = end;
    }
    windows
}

fn phoneme_total(notes: &[Placed<'_>]) -> usize {
    notes.iter().map(|n| n.phonemes.len()).sum()
}

fn song_window(placed: &[Placed<'_>]) -> SongWindow {
    let sung = placed.iter().filter(|n| !n.rest).count();
    let phrases = placed
        .iter()
        .enumerate()
        .filter(|&(i, n)| !n.rest && (i == 0 || placed[i - 1].rest))
        .count();
    let phonemes: usize = placed.iter().filter(|n| !n.rest).map(|n| n.phonemes.len()).sum();
    SongWindow {
        syllable_count: Field::int(sung),
        phoneme_count: Field::int(phonemes),
        phrase_count: Field::int(phrases),
    }
}
