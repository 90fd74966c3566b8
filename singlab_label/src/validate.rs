// Sequence validation.
//
// Checks the invariants a propagated sequence must satisfy and reports every
// violation as an `Inconsistency`. Reports are advisory values, not errors: a
// raw producer output is expected to fail most checks until it has been
// propagated.
//
// The checks recompute each expectation by direct indexing (looking at the
// neighbouring segments, or searching the group for the nearest vowel) rather
// than by replaying the engine's running scans, so a bug in one is unlikely to
// be mirrored in the other. Group membership itself comes from `GroupIds`,
// which is the definition of a group.

use crate::config::PropagationConfig;
use crate::field::Field;
use crate::groups::{GroupIds, GroupKind, Grouping};
use crate::phonology::{PhonemeClass, PhonemeClassifier};
use crate::segment::Segment;
use crate::sequence::Sequence;
use crate::window::{NoteWindow, PhraseWindow, SyllableWindow, Window};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Previous,
    Next,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Previous => "previous",
            Side::Next => "next",
        })
    }
}

/// Which half of the phoneme window a context mismatch is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Identity,
    Flag,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Identity => "identity",
            Slot::Flag => "flag",
        })
    }
}

/// One invariant violation. `index` is the 0-based segment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// `start >= end`.
    EmptyInterval { index: usize },
    /// The segment does not start where the previous one ended.
    Discontinuity {
        index: usize,
        expected_start: u64,
        start: u64,
    },
    /// Phoneme window slot at `offset` disagrees with the segment there.
    PhonemeContext { index: usize, offset: i8, slot: Slot },
    SyllablePosition { index: usize },
    VowelDistance { index: usize },
    /// A previous/next window disagrees with the neighbouring group.
    NeighborWindow {
        index: usize,
        kind: GroupKind,
        side: Side,
    },
    /// Song window differs from the first segment's.
    SongMismatch { index: usize },
}

impl Inconsistency {
    pub fn index(&self) -> usize {
        match *self {
            Inconsistency::EmptyInterval { index }
            | Inconsistency::Discontinuity { index, .. }
            | Inconsistency::PhonemeContext { index, .. }
            | Inconsistency::SyllablePosition { index }
            | Inconsistency::VowelDistance { index }
            | Inconsistency::NeighborWindow { index, .. }
            | Inconsistency::SongMismatch { index } => index,
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::EmptyInterval { index } => {
                write!(f, "segment {index}: empty interval")
            }
            Inconsistency::Discontinuity {
                index,
                expected_start,
                start,
            } => write!(
                f,
                "segment {index}: starts at {start}, previous segment ends at {expected_start}"
            ),
            Inconsistency::PhonemeContext {
                index,
                offset,
                slot,
            } => write!(f, "segment {index}: phoneme {slot} at offset {offset:+} is stale"),
            Inconsistency::SyllablePosition { index } => {
                write!(f, "segment {index}: wrong position in syllable")
            }
            Inconsistency::VowelDistance { index } => {
                write!(f, "segment {index}: wrong vowel distance")
            }
            Inconsistency::NeighborWindow { index, kind, side } => {
                write!(f, "segment {index}: {side} {kind} window does not match")
            }
            Inconsistency::SongMismatch { index } => {
                write!(f, "segment {index}: song window differs from segment 0")
            }
        }
    }
}

/// Every violation in `sequence`, in check order.
pub fn validate(sequence: &Sequence, config: &PropagationConfig) -> Vec<Inconsistency> {
    let segments = sequence.segments();
    let ids = sequence.group_ids(config);
    let edge = config.edge.field();
    let mut out = Vec::new();

    check_intervals(segments, &mut out);
    check_phoneme_context(segments, &mut out);
    check_positions(segments, &ids, &mut out);
    check_vowel_distances(segments, &ids, &config.phonology, &mut out);
    check_neighbours(
        segments,
        &ids.syllable,
        GroupKind::Syllable,
        &SyllableWindow::filled(&edge),
        |s| &s.syllable_cur,
        |s| (&s.syllable_prev, &s.syllable_next),
        &mut out,
    );
    check_neighbours(
        segments,
        &ids.note,
        GroupKind::Note,
        &NoteWindow::filled(&edge),
        |s| &s.note_cur.note,
        |s| (&s.note_prev, &s.note_next),
        &mut out,
    );
    check_neighbours(
        segments,
        &ids.phrase,
        GroupKind::Phrase,
        &PhraseWindow::filled(&edge),
        |s| &s.phrase_cur,
        |s| (&s.phrase_prev, &s.phrase_next),
        &mut out,
    );
    if let Some(first) = segments.first() {
        for (index, seg) in segments.iter().enumerate().skip(1) {
            if seg.song != first.song {
                out.push(Inconsistency::SongMismatch { index });
            }
        }
    }
    out
}

fn check_intervals(segments: &[Segment], out: &mut Vec<Inconsistency>) {
    for (index, seg) in segments.iter().enumerate() {
        if seg.start >= seg.end {
            out.push(Inconsistency::EmptyInterval { index });
        }
        if index > 0 && seg.start != segments[index - 1].end {
            out.push(Inconsistency::Discontinuity {
                index,
                expected_start: segments[index - 1].end,
                start: seg.start,
            });
        }
    }
}

fn check_phoneme_context(segments: &[Segment], out: &mut Vec<Inconsistency>) {
    let unset = Field::unset();
    for (index, seg) in segments.iter().enumerate() {
        for offset in [-2i8, -1, 1, 2] {
            let other = index
                .checked_add_signed(isize::from(offset))
                .and_then(|j| segments.get(j))
                .map(|s| &s.phoneme);
            let identity = other.map_or(&unset, |p| &p.current);
            let flag = other.map_or(&unset, |p| &p.flag_current);
            if seg.phoneme.identity(offset) != Some(identity) {
                out.push(Inconsistency::PhonemeContext {
                    index,
                    offset,
                    slot: Slot::Identity,
                });
            }
            if seg.phoneme.flag(offset) != Some(flag) {
                out.push(Inconsistency::PhonemeContext {
                    index,
                    offset,
                    slot: Slot::Flag,
                });
            }
        }
    }
}

fn check_positions(segments: &[Segment], ids: &GroupIds, out: &mut Vec<Inconsistency>) {
    for run in ids.syllable.runs() {
        let size = run.len();
        for index in run.clone() {
            let p = &segments[index].phoneme;
            let forward = index - run.start + 1;
            if p.position_forward.parse::<usize>() != Some(forward)
                || p.position_backward.parse::<usize>() != Some(size + 1 - forward)
            {
                out.push(Inconsistency::SyllablePosition { index });
            }
        }
    }
}

fn check_vowel_distances(
    segments: &[Segment],
    ids: &GroupIds,
    classifier: &impl PhonemeClassifier,
    out: &mut Vec<Inconsistency>,
) {
    let classes: Vec<PhonemeClass> = segments
        .iter()
        .map(|s| classifier.classify(&s.phoneme.current))
        .collect();
    for run in ids.syllable.runs() {
        for index in run.clone() {
            let (before, after) = if index == run.start {
                (None, None)
            } else {
                (
                    nearest_vowel(&classes, index, run.start..index, true),
                    nearest_vowel(&classes, index, index + 1..run.end, false),
                )
            };
            let p = &segments[index].phoneme;
            if p.vowel_distance_before != as_field(before)
                || p.vowel_distance_after != as_field(after)
            {
                out.push(Inconsistency::VowelDistance { index });
            }
        }
    }
}

/// Distance from a consonant at `index` to the nearest vowel in `span`,
/// searching outward from `index`. Pauses, silences and unset identities block
/// the search.
fn nearest_vowel(
    classes: &[PhonemeClass],
    index: usize,
    span: Range<usize>,
    backwards: bool,
) -> Option<usize> {
    if classes[index] != PhonemeClass::Consonant {
        return None;
    }
    let mut order: Box<dyn Iterator<Item = usize>> = if backwards {
        Box::new(span.rev())
    } else {
        Box::new(span)
    };
    order.find_map(|j| match classes[j] {
        PhonemeClass::Vowel => Some(Some(index.abs_diff(j))),
        PhonemeClass::Consonant => None,
        _ => Some(None),
    })?
}

fn as_field(distance: Option<usize>) -> Field {
    distance.map(Field::int).unwrap_or_default()
}

fn check_neighbours<W: Window>(
    segments: &[Segment],
    groups: &Grouping,
    kind: GroupKind,
    edge: &W,
    current: impl Fn(&Segment) -> &W,
    neighbours: impl Fn(&Segment) -> (&W, &W),
    out: &mut Vec<Inconsistency>,
) {
    let runs = groups.runs();
    for (g, run) in runs.iter().enumerate() {
        let expected_prev = if g == 0 {
            edge
        } else {
            current(&segments[run.start - 1])
        };
        let expected_next = if g + 1 == runs.len() {
            edge
        } else {
            current(&segments[run.end])
        };
        for index in run.clone() {
            let (prev, next) = neighbours(&segments[index]);
            if prev != expected_prev {
                out.push(Inconsistency::NeighborWindow {
                    index,
                    kind,
                    side: Side::Previous,
                });
            }
            if next != expected_next {
                out.push(Inconsistency::NeighborWindow {
                    index,
                    kind,
                    side: Side::Next,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeFill;

    fn raw(phonemes: &[&str]) -> Sequence {
        let segments = phonemes
            .iter()
            .enumerate()
            .map(|(i, ph)| {
                let mut s = Segment::with_phoneme(i as u64 * 100, i as u64 * 100 + 100, *ph);
                s.syllable_cur.language_context = Field::int(i / 2);
                s.song.phoneme_count = Field::int(phonemes.len());
                s
            })
            .collect();
        Sequence::from_segments(segments)
    }

    #[test]
    fn propagated_sequence_is_clean() {
        let mut seq = raw(&["sil", "k", "a", "s", "a", "i", "sil"]);
        seq.propagate(&PropagationConfig::default());
        assert_eq!(seq.validate(), vec![]);
    }

    #[test]
    fn raw_sequence_reports_context() {
        let seq = raw(&["k", "a", "i"]);
        let issues = seq.validate();
        assert!(issues.contains(&Inconsistency::PhonemeContext {
            index: 0,
            offset: 1,
            slot: Slot::Identity
        }));
        assert!(issues.contains(&Inconsistency::SyllablePosition { index: 0 }));
        assert!(issues.contains(&Inconsistency::NeighborWindow {
            index: 0,
            kind: GroupKind::Syllable,
            side: Side::Next
        }));
        // a raw consonant after a vowel has no distance yet
        assert!(!issues.contains(&Inconsistency::VowelDistance { index: 0 }));
    }

    #[test]
    fn intervals() {
        let mut seq = raw(&["a", "i", "u"]);
        seq.propagate(&PropagationConfig::default());
        let start = seq.segments()[1].start;
        seq.segments_mut()[1].end = start;
        seq.segments_mut()[2].start = 250;
        let issues = seq.validate();
        assert!(issues.contains(&Inconsistency::EmptyInterval { index: 1 }));
        assert!(issues.contains(&Inconsistency::Discontinuity {
            index: 2,
            expected_start: 100,
            start: 250
        }));
    }

    #[test]
    fn tampered_fields_are_found() {
        let mut seq = raw(&["k", "a", "p", "a"]);
        seq.propagate(&PropagationConfig::default());
        {
            let segs = seq.segments_mut();
            segs[2].phoneme.vowel_distance_before = Field::int(5);
            segs[3].song.phrase_count = Field::int(9);
            segs[1].phoneme.flag_two_before = Field::new("zz");
        }
        let issues = seq.validate();
        assert_eq!(
            issues,
            vec![
                Inconsistency::PhonemeContext {
                    index: 1,
                    offset: -2,
                    slot: Slot::Flag
                },
                Inconsistency::VowelDistance { index: 2 },
                Inconsistency::SongMismatch { index: 3 },
            ]
        );
    }

    #[test]
    fn config_changes_expectations() {
        let mut seq = raw(&["k", "a", "i"]);
        let config = PropagationConfig {
            edge: EdgeFill::Token("0".into()),
            ..Default::default()
        };
        seq.propagate(&config);
        assert!(seq.validate_with(&config).is_empty());
        assert!(!seq.validate().is_empty());
    }

    #[test]
    fn messages() {
        let issue = Inconsistency::NeighborWindow {
            index: 4,
            kind: GroupKind::Note,
            side: Side::Next,
        };
        assert_eq!(issue.to_string(), "segment 4: next note window does not match");
        assert_eq!(issue.index(), 4);
        let issue = Inconsistency::PhonemeContext {
            index: 0,
            offset: -1,
            slot: Slot::Flag,
        };
        assert_eq!(issue.to_string(), "segment 0: phoneme flag at offset -1 is stale");
    }
}
