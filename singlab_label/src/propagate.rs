// Context propagation engine.
//
// Fills every neighbour window and derived field of a sequence whose current
// windows are known. The engine never adds or removes segments; it rewrites
// field values in place through six ordered passes, each a linear scan:
//
//   1. phoneme identities/flags at offsets -2..+2 (forward then backward)
//   2. position in syllable, and the syllable's phoneme count when unset
//   3. phoneme class (p1) and distances to the nearest vowel (p14/p15)
//   4. previous/next syllable windows
//   5. previous/next note windows, then pitch differences (e57/e58)
//   6. previous/next phrase windows
//
// Group ids are computed once up front (`groups.rs`). Pass 2 only fills a
// group's count with the group's own size, which is constant across the group,
// so the ids stay valid for the later passes.
//
// Derived fields (p2-p15 and the prev/next windows) are always recomputed.
// Current-window data (p1, b1, e57, e58) is only filled where it is still the
// placeholder, so producer-supplied values survive. Recomputing from the same
// input gives the same output, which makes a second run a no-op.

use crate::config::PropagationConfig;
use crate::field::Field;
use crate::groups::{GroupKind, Grouping};
use crate::phonology::{PhonemeClass, PhonemeClassifier};
use crate::pitch;
use crate::segment::Segment;
use crate::sequence::Sequence;
use crate::window::Window;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Summary of one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub segments: usize,
    pub syllables: usize,
    pub notes: usize,
    pub phrases: usize,
}

impl PropagationReport {
    pub fn groups(&self, kind: GroupKind) -> usize {
        match kind {
            GroupKind::Syllable => self.syllables,
            GroupKind::Note => self.notes,
            GroupKind::Phrase => self.phrases,
        }
    }
}

impl fmt::Display for PropagationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} segments, {} syllables, {} notes, {} phrases",
            self.segments, self.syllables, self.notes, self.phrases
        )
    }
}

/// Run every pass over `sequence`.
pub fn propagate(sequence: &mut Sequence, config: &PropagationConfig) -> PropagationReport {
    let ids = sequence.group_ids(config);
    let edge = config.edge.field();
    let segments = sequence.segments_mut();

    fill_phoneme_neighbours(segments);
    fill_syllable_positions(segments, &ids.syllable);
    fill_vowel_distances(segments, &ids.syllable, &config.phonology);
    fill_neighbours(
        segments,
        &ids.syllable,
        &edge,
        |s| &s.syllable_cur,
        |s| &mut s.syllable_prev,
        |s| &mut s.syllable_next,
    );
    fill_neighbours(
        segments,
        &ids.note,
        &edge,
        |s| &s.note_cur.note,
        |s| &mut s.note_prev,
        |s| &mut s.note_next,
    );
    fill_pitch_differences(segments);
    fill_neighbours(
        segments,
        &ids.phrase,
        &edge,
        |s| &s.phrase_cur,
        |s| &mut s.phrase_prev,
        |s| &mut s.phrase_next,
    );

    let report = PropagationReport {
        segments: segments.len(),
        syllables: ids.syllable.count(),
        notes: ids.note.count(),
        phrases: ids.phrase.count(),
    };
    debug!(
        target: "singlab::propagate",
        segments = report.segments,
        syllables = report.syllables,
        notes = report.notes,
        phrases = report.phrases,
        nesting = ?config.nesting,
        "propagated"
    );
    report
}

// ---------------------------------------------------------------------------
// Pass 1: phoneme neighbours
// ---------------------------------------------------------------------------

/// Copy identities and flags of the two segments on either side. Slots past
/// the sequence edges are the placeholder.
fn fill_phoneme_neighbours(segments: &mut [Segment]) {
    let mut two_before = (Field::unset(), Field::unset());
    let mut before = (Field::unset(), Field::unset());
    for seg in segments.iter_mut() {
        let p = &mut seg.phoneme;
        let current = (p.current.clone(), p.flag_current.clone());
        (p.two_before, p.flag_two_before) = two_before;
        (p.before, p.flag_before) = before.clone();
        two_before = before;
        before = current;
    }

    let mut two_after = (Field::unset(), Field::unset());
    let mut after = (Field::unset(), Field::unset());
    for seg in segments.iter_mut().rev() {
        let p = &mut seg.phoneme;
        let current = (p.current.clone(), p.flag_current.clone());
        (p.two_after, p.flag_two_after) = two_after;
        (p.next, p.flag_next) = after.clone();
        two_after = after;
        after = current;
    }
}

// ---------------------------------------------------------------------------
// Pass 2: position in syllable
// ---------------------------------------------------------------------------

fn fill_syllable_positions(segments: &mut [Segment], syllables: &Grouping) {
    for run in syllables.runs() {
        let size = run.len();
        for (offset, seg) in segments[run].iter_mut().enumerate() {
            seg.phoneme.position_forward = Field::int(offset + 1);
            seg.phoneme.position_backward = Field::int(size - offset);
            // b1 is part of the grouping key. A filled count can make this
            // window equal to a neighbour's; p12 keeps the groups apart on
            // the next run.
            if seg.syllable_cur.phoneme_count.is_unset() {
                seg.syllable_cur.phoneme_count = Field::int(size);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 3: phoneme class and vowel distance
// ---------------------------------------------------------------------------

/// Forward scan writes the distance from the previous vowel (p14), backward
/// scan the distance to the next one (p15). Vowels and "other" segments get
/// the placeholder and reset the count, as does a group boundary. A group's
/// first segment is an onset and carries the placeholder in both fields.
fn fill_vowel_distances(
    segments: &mut [Segment],
    syllables: &Grouping,
    classifier: &impl PhonemeClassifier,
) {
    let classes: Vec<PhonemeClass> = segments
        .iter()
        .map(|s| classifier.classify(&s.phoneme.current))
        .collect();

    for (seg, class) in segments.iter_mut().zip(&classes) {
        if let (true, Some(token)) = (seg.phoneme.class.is_unset(), class.token()) {
            seg.phoneme.class = Field::new(token);
        }
    }

    for run in syllables.runs() {
        let onset = run.start;
        let mut since_vowel = None;
        for i in run.clone() {
            let distance = step_distance(classes[i], &mut since_vowel);
            segments[i].phoneme.vowel_distance_before = distance_field(i != onset, distance);
        }
        let mut until_vowel = None;
        for i in run.rev() {
            let distance = step_distance(classes[i], &mut until_vowel);
            segments[i].phoneme.vowel_distance_after = distance_field(i != onset, distance);
        }
    }
}

/// Advance a running vowel counter over one segment and return the segment's
/// distance, if it has one.
fn step_distance(class: PhonemeClass, counter: &mut Option<usize>) -> Option<usize> {
    match class {
        PhonemeClass::Vowel => {
            *counter = Some(0);
            None
        }
        c if c.breaks_distance() => {
            *counter = None;
            None
        }
        _ => {
            *counter = counter.map(|d| d + 1);
            *counter
        }
    }
}

fn distance_field(counted: bool, distance: Option<usize>) -> Field {
    match distance {
        Some(d) if counted => Field::int(d),
        _ => Field::unset(),
    }
}

// ---------------------------------------------------------------------------
// Passes 4-6: neighbour windows
// ---------------------------------------------------------------------------

/// Forward scan sets `prev` to the window of the preceding group, backward scan
/// sets `next` to the window of the following group. The first group's `prev`
/// and the last group's `next` are filled with the edge value.
fn fill_neighbours<W: Window>(
    segments: &mut [Segment],
    groups: &Grouping,
    edge: &Field,
    current: impl Fn(&Segment) -> &W,
    prev: impl Fn(&mut Segment) -> &mut W,
    next: impl Fn(&mut Segment) -> &mut W,
) {
    let edge = W::filled(edge);

    let mut preceding = edge.clone();
    for i in 0..segments.len() {
        if i > 0 && groups.is_start(i) {
            preceding = current(&segments[i - 1]).clone();
        }
        *prev(&mut segments[i]) = preceding.clone();
    }

    let mut following = edge;
    for i in (0..segments.len()).rev() {
        if i + 1 < segments.len() && groups.is_start(i + 1) {
            following = current(&segments[i + 1]).clone();
        }
        *next(&mut segments[i]) = following.clone();
    }
}

/// e57/e58 from the neighbouring notes' absolute pitches, where unset.
fn fill_pitch_differences(segments: &mut [Segment]) {
    for seg in segments.iter_mut() {
        let cur = &seg.note_cur.note.absolute_pitch;
        let previous = pitch::field_difference(&seg.note_prev.absolute_pitch, cur);
        let next = pitch::field_difference(cur, &seg.note_next.absolute_pitch);
        let ctx = &mut seg.note_cur;
        if let (true, Some(diff)) = (ctx.pitch_difference_previous.is_unset(), previous) {
            ctx.pitch_difference_previous = diff;
        }
        if let (true, Some(diff)) = (ctx.pitch_difference_next.is_unset(), next) {
            ctx.pitch_difference_next = diff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeFill, GroupNesting};
    use crate::window::SyllableWindow;

    fn syllable(tag: &str) -> SyllableWindow {
        SyllableWindow {
            language_context: Field::new(tag),
            ..Default::default()
        }
    }

    /// One segment per phoneme; `groups[i]` tags the syllable of segment i.
    fn sequence(phonemes: &[&str], groups: &[&str]) -> Sequence {
        let segments = phonemes
            .iter()
            .zip(groups)
            .enumerate()
            .map(|(i, (ph, g))| {
                let mut s = Segment::with_phoneme(i as u64 * 100, i as u64 * 100 + 100, *ph);
                s.phoneme.flag_current = Field::new(format!("f{i}"));
                s.syllable_cur = syllable(g);
                s
            })
            .collect();
        Sequence::from_segments(segments)
    }

    fn column(seq: &Sequence, get: impl Fn(&Segment) -> &Field) -> Vec<String> {
        seq.iter().map(|s| get(s).to_string()).collect()
    }

    #[test]
    fn phoneme_window_slides() {
        let mut seq = sequence(&["sil", "k", "a", "sil"], &["A", "B", "B", "C"]);
        seq.propagate(&PropagationConfig::default());
        assert_eq!(column(&seq, |s| &s.phoneme.two_before), ["xx", "xx", "sil", "k"]);
        assert_eq!(column(&seq, |s| &s.phoneme.before), ["xx", "sil", "k", "a"]);
        assert_eq!(column(&seq, |s| &s.phoneme.next), ["k", "a", "sil", "xx"]);
        assert_eq!(column(&seq, |s| &s.phoneme.two_after), ["a", "sil", "xx", "xx"]);
        assert_eq!(column(&seq, |s| &s.phoneme.flag_before), ["xx", "f0", "f1", "f2"]);
        assert_eq!(column(&seq, |s| &s.phoneme.flag_two_after), ["f2", "f3", "xx", "xx"]);
    }

    #[test]
    fn positions_and_counts() {
        let mut seq = sequence(&["k", "a", "s", "a", "N"], &["A", "A", "B", "B", "B"]);
        seq.propagate(&PropagationConfig::default());
        assert_eq!(column(&seq, |s| &s.phoneme.position_forward), ["1", "2", "1", "2", "3"]);
        assert_eq!(column(&seq, |s| &s.phoneme.position_backward), ["2", "1", "3", "2", "1"]);
        assert_eq!(column(&seq, |s| &s.syllable_cur.phoneme_count), ["2", "2", "3", "3", "3"]);
    }

    #[test]
    fn existing_phoneme_count_is_kept() {
        let mut seq = sequence(&["k", "a"], &["A", "A"]);
        for s in seq.segments_mut() {
            s.syllable_cur.phoneme_count = Field::int(7);
        }
        seq.propagate(&PropagationConfig::default());
        assert_eq!(column(&seq, |s| &s.syllable_cur.phoneme_count), ["7", "7"]);
    }

    #[test]
    fn vowel_distance_fixture() {
        let mut seq = sequence(&["k", "a", "p", "a", "u"], &["A"; 5]);
        seq.propagate(&PropagationConfig::default());
        assert_eq!(column(&seq, |s| &s.phoneme.class), ["c", "v", "c", "v", "v"]);
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_before),
            ["xx", "xx", "1", "xx", "xx"]
        );
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_after),
            ["xx", "xx", "1", "xx", "xx"]
        );
    }

    #[test]
    fn vowel_distance_counts_consonant_runs() {
        let mut seq = sequence(&["s", "a", "k", "t", "o", "n", "n"], &["A"; 7]);
        seq.propagate(&PropagationConfig::default());
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_before),
            ["xx", "xx", "1", "2", "xx", "1", "2"]
        );
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_after),
            ["xx", "xx", "2", "1", "xx", "xx", "xx"]
        );
    }

    #[test]
    fn vowel_distance_resets_at_boundaries_and_pauses() {
        let mut seq = sequence(
            &["a", "k", "k", "pau", "k", "a"],
            &["A", "A", "B", "B", "B", "B"],
        );
        seq.propagate(&PropagationConfig::default());
        // the vowel of group A does not reach into group B
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_before),
            ["xx", "1", "xx", "xx", "xx", "xx"]
        );
        // pau blocks the count from the final vowel
        assert_eq!(
            column(&seq, |s| &s.phoneme.vowel_distance_after),
            ["xx", "xx", "xx", "xx", "1", "xx"]
        );
        assert_eq!(column(&seq, |s| &s.phoneme.class)[3], "p");
    }

    #[test]
    fn syllable_windows_aab() {
        let mut seq = sequence(&["k", "a", "i"], &["A", "A", "B"]);
        seq.propagate(&PropagationConfig::default());
        let segs = seq.segments();
        let a = segs[0].syllable_cur.clone();
        let b = segs[2].syllable_cur.clone();
        assert_eq!(segs[0].syllable_next, b);
        assert_eq!(segs[1].syllable_next, b);
        assert_eq!(segs[2].syllable_prev, a);
        assert!(segs[0].syllable_prev.is_unset());
        assert!(segs[2].syllable_next.is_unset());
    }

    #[test]
    fn edge_token_fills_outer_windows() {
        let mut seq = sequence(&["k", "a"], &["A", "B"]);
        let config = PropagationConfig {
            edge: EdgeFill::Token("0".into()),
            ..Default::default()
        };
        seq.propagate(&config);
        let segs = seq.segments();
        assert_eq!(segs[0].syllable_prev, SyllableWindow::filled(&Field::new("0")));
        assert_eq!(segs[1].note_next.tempo.as_str(), "0");
        assert_eq!(segs[1].phrase_next.phoneme_count.as_str(), "0");
        // no pitch difference against an edge token
        assert!(segs[0].note_cur.pitch_difference_previous.is_unset());
    }

    #[test]
    fn note_windows_and_pitch_differences() {
        let mut seq = sequence(&["k", "a", "s", "a"], &["A", "A", "B", "B"]);
        for (i, s) in seq.segments_mut().iter_mut().enumerate() {
            let name = if i < 2 { "A4" } else { "G4" };
            s.note_cur.note.absolute_pitch = Field::new(name);
            s.note_cur.in_measure.by_note.forward = Field::int(i + 1);
        }
        let report = seq.propagate(&PropagationConfig::default());
        assert_eq!(report.notes, 2);
        let segs = seq.segments();
        assert_eq!(segs[1].note_next.absolute_pitch.as_str(), "G4");
        assert_eq!(segs[2].note_prev.absolute_pitch.as_str(), "A4");
        assert_eq!(segs[0].note_cur.pitch_difference_next.as_str(), "m2");
        assert_eq!(segs[3].note_cur.pitch_difference_previous.as_str(), "m2");
        assert!(segs[0].note_cur.pitch_difference_previous.is_unset());
        assert!(segs[3].note_cur.pitch_difference_next.is_unset());
    }

    #[test]
    fn phrase_windows() {
        let mut seq = sequence(&["k", "a", "pau", "a"], &["A", "A", "B", "C"]);
        for (i, s) in seq.segments_mut().iter_mut().enumerate() {
            if i != 2 {
                let phrase = if i < 2 { 1 } else { 2 };
                s.phrase_cur.syllable_count = Field::int(phrase);
            }
        }
        seq.propagate(&PropagationConfig::default());
        let segs = seq.segments();
        assert!(segs[2].phrase_cur.is_unset());
        assert_eq!(segs[0].phrase_next, segs[2].phrase_cur);
        assert_eq!(segs[3].phrase_prev, segs[2].phrase_cur);
        assert_eq!(segs[2].phrase_prev.syllable_count.as_str(), "1");
        assert_eq!(segs[2].phrase_next.syllable_count.as_str(), "2");
    }

    #[test]
    fn report_counts_groups() {
        let mut seq = sequence(&["k", "a", "i"], &["A", "A", "B"]);
        let report = seq.propagate(&PropagationConfig::default());
        assert_eq!(report.segments, 3);
        assert_eq!(report.groups(GroupKind::Syllable), 2);
        assert_eq!(report.groups(GroupKind::Note), 1);
        assert_eq!(report.groups(GroupKind::Phrase), 1);
        assert_eq!(report.to_string(), "3 segments, 2 syllables, 1 notes, 1 phrases");
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut seq = sequence(
            &["sil", "k", "a", "p", "a", "u", "sil"],
            &["S", "A", "A", "B", "B", "B", "T"],
        );
        let config = PropagationConfig {
            nesting: GroupNesting::Hierarchical,
            ..Default::default()
        };
        seq.propagate(&config);
        let once = seq.clone();
        seq.propagate(&config);
        assert_eq!(seq, once);
    }

    #[test]
    fn filled_count_matching_a_neighbour_keeps_groups() {
        // Filling b1 makes the first syllable's window equal to the second's.
        let mut seq = sequence(&["k", "a", "s", "a"], &["xx"; 4]);
        for s in &mut seq.segments_mut()[2..] {
            s.syllable_cur.phoneme_count = Field::int(2);
        }
        let first = seq.propagate(&PropagationConfig::default());
        assert_eq!(first.syllables, 2);
        assert_eq!(seq.segments()[0].syllable_cur, seq.segments()[2].syllable_cur);

        let once = seq.clone();
        assert_eq!(seq.propagate(&PropagationConfig::default()), first);
        assert_eq!(seq, once);

        let mut reloaded: Sequence = seq.serialize().parse().unwrap();
        assert!(reloaded.validate().is_empty());
        reloaded.propagate(&PropagationConfig::default());
        assert_eq!(reloaded.segments(), once.segments());
    }

    #[test]
    fn empty_sequence_is_fine() {
        let mut seq = Sequence::new();
        let report = seq.propagate(&PropagationConfig::default());
        assert_eq!(report, PropagationReport::default());
    }
}
