// Group detection: the explicit group-id pre-pass.
//
// A label file carries no group ids. A syllable, note or phrase "group" is
// recovered as a maximal run of consecutive segments whose current window of
// that kind is equal (for notes only the nine `note_cur.note` fields count;
// the rest of e1-e60 varies inside a note). Equality alone merges two adjacent
// identical notes, so a producer that knows the real boundaries can leave
// start hints on the sequence; hints are unioned with equality boundaries.
//
// A propagated file also encodes its own boundaries: `p12 = 1` marks the
// first segment of a syllable, and a syllable whose `b2` (position in note)
// is 1 opens a note. These are unioned in as well, so a file written by the
// engine regroups the same way when it is loaded again, even where two
// adjacent groups carry identical windows. Clearing p12 lets a sequence be
// regrouped from its windows alone.
//
// Under `GroupNesting::Hierarchical` the enclosing kind's boundaries are added
// too (phrase -> note -> syllable), so no syllable straddles a note boundary.
//
// Every pass of the engine keys off the ids computed here once, instead of
// re-comparing windows.

use crate::config::GroupNesting;
use crate::segment::Segment;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    Syllable,
    Note,
    Phrase,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [GroupKind::Syllable, GroupKind::Note, GroupKind::Phrase];

    /// True when `a` and `b` carry the same current window of this kind.
    pub fn same_window(self, a: &Segment, b: &Segment) -> bool {
        match self {
            GroupKind::Syllable => a.syllable_cur == b.syllable_cur,
            GroupKind::Note => a.note_cur.note == b.note_cur.note,
            GroupKind::Phrase => a.phrase_cur == b.phrase_cur,
        }
    }

    /// True when `seg` carries a filled field that marks it as the first of
    /// its group: `p12 = 1` for syllables. Notes are recovered from `b2` in
    /// `GroupIds::compute`; phrases have no such field.
    pub fn encoded_start(self, seg: &Segment) -> bool {
        match self {
            GroupKind::Syllable => seg.phoneme.position_forward.value() == Some("1"),
            GroupKind::Note | GroupKind::Phrase => false,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupKind::Syllable => "syllable",
            GroupKind::Note => "note",
            GroupKind::Phrase => "phrase",
        })
    }
}

/// Producer-declared group starts, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupHints {
    syllable: BTreeSet<usize>,
    note: BTreeSet<usize>,
    phrase: BTreeSet<usize>,
}

impl GroupHints {
    pub fn insert(&mut self, kind: GroupKind, index: usize) {
        self.get_mut(kind).insert(index);
    }

    pub fn get(&self, kind: GroupKind) -> &BTreeSet<usize> {
        match kind {
            GroupKind::Syllable => &self.syllable,
            GroupKind::Note => &self.note,
            GroupKind::Phrase => &self.phrase,
        }
    }

    fn get_mut(&mut self, kind: GroupKind) -> &mut BTreeSet<usize> {
        match kind {
            GroupKind::Syllable => &mut self.syllable,
            GroupKind::Note => &mut self.note,
            GroupKind::Phrase => &mut self.phrase,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.syllable.is_empty() && self.note.is_empty() && self.phrase.is_empty()
    }
}

/// Group id of every segment for one kind. Ids count up from 0 in sequence
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    ids: Vec<usize>,
    count: usize,
}

impl Grouping {
    fn from_starts(starts: &[bool]) -> Self {
        let mut ids = Vec::with_capacity(starts.len());
        let mut count: usize = 0;
        for &start in starts {
            if start {
                count += 1;
            }
            ids.push(count.saturating_sub(1));
        }
        Grouping { ids, count }
    }

    pub fn id(&self, index: usize) -> usize {
        self.ids[index]
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Number of groups.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_start(&self, index: usize) -> bool {
        index == 0 || self.ids[index] != self.ids[index - 1]
    }

    /// Index ranges of the groups, in order.
    pub fn runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::with_capacity(self.count);
        let mut begin = 0;
        for i in 1..=self.ids.len() {
            if i == self.ids.len() || self.ids[i] != self.ids[i - 1] {
                runs.push(begin..i);
                begin = i;
            }
        }
        runs
    }
}

/// Group ids of all three kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIds {
    pub syllable: Grouping,
    pub note: Grouping,
    pub phrase: Grouping,
}

impl GroupIds {
    pub fn compute(segments: &[Segment], hints: &GroupHints, nesting: GroupNesting) -> Self {
        let phrase = starts(segments, hints, GroupKind::Phrase);
        let mut syllable = starts(segments, hints, GroupKind::Syllable);
        let mut note = starts(segments, hints, GroupKind::Note);

        // A syllable that is first in its note (b2 = 1) opens a note.
        for (i, seg) in segments.iter().enumerate() {
            if syllable[i] && seg.syllable_cur.position_in_note_forward.value() == Some("1") {
                note[i] = true;
            }
        }

        if nesting == GroupNesting::Hierarchical {
            absorb(&mut note, &phrase);
            absorb(&mut syllable, &note);
        }
        GroupIds {
            syllable: Grouping::from_starts(&syllable),
            note: Grouping::from_starts(&note),
            phrase: Grouping::from_starts(&phrase),
        }
    }

    pub fn get(&self, kind: GroupKind) -> &Grouping {
        match kind {
            GroupKind::Syllable => &self.syllable,
            GroupKind::Note => &self.note,
            GroupKind::Phrase => &self.phrase,
        }
    }
}

fn starts(segments: &[Segment], hints: &GroupHints, kind: GroupKind) -> Vec<bool> {
    let hinted = hints.get(kind);
    (0..segments.len())
        .map(|i| {
            i == 0
                || !kind.same_window(&segments[i - 1], &segments[i])
                || hinted.contains(&i)
                || kind.encoded_start(&segments[i])
        })
        .collect()
}

/// Add the enclosing kind's boundaries to `inner`.
fn absorb(inner: &mut [bool], outer: &[bool]) {
    for (i, o) in inner.iter_mut().zip(outer) {
        *i |= *o;
    }
}
