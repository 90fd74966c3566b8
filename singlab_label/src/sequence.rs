// Sequence container: the ordered segments of one label file.
//
// File order is chronological order and is preserved by every operation.
// Besides its segments a sequence may carry group-start hints left by a
// producer (see `groups.rs`); hints are never written to or read from the text
// format, so a loaded sequence has none.
//
// Loading is all-or-nothing: the first malformed line aborts with its 1-based
// line number. Blank lines are skipped and a trailing `\r` is ignored, so
// files written on Windows load unchanged.

use crate::config::PropagationConfig;
use crate::grammar::{self, FormatError};
use crate::groups::{GroupHints, GroupIds, GroupKind};
use crate::propagate::{self, PropagationReport};
use crate::segment::Segment;
use crate::validate::{self, Inconsistency};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: {source}")]
    Format {
        line: usize,
        #[source]
        source: FormatError,
    },
    #[error("label file I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    segments: Vec<Segment>,
    hints: GroupHints,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Sequence {
            segments,
            hints: GroupHints::default(),
        }
    }

    /// Parse label lines in order.
    pub fn load<I, S>(lines: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let segment = grammar::parse_line(line)
                .map_err(|source| LoadError::Format { line: i + 1, source })?;
            segments.push(segment);
        }
        Ok(Self::from_segments(segments))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::load(text.lines())
    }

    /// Write the serialized text plus a final newline.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let mut text = self.serialize();
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Newline-joined label lines, no trailing newline.
    pub fn serialize(&self) -> String {
        self.segments
            .iter()
            .map(grammar::format_segment)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Record that a `kind` group starts at `index`.
    pub fn mark_group_start(&mut self, kind: GroupKind, index: usize) {
        self.hints.insert(kind, index);
    }

    /// Producer hints for `kind`.
    pub fn group_starts(&self, kind: GroupKind) -> &BTreeSet<usize> {
        self.hints.get(kind)
    }

    /// Group ids as the engine sees them under `config`.
    pub fn group_ids(&self, config: &PropagationConfig) -> GroupIds {
        GroupIds::compute(&self.segments, &self.hints, config.nesting)
    }

    /// Fill every neighbour window and derived field in place.
    pub fn propagate(&mut self, config: &PropagationConfig) -> PropagationReport {
        propagate::propagate(self, config)
    }

    /// Invariant violations under the default configuration.
    pub fn validate(&self) -> Vec<Inconsistency> {
        self.validate_with(&PropagationConfig::default())
    }

    pub fn validate_with(&self, config: &PropagationConfig) -> Vec<Inconsistency> {
        validate::validate(self, config)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Sequence {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::load(s.lines())
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
