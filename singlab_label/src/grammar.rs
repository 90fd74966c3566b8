// Field grammar: the textual encoding of one label line.
//
// A line is `start end body`. The body is eleven groups; the first (phoneme)
// has no marker and the rest are introduced by `/A:` .. `/J:` in order. Inside
// a group, fields are separated by a fixed, group-specific list of punctuation
// characters. The lists are not interchangeable between groups and are written
// out literally below.
//
// Splitting walks a group's separator list in order, searching each separator
// only after the previous one. A field may therefore contain characters that
// are separators elsewhere in the group as long as it does not contain the
// very next separator. The same value can land in different groups (the key
// sits before `=` in e3 but before `-` in f3), so
// producers write keys as a pitch class and note names with flats (`Db4`),
// since `-` and `#` are separators in the next-note group.
//
// `format_segment` is the exact inverse: for any line accepted by `parse_line`,
// formatting the result reproduces the body character for character.

use crate::field::Field;
use crate::segment::Segment;
use crate::window::Window;
use std::fmt::Write as _;
use thiserror::Error;

/// Marker and separator layout of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupFormat {
    /// Lower-case group letter used in field names (`p`, `a`, .. `j`).
    pub name: char,
    /// Text introducing the group (`/A:`), empty for the phoneme group.
    pub marker: &'static str,
    /// Separators between consecutive fields, in order.
    pub separators: &'static [char],
}

impl GroupFormat {
    /// Number of fields in the group.
    pub const fn arity(&self) -> usize {
        self.separators.len() + 1
    }
}

pub const PHONEME: GroupFormat = GroupFormat {
    name: 'p',
    marker: "",
    separators: &[
        '@', '^', '-', '+', '=', '_', '%', '^', '_', '~', '-', '!', '[', '$', ']',
    ],
};

pub const SYLLABLE_PREV: GroupFormat = GroupFormat {
    name: 'a',
    marker: "/A:",
    separators: &['-', '-', '@', '~'],
};

pub const SYLLABLE_CUR: GroupFormat = GroupFormat {
    name: 'b',
    marker: "/B:",
    separators: &['_', '_', '@', '|'],
};

pub const SYLLABLE_NEXT: GroupFormat = GroupFormat {
    name: 'c',
    marker: "/C:",
    separators: &['+', '+', '@', '&'],
};

pub const NOTE_PREV: GroupFormat = GroupFormat {
    name: 'd',
    marker: "/D:",
    separators: &['!', '#', '$', '%', '|', '&', ';', '-'],
};

pub const NOTE_CUR: GroupFormat = GroupFormat {
    name: 'e',
    marker: "/E:",
    separators: &[
        ']', '^', '=', '~', '!', '@', '#', '+', ']', '$', '|', '[', '&', ']', '=', '^', '~', '#',
        '_', ';', '$', '&', '%', '[', '|', ']', '-', '^', '+', '~', '=', '@', '$', '!', '%', '#',
        '|', '|', '-', '&', '&', '+', '[', ';', ']', ';', '~', '~', '^', '^', '@', '[', '#', '=',
        '!', '~', '+', '!', '^',
    ],
};

pub const NOTE_NEXT: GroupFormat = GroupFormat {
    name: 'f',
    marker: "/F:",
    separators: &['#', '#', '-', '$', '$', '+', '%', ';'],
};

pub const PHRASE_PREV: GroupFormat = GroupFormat {
    name: 'g',
    marker: "/G:",
    separators: &['_'],
};

pub const PHRASE_CUR: GroupFormat = GroupFormat {
    name: 'h',
    marker: "/H:",
    separators: &['_'],
};

pub const PHRASE_NEXT: GroupFormat = GroupFormat {
    name: 'i',
    marker: "/I:",
    separators: &['_'],
};

pub const SONG: GroupFormat = GroupFormat {
    name: 'j',
    marker: "/J:",
    separators: &['~', '@'],
};

/// All groups in line order.
pub const GROUPS: [&GroupFormat; 11] = [
    &PHONEME,
    &SYLLABLE_PREV,
    &SYLLABLE_CUR,
    &SYLLABLE_NEXT,
    &NOTE_PREV,
    &NOTE_CUR,
    &NOTE_NEXT,
    &PHRASE_PREV,
    &PHRASE_CUR,
    &PHRASE_NEXT,
    &SONG,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing start/end time")]
    MissingTime,
    #[error("invalid time {text:?}: expected a non-negative integer")]
    InvalidTime { text: String },
    #[error("missing context body after the times")]
    MissingBody,
    #[error("unexpected text after the context body: {text:?}")]
    TrailingText { text: String },
    #[error("missing group marker {marker}")]
    MissingMarker { marker: &'static str },
    #[error("unexpected group marker {marker:?} in group '{group}'")]
    UnexpectedMarker { group: char, marker: String },
    #[error("group '{group}' has {found} fields, expected {expected}")]
    FieldCount {
        group: char,
        expected: usize,
        found: usize,
    },
    #[error("field {group}{position} is empty")]
    EmptyField { group: char, position: usize },
}

/// Parse one label line.
pub fn parse_line(text: &str) -> Result<Segment, FormatError> {
    let mut tokens = text.split_whitespace();
    let start = parse_time(tokens.next().ok_or(FormatError::MissingTime)?)?;
    let end = parse_time(tokens.next().ok_or(FormatError::MissingTime)?)?;
    let body = tokens.next().ok_or(FormatError::MissingBody)?;
    if let Some(extra) = tokens.next() {
        return Err(FormatError::TrailingText {
            text: extra.to_string(),
        });
    }

    let pieces = split_markers(body)?;
    Ok(Segment {
        start,
        end,
        phoneme: read_group(&PHONEME, pieces[0])?,
        syllable_prev: read_group(&SYLLABLE_PREV, pieces[1])?,
        syllable_cur: read_group(&SYLLABLE_CUR, pieces[2])?,
        syllable_next: read_group(&SYLLABLE_NEXT, pieces[3])?,
        note_prev: read_group(&NOTE_PREV, pieces[4])?,
        note_cur: read_group(&NOTE_CUR, pieces[5])?,
        note_next: read_group(&NOTE_NEXT, pieces[6])?,
        phrase_prev: read_group(&PHRASE_PREV, pieces[7])?,
        phrase_cur: read_group(&PHRASE_CUR, pieces[8])?,
        phrase_next: read_group(&PHRASE_NEXT, pieces[9])?,
        song: read_group(&SONG, pieces[10])?,
    })
}

/// Serialize a segment to one label line (no trailing newline).
pub fn format_segment(segment: &Segment) -> String {
    let mut out = String::with_capacity(512);
    let _ = write!(out, "{} {} ", segment.start, segment.end);
    write_group(&mut out, &PHONEME, &segment.phoneme);
    write_group(&mut out, &SYLLABLE_PREV, &segment.syllable_prev);
    write_group(&mut out, &SYLLABLE_CUR, &segment.syllable_cur);
    write_group(&mut out, &SYLLABLE_NEXT, &segment.syllable_next);
    write_group(&mut out, &NOTE_PREV, &segment.note_prev);
    write_group(&mut out, &NOTE_CUR, &segment.note_cur);
    write_group(&mut out, &NOTE_NEXT, &segment.note_next);
    write_group(&mut out, &PHRASE_PREV, &segment.phrase_prev);
    write_group(&mut out, &PHRASE_CUR, &segment.phrase_cur);
    write_group(&mut out, &PHRASE_NEXT, &segment.phrase_next);
    write_group(&mut out, &SONG, &segment.song);
    out
}

/// True when `text` can be written into any field and read back unchanged:
/// non-empty, with no whitespace, no `/` and no separator of any group.
pub fn is_plain_token(text: &str) -> bool {
    !text.is_empty()
        && !text.chars().any(|c| {
            c.is_whitespace() || c == '/' || GROUPS.iter().any(|g| g.separators.contains(&c))
        })
}

fn parse_time(text: &str) -> Result<u64, FormatError> {
    text.parse().map_err(|_| FormatError::InvalidTime {
        text: text.to_string(),
    })
}

/// Cut the body at the group markers, which must appear in order.
fn split_markers(body: &str) -> Result<[&str; 11], FormatError> {
    let mut pieces = [""; 11];
    let mut rest = body;
    for (slot, format) in GROUPS.iter().enumerate().skip(1) {
        let pos = rest.find(format.marker).ok_or(FormatError::MissingMarker {
            marker: format.marker,
        })?;
        pieces[slot - 1] = &rest[..pos];
        rest = &rest[pos + format.marker.len()..];
    }
    pieces[10] = rest;

    for (piece, format) in pieces.iter().zip(GROUPS) {
        if let Some(marker) = stray_marker(piece) {
            return Err(FormatError::UnexpectedMarker {
                group: format.name,
                marker: marker.to_string(),
            });
        }
    }
    Ok(pieces)
}

/// First `/X:` look-alike in a group body, if any.
fn stray_marker(piece: &str) -> Option<&str> {
    piece
        .as_bytes()
        .windows(3)
        .position(|w| w[0] == b'/' && w[1].is_ascii_uppercase() && w[2] == b':')
        .map(|i| &piece[i..i + 3])
}

fn read_group<W: Window>(format: &GroupFormat, piece: &str) -> Result<W, FormatError> {
    debug_assert_eq!(W::ARITY, format.arity());
    let mut fields = Vec::with_capacity(format.arity());
    let mut rest = piece;
    for &sep in format.separators {
        let Some(pos) = rest.find(sep) else {
            return Err(FormatError::FieldCount {
                group: format.name,
                expected: format.arity(),
                found: fields.len() + 1,
            });
        };
        fields.push(read_field(format, fields.len(), &rest[..pos])?);
        rest = &rest[pos + sep.len_utf8()..];
    }
    if rest.contains(format.separators) {
        let surplus = rest.matches(format.separators).count();
        return Err(FormatError::FieldCount {
            group: format.name,
            expected: format.arity(),
            found: format.arity() + surplus,
        });
    }
    fields.push(read_field(format, fields.len(), rest)?);
    Ok(W::from_fields(fields))
}

fn read_field(format: &GroupFormat, index: usize, text: &str) -> Result<Field, FormatError> {
    if text.is_empty() {
        return Err(FormatError::EmptyField {
            group: format.name,
            position: index + 1,
        });
    }
    Ok(Field::new(text))
}

fn write_group<W: Window>(out: &mut String, format: &GroupFormat, window: &W) {
    out.push_str(format.marker);
    for (i, field) in window.fields().into_iter().enumerate() {
        if i > 0 {
            out.push(format.separators[i - 1]);
        }
        out.push_str(field.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{NoteContext, PhonemeWindow};

    /// Placeholder line as emitted by a producer before propagation.
    const BLANK_BODY: &str = "xx@xx^xx-xx+xx=xx_xx%xx^xx_xx~xx-xx!xx[xx$xx]xx\
/A:xx-xx-xx@xx~xx/B:xx_xx_xx@xx|xx/C:xx+xx+xx@xx&xx\
/D:xx!xx#xx$xx%xx|xx&xx;xx-xx\
/E:xx]xx^xx=xx~xx!xx@xx#xx+xx]xx$xx|xx[xx&xx]xx=xx^xx~xx#xx_xx;xx$xx&xx%xx[xx|xx]xx-xx^xx+xx~xx=xx@xx$xx!xx%xx#xx|xx|xx-xx&xx&xx+xx[xx;xx]xx;xx~xx~xx^xx^xx@xx[xx#xx=xx!xx~xx+xx!xx^xx\
/F:xx#xx#xx-xx$xx$xx+xx%xx;xx/G:xx_xx/H:xx_xx/I:xx_xx/J:xx~xx@xx";

    #[test]
    fn arities_match_windows() {
        assert_eq!(PHONEME.arity(), PhonemeWindow::ARITY);
        assert_eq!(SYLLABLE_PREV.arity(), 5);
        assert_eq!(NOTE_PREV.arity(), 9);
        assert_eq!(NOTE_CUR.arity(), NoteContext::ARITY);
        assert_eq!(NOTE_NEXT.arity(), 9);
        assert_eq!(PHRASE_CUR.arity(), 2);
        assert_eq!(SONG.arity(), 3);
        let total: usize = GROUPS.iter().map(|g| g.arity()).sum();
        assert_eq!(total, 118);
    }

    #[test]
    fn blank_line_round_trip() {
        let line = format!("0 500000 {BLANK_BODY}");
        let seg = parse_line(&line).unwrap();
        assert_eq!(seg.start, 0);
        assert_eq!(seg.end, 500000);
        assert!(seg.phoneme.current.is_unset());
        assert_eq!(format_segment(&seg), line);
    }

    #[test]
    fn tokens_land_in_named_fields() {
        let line = "100 200 xx@xx^sil-a+k=xx_xx%xx^00_00~xx-1!1[xx$xx]xx\
/A:xx-xx-xx@xx~xx/B:1_1_1@JPN|xx/C:2+1+1@JPN&xx\
/D:xx!xx#xx$xx%xx|xx&xx;xx-xx\
/E:A4]9^0=4/4~120!1@50#24+xx]xx$xx|xx[xx&xx]xx=xx^xx~xx#xx_xx;xx$xx&xx%xx[xx|xx]xx-xx^xx+xx~xx=xx@xx$xx!xx%xx#xx|xx|xx-xx&xx&xx+xx[xx;xx]xx;xx~xx~xx^xx^xx@xx[xx#xx=xx!xx~xx+xx!xx^xx\
/F:Bb4#10#0-4/4$120$1+50%24;xx/G:xx_xx/H:2_3/I:xx_xx/J:2~3@1";
        let seg = parse_line(line).unwrap();
        assert_eq!(seg.phoneme.before.as_str(), "sil");
        assert_eq!(seg.phoneme.current.as_str(), "a");
        assert_eq!(seg.phoneme.next.as_str(), "k");
        assert!(seg.phoneme.flag_before.is_unset());
        assert_eq!(seg.phoneme.flag_current.as_str(), "00");
        assert_eq!(seg.phoneme.flag_next.as_str(), "00");
        assert_eq!(seg.syllable_cur.language.as_str(), "JPN");
        assert_eq!(seg.note_cur.note.absolute_pitch.as_str(), "A4");
        assert_eq!(seg.note_cur.note.beat.as_str(), "4/4");
        assert_eq!(seg.note_next.absolute_pitch.as_str(), "Bb4");
        assert_eq!(seg.note_next.beat.as_str(), "4/4");
        assert_eq!(seg.phrase_cur.phoneme_count.as_str(), "3");
        assert_eq!(seg.song.phrase_count.as_str(), "1");
        assert_eq!(format_segment(&seg), line);
    }

    #[test]
    fn missing_and_bad_times() {
        assert_eq!(parse_line(""), Err(FormatError::MissingTime));
        assert_eq!(parse_line("10"), Err(FormatError::MissingTime));
        assert_eq!(parse_line("0 10"), Err(FormatError::MissingBody));
        assert!(matches!(
            parse_line(&format!("-5 10 {BLANK_BODY}")),
            Err(FormatError::InvalidTime { .. })
        ));
        assert!(matches!(
            parse_line(&format!("0 ten {BLANK_BODY}")),
            Err(FormatError::InvalidTime { .. })
        ));
    }

    #[test]
    fn missing_marker() {
        let line = format!("0 10 {}", BLANK_BODY.replace("/G:", "/g:"));
        assert_eq!(
            parse_line(&line),
            Err(FormatError::MissingMarker { marker: "/G:" })
        );
    }

    #[test]
    fn extra_marker_after_song() {
        let line = format!("0 10 {BLANK_BODY}/K:xx");
        assert!(matches!(
            parse_line(&line),
            Err(FormatError::UnexpectedMarker { group: 'j', .. })
        ));
    }

    #[test]
    fn field_count_mismatch() {
        let short = format!("0 10 {}", BLANK_BODY.replace("/H:xx_xx", "/H:xx"));
        assert_eq!(
            parse_line(&short),
            Err(FormatError::FieldCount {
                group: 'h',
                expected: 2,
                found: 1
            })
        );
        let long = format!("0 10 {}", BLANK_BODY.replace("/H:xx_xx", "/H:xx_xx_xx"));
        assert_eq!(
            parse_line(&long),
            Err(FormatError::FieldCount {
                group: 'h',
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn empty_field_is_rejected() {
        let line = format!("0 10 {}", BLANK_BODY.replace("/J:xx~xx@xx", "/J:xx~@xx"));
        assert_eq!(
            parse_line(&line),
            Err(FormatError::EmptyField {
                group: 'j',
                position: 2
            })
        );
    }

    #[test]
    fn plain_tokens() {
        for ok in ["0", "xx", "Db4", "JPN", "p2", "m12"] {
            assert!(is_plain_token(ok), "{ok}");
        }
        for bad in ["", "a b", "-1", "4/4", "/A:", "x_y", "C#4"] {
            assert!(!is_plain_token(bad), "{bad}");
        }
    }

    #[test]
    fn trailing_text_is_rejected() {
        let line = format!("0 10 {BLANK_BODY} extra");
        assert!(matches!(
            parse_line(&line),
            Err(FormatError::TrailingText { .. })
        ));
    }
}
