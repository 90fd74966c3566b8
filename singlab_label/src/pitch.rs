// Note names and pitch arithmetic.
//
// Absolute pitch fields hold note names such as `A4` (MIDI 69, so C4 = 60).
// Names are written with flats because `#` is a separator in the next-note
// group; parsing also accepts sharps so hand-written input still works.

use crate::field::Field;

const NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Note name for a MIDI note number, e.g. `60` -> `C4`.
pub fn note_name(notenum: u8) -> String {
    let octave = i32::from(notenum) / 12 - 1;
    format!("{}{}", NAMES[usize::from(notenum % 12)], octave)
}

/// MIDI note number for a note name. Accepts `b` (flat) and `#` (sharp)
/// accidentals and octaves from -1 to 9.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (shift, octave_text) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };
    let octave: i32 = octave_text.parse().ok()?;
    let notenum = (octave + 1) * 12 + base + shift;
    u8::try_from(notenum).ok().filter(|n| *n <= 127)
}

/// Tonic pitch class of the major key with `sharps` sharps (negative for
/// flats).
pub fn key_tonic(sharps: i32) -> u8 {
    // rem_euclid keeps the value in 0..12
    (7 * sharps).rem_euclid(12) as u8
}

/// Pitch class of `notenum` relative to the key's tonic, 0-11.
pub fn relative_pitch(notenum: u8, sharps: i32) -> u8 {
    (i32::from(notenum) - i32::from(key_tonic(sharps))).rem_euclid(12) as u8
}

/// Interval token from `from` to `to`: `p<n>` for rising or equal, `m<n>` for
/// falling.
pub fn pitch_difference(from: u8, to: u8) -> Field {
    let diff = i32::from(to) - i32::from(from);
    if diff >= 0 {
        Field::new(format!("p{diff}"))
    } else {
        Field::new(format!("m{}", -diff))
    }
}

/// Interval token between two absolute-pitch fields, `None` unless both parse.
pub fn field_difference(from: &Field, to: &Field) -> Option<Field> {
    let from = parse_note_name(from.value()?)?;
    let to = parse_note_name(to.value()?)?;
    Some(pitch_difference(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for n in 0..=127u8 {
            assert_eq!(parse_note_name(&note_name(n)), Some(n), "notenum {n}");
        }
    }

    #[test]
    fn known_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(61), "Db4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn sharps_are_accepted() {
        assert_eq!(parse_note_name("C#4"), Some(61));
        assert_eq!(parse_note_name("Db4"), Some(61));
        assert_eq!(parse_note_name("B#3"), Some(60));
    }

    #[test]
    fn bad_names() {
        assert_eq!(parse_note_name(""), None);
        assert_eq!(parse_note_name("H4"), None);
        assert_eq!(parse_note_name("C"), None);
        assert_eq!(parse_note_name("xx"), None);
        assert_eq!(parse_note_name("Cb-1"), None);
        assert_eq!(parse_note_name("A9"), None);
    }

    #[test]
    fn relative_to_key() {
        assert_eq!(relative_pitch(60, 0), 0);
        assert_eq!(relative_pitch(69, 0), 9);
        // G major: one sharp, tonic G
        assert_eq!(key_tonic(1), 7);
        assert_eq!(relative_pitch(67, 1), 0);
        // F major: one flat
        assert_eq!(key_tonic(-1), 5);
        assert_eq!(relative_pitch(64, -1), 11);
    }

    #[test]
    fn difference_tokens() {
        assert_eq!(pitch_difference(60, 62).as_str(), "p2");
        assert_eq!(pitch_difference(62, 60).as_str(), "m2");
        assert_eq!(pitch_difference(60, 60).as_str(), "p0");
        assert_eq!(
            field_difference(&Field::new("A4"), &Field::new("C5")).map(|f| f.to_string()),
            Some("p3".to_string())
        );
        assert!(field_difference(&Field::unset(), &Field::new("C5")).is_none());
    }
}
