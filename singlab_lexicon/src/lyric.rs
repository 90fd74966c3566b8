// Lyric normalization.
//
// Score lyrics arrive in UTAU conventions: a rest is written `R` (or `pau` /
// `sil` in some exports), and VCV voicebanks prefix each lyric with the
// previous vowel and a space (`a か`). Normalization reduces a raw lyric to
// either a rest or the bare syllable to look up.

/// A normalized lyric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lyric {
    Rest,
    Sung(String),
}

impl Lyric {
    pub fn is_rest(&self) -> bool {
        matches!(self, Lyric::Rest)
    }
}

const REST_LYRICS: [&str; 4] = ["R", "r", "pau", "sil"];

/// Trim, drop a VCV prefix, and detect rests.
pub fn normalize_lyric(raw: &str) -> Lyric {
    let Some(syllable) = raw.split_whitespace().last() else {
        return Lyric::Rest;
    };
    if REST_LYRICS.contains(&syllable) {
        Lyric::Rest
    } else {
        Lyric::Sung(syllable.to_string())
    }
}
