// Phoneme classification.
//
// The engine needs to know which identities are vowels (for the vowel-distance
// fields) and which are pauses or silences (which break distance counting and
// fill the language-independent class field p1). Classification goes through
// the `PhonemeClassifier` trait so callers can plug in a language-specific
// inventory; the default `Phonology` is set-driven and loaded as part of
// `PropagationConfig`.

use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Broad phoneme category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhonemeClass {
    Vowel,
    Consonant,
    /// Short pause inside a song (`pau`, breath).
    Pause,
    /// Leading/trailing silence.
    Silence,
    /// Unset identity.
    Other,
}

impl PhonemeClass {
    /// The p1 token for this class, `None` for `Other`.
    pub fn token(self) -> Option<&'static str> {
        match self {
            PhonemeClass::Vowel => Some("v"),
            PhonemeClass::Consonant => Some("c"),
            PhonemeClass::Pause => Some("p"),
            PhonemeClass::Silence => Some("s"),
            PhonemeClass::Other => None,
        }
    }

    /// Pauses, silences and unset identities all break vowel-distance counts.
    pub fn breaks_distance(self) -> bool {
        matches!(
            self,
            PhonemeClass::Pause | PhonemeClass::Silence | PhonemeClass::Other
        )
    }
}

pub trait PhonemeClassifier {
    fn classify(&self, phoneme: &Field) -> PhonemeClass;
}

/// Set-driven classifier. Anything that is not a listed vowel, pause or
/// silence is a consonant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phonology {
    pub vowels: BTreeSet<String>,
    pub pauses: BTreeSet<String>,
    pub silences: BTreeSet<String>,
}

impl Default for Phonology {
    fn default() -> Self {
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Phonology {
            vowels: set(&["a", "i", "u", "e", "o", "A", "I", "U", "E", "O"]),
            pauses: set(&["pau", "br"]),
            silences: set(&["sil"]),
        }
    }
}

impl PhonemeClassifier for Phonology {
    fn classify(&self, phoneme: &Field) -> PhonemeClass {
        let Some(p) = phoneme.value() else {
            return PhonemeClass::Other;
        };
        if self.vowels.contains(p) {
            PhonemeClass::Vowel
        } else if self.pauses.contains(p) {
            PhonemeClass::Pause
        } else if self.silences.contains(p) {
            PhonemeClass::Silence
        } else {
            PhonemeClass::Consonant
        }
    }
}
