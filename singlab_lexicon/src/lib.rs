// Lyric to phoneme dictionary.
//
// Splits a note's lyric into the ordered phonemes that become one label
// segment each. Used by `singlab_score` when composing labels from a score.
//
// Architecture:
// - `lyric.rs`: `normalize_lyric`, reducing UTAU-style lyrics to a rest or a
//   bare syllable
// - `lib.rs` (this file): `PhonemeTable`, loading and querying the dictionary
//
// Two file formats are accepted. The table format is the whitespace-separated
// layout used by UTAU tooling (`か k a`, one entry per line, `#` comments);
// the JSON format is `{"entries": {"か": ["k", "a"]}}`. `default_table()`
// embeds `data/kana_romaji.table`, a hiragana to romaji table covering plain,
// voiced and contracted kana.

pub mod lyric;

pub use lyric::{Lyric, normalize_lyric};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// The top-level JSON structure for a dictionary file.
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    entries: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("line {line}: entry has no phonemes")]
    EmptyEntry { line: usize },
    #[error("dictionary entry {lyric:?} has no phonemes")]
    EmptyJsonEntry { lyric: String },
    #[error("invalid dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read dictionary: {0}")]
    Io(#[from] std::io::Error),
}

/// A lyric missing from the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lyric {lyric:?} is not in the phoneme table")]
pub struct LookupError {
    pub lyric: String,
}

/// Lyric -> ordered phonemes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhonemeTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl PhonemeTable {
    /// Parse the whitespace table format. Later duplicates override earlier
    /// entries.
    pub fn from_table_text(text: &str) -> Result<Self, TableError> {
        let mut entries = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let Some(lyric) = tokens.next() else {
                continue;
            };
            let phonemes: Vec<String> = tokens.map(str::to_string).collect();
            if phonemes.is_empty() {
                return Err(TableError::EmptyEntry { line: i + 1 });
            }
            entries.insert(lyric.to_string(), phonemes);
        }
        Ok(PhonemeTable { entries })
    }

    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(json)?;
        if let Some((lyric, _)) = file.entries.iter().find(|(_, ph)| ph.is_empty()) {
            return Err(TableError::EmptyJsonEntry {
                lyric: lyric.clone(),
            });
        }
        Ok(PhonemeTable {
            entries: file.entries,
        })
    }

    /// Load a dictionary file: JSON for `.json`, table text otherwise.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&text)
        } else {
            Self::from_table_text(&text)
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&TableFile {
            entries: self.entries.clone(),
        })
    }

    /// Phonemes of `lyric`, in order.
    pub fn lookup(&self, lyric: &str) -> Result<&[String], LookupError> {
        self.entries
            .get(lyric)
            .map(Vec::as_slice)
            .ok_or_else(|| LookupError {
                lyric: lyric.to_string(),
            })
    }

    pub fn insert(&mut self, lyric: impl Into<String>, phonemes: Vec<String>) {
        self.entries.insert(lyric.into(), phonemes);
    }

    /// Entries in lyric order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The built-in hiragana table.
///
/// Uses `include_str!` to embed `data/kana_romaji.table`. Panics if the
/// embedded table is malformed (should never happen in a released build).
pub fn default_table() -> PhonemeTable {
    let text = include_str!("../data/kana_romaji.table");
    PhonemeTable::from_table_text(text).expect("embedded kana_romaji.table is malformed")
}
