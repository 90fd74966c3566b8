// Propagation configuration.
//
// Everything the engine treats as tunable lives in `PropagationConfig`: the
// phoneme inventory used for classification, how group boundaries nest, and
// what value fills the neighbour windows of the outermost groups. Loaded from
// JSON; every field is optional and falls back to `Default`.
//
// Example:
//
// ```json
// {
//   "phonology": { "vowels": ["a", "i", "u", "e", "o", "N"] },
//   "nesting": "hierarchical",
//   "edge": { "token": "0" }
// }
// ```

use crate::field::Field;
use crate::grammar;
use crate::phonology::Phonology;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// How group boundaries of different kinds interact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupNesting {
    /// Each kind is grouped on its own windows and hints only.
    #[default]
    Flat,
    /// A phrase boundary is also a note boundary, and a note boundary is also
    /// a syllable boundary.
    Hierarchical,
}

/// Value written into the first group's `prev` and the last group's `next`
/// windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeFill {
    #[default]
    Placeholder,
    /// Every field of the edge window is set to this token. It must be a
    /// plain token (see `grammar::is_plain_token`) or the lines become
    /// unreadable; `PropagationConfig::from_json` enforces this.
    Token(String),
}

impl EdgeFill {
    pub fn field(&self) -> Field {
        match self {
            EdgeFill::Placeholder => Field::unset(),
            EdgeFill::Token(t) => Field::new(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub phonology: Phonology,
    pub nesting: GroupNesting,
    pub edge: EdgeFill,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("edge token {token:?} cannot be written into a label field")]
    EdgeToken { token: String },
}

impl PropagationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Reject settings that would produce unparseable label lines.
    pub fn check(&self) -> Result<(), ConfigError> {
        match &self.edge {
            EdgeFill::Token(token) if !grammar::is_plain_token(token) => {
                Err(ConfigError::EdgeToken {
                    token: token.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Load a config file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
