// A single context field: a token or the `xx` placeholder.
//
// Every position of every window holds a `Field`. The placeholder is a
// first-class value rather than an `Option` at the call sites, because the
// propagation engine copies whole windows around and must treat "unset" as
// just another value when comparing group keys. Constructing a field from the
// literal text `xx` always yields the placeholder, so two fields compare equal
// exactly when their serialized forms are equal.
//
// Serialized through serde as its text form (`"xx"` for the placeholder), which
// keeps the JSON export byte-compatible with the label grammar.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The placeholder token meaning "unset / not applicable".
pub const PLACEHOLDER: &str = "xx";

/// One context value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Field(Option<String>);

impl Field {
    /// The placeholder value.
    pub const fn unset() -> Self {
        Field(None)
    }

    /// Build a field from text. `xx` becomes the placeholder.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text == PLACEHOLDER {
            Field(None)
        } else {
            Field(Some(text))
        }
    }

    /// Build a field holding a decimal integer.
    pub fn int(value: impl fmt::Display) -> Self {
        Field(Some(value.to_string()))
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// The token, or `None` for the placeholder.
    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// The serialized text (`xx` for the placeholder).
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or(PLACEHOLDER)
    }

    /// Parse the token as a number. The placeholder and non-numeric tokens
    /// both give `None`.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        self.value().and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Field {
    fn from(text: String) -> Self {
        Field::new(text)
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::new(text)
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.0.unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_text_is_unset() {
        assert!(Field::new("xx").is_unset());
        assert_eq!(Field::new("xx"), Field::unset());
        assert_eq!(Field::unset().as_str(), "xx");
    }

    #[test]
    fn tokens_keep_their_text() {
        let f = Field::new("pau");
        assert!(!f.is_unset());
        assert_eq!(f.value(), Some("pau"));
        assert_eq!(f.to_string(), "pau");
    }

    #[test]
    fn int_and_parse() {
        assert_eq!(Field::int(12).as_str(), "12");
        assert_eq!(Field::int(12).parse::<u32>(), Some(12));
        assert_eq!(Field::unset().parse::<u32>(), None);
        assert_eq!(Field::new("C4").parse::<u32>(), None);
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&vec![Field::unset(), Field::new("a")]).unwrap();
        assert_eq!(json, r#"["xx","a"]"#);
        let back: Vec<Field> = serde_json::from_str(&json).unwrap();
        assert!(back[0].is_unset());
        assert_eq!(back[1].value(), Some("a"));
    }
}
