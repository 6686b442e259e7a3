//! Profile records as supplied by the caller.
//!
//! A profile is opaque structured data. Only three fields are interpreted:
//! the identifier, the display name, and the image references. Everything
//! else is carried through untouched and handed back in match results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Field holding the unique profile identifier.
pub const ID_FIELD: &str = "publicIdentifier";

/// Field holding the human-readable name.
pub const NAME_FIELD: &str = "fullName";

/// Image reference fields, in priority order.
const HIGH_QUALITY_FIELD: &str = "profilePicHighQuality";
const STANDARD_FIELD: &str = "profilePic";
const ALL_DIMENSIONS_FIELD: &str = "profilePicAllDimensions";

/// One identity record. Serializes exactly as it was received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The unique identifier, if present and non-empty.
    ///
    /// Numeric identifiers are accepted and keyed by their JSON text, so
    /// `123` and `"123"` name the same profile.
    pub fn id(&self) -> Option<Cow<'_, str>> {
        match self.0.get(ID_FIELD)? {
            Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }

    /// Build a profile from one entry of a submitted batch.
    ///
    /// Only JSON objects are profile records; anything else yields `None`.
    pub fn from_record(record: Value) -> Option<Self> {
        match record {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The display name, if present.
    pub fn display_name(&self) -> Option<&str> {
        self.str_field(NAME_FIELD)
    }

    /// Candidate image locations in the order acquisition should try them.
    ///
    /// High-quality first, then standard, then every string entry of the
    /// all-dimensions collection. Duplicates keep their first position.
    pub fn image_refs(&self) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        let mut push = |url: &str| {
            if !url.is_empty() && !refs.iter().any(|r| r == url) {
                refs.push(url.to_string());
            }
        };

        if let Some(url) = self.str_field(HIGH_QUALITY_FIELD) {
            push(url);
        }
        if let Some(url) = self.str_field(STANDARD_FIELD) {
            push(url);
        }
        if let Some(Value::Array(dims)) = self.0.get(ALL_DIMENSIONS_FIELD) {
            for url in dims.iter().filter_map(Value::as_str) {
                push(url);
            }
        }
        refs
    }

    /// Label used in log lines: name, then id, then a placeholder.
    pub fn label(&self) -> Cow<'_, str> {
        self.display_name()
            .map(Cow::Borrowed)
            .or_else(|| self.id())
            .unwrap_or(Cow::Borrowed("<unnamed profile>"))
    }

    /// Raw access to all fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<Map<String, Value>> for Profile {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
