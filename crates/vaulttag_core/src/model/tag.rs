//! Tag value type.
//!
//! # Responsibility
//! - Hold one tag in canonical bare form (`project-x`, never `#project-x`).
//! - Own the marker prefix rules used at parse and presentation boundaries.
//!
//! # Invariants
//! - A `Tag` is never empty and never starts with the marker character.
//! - Case is preserved as authored; comparisons are exact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Marker character that prefixes tags in prose and classifier output.
pub const TAG_MARKER: char = '#';

/// Ordered set of tags used for all membership comparisons.
pub type TagSet = BTreeSet<Tag>;

/// One normalized tag identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Parses a tag from raw text, stripping whitespace and leading markers.
    ///
    /// Returns `None` when nothing remains.
    pub fn parse(raw: &str) -> Option<Self> {
        let bare = raw.trim().trim_start_matches(TAG_MARKER).trim();
        if bare.is_empty() {
            None
        } else {
            Some(Self(bare.to_string()))
        }
    }

    /// Builds a tag from a compile-time bare name.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(!name.is_empty() && !name.starts_with(TAG_MARKER));
        Self(name.to_string())
    }

    /// Bare name as stored in note headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Marker-prefixed form (`#name`) used in prose and prompts.
    pub fn marked(&self) -> String {
        format!("{TAG_MARKER}{}", self.0)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{TAG_MARKER}{}", self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid tag `{value}`"))
    }
}

impl From<Tag> for String {
    fn from(value: Tag) -> Self {
        value.0
    }
}

/// Parses every value and collects the valid ones into a [`TagSet`].
pub fn tag_set<I, S>(values: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .filter_map(|value| Tag::parse(value.as_ref()))
        .collect()
}

/// Renders tags in marked form joined by `", "`.
pub fn display_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> String {
    tags.into_iter()
        .map(Tag::marked)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{display_tags, tag_set, Tag};

    #[test]
    fn parse_strips_marker_and_whitespace() {
        assert_eq!(Tag::parse("  #project-x ").unwrap().as_str(), "project-x");
        assert_eq!(Tag::parse("##nested/tag").unwrap().as_str(), "nested/tag");
        assert_eq!(Tag::parse("plain").unwrap().as_str(), "plain");
    }

    #[test]
    fn parse_rejects_blank_and_marker_only() {
        assert!(Tag::parse("").is_none());
        assert!(Tag::parse("   ").is_none());
        assert!(Tag::parse("#").is_none());
    }

    #[test]
    fn case_is_preserved() {
        let upper = Tag::parse("Rust").unwrap();
        let lower = Tag::parse("rust").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper.marked(), "#Rust");
    }

    #[test]
    fn display_uses_marked_form() {
        let tags = tag_set(["#b", "a"]);
        assert_eq!(display_tags(&tags), "#a, #b");
    }

    #[test]
    fn serde_uses_bare_string() {
        let tag = Tag::parse("#seed").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"seed\"");
        let decoded: Tag = serde_json::from_str("\"#seed\"").unwrap();
        assert_eq!(decoded, tag);
        assert!(serde_json::from_str::<Tag>("\"#\"").is_err());
    }
}
