//! Tag surfaces of one note.
//!
//! # Responsibility
//! - Keep header tags and inline tags as two separately typed values.
//! - Merge them only at the read boundary (`NoteTags::effective`).
//!
//! # Invariants
//! - Header tags are the only surface the engine may rewrite.
//! - Inline tags are read-only; there is deliberately no mutator for them.
//! - Both surfaces are deduplicated and keep first-appearance order.

use crate::model::tag::{Tag, TagSet};

/// Tags declared in the structured header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTags(Vec<Tag>);

/// Tags embedded as marked tokens in body text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineTags(Vec<Tag>);

impl HeaderTags {
    pub fn from_ordered(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self(dedup_ordered(tags))
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_set(&self) -> TagSet {
        self.0.iter().cloned().collect()
    }
}

impl InlineTags {
    pub fn from_ordered(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self(dedup_ordered(tags))
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_set(&self) -> TagSet {
        self.0.iter().cloned().collect()
    }
}

/// Extraction result for one note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTags {
    pub header: HeaderTags,
    pub inline: InlineTags,
    /// Parse failure message when a header block exists but is malformed.
    pub header_error: Option<String>,
}

impl NoteTags {
    pub fn is_header_malformed(&self) -> bool {
        self.header_error.is_some()
    }

    /// Union of header and inline tags.
    pub fn effective(&self) -> TagSet {
        self.header
            .as_slice()
            .iter()
            .chain(self.inline.as_slice())
            .cloned()
            .collect()
    }

    /// Effective tags in first-appearance order: header first, then inline.
    pub fn ordered(&self) -> Vec<Tag> {
        dedup_ordered(
            self.header
                .as_slice()
                .iter()
                .chain(self.inline.as_slice())
                .cloned(),
        )
    }

    /// Whether `tag` is present only as inline markup.
    pub fn is_inline_only(&self, tag: &Tag) -> bool {
        self.inline.contains(tag) && !self.header.contains(tag)
    }
}

fn dedup_ordered(tags: impl IntoIterator<Item = Tag>) -> Vec<Tag> {
    let mut seen = TagSet::new();
    let mut ordered = Vec::new();
    for tag in tags {
        if seen.insert(tag.clone()) {
            ordered.push(tag);
        }
    }
    ordered
}
