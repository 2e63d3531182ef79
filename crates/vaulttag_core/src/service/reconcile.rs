//! Suggestion reconciliation.
//!
//! # Responsibility
//! - Turn a raw classifier suggestion into the canonical tag set for a note.
//! - Compute the added/removed diff against the note's effective tags.
//!
//! # Invariants
//! - Pure function: no I/O, same inputs give the same result.
//! - The final set holds at most one maturity tag and at most one
//!   maintenance tag, whatever the classifier returned.
//! - Maturity values outside the closed scale are dropped, never invented.
//! - `added` and `removed` are disjoint.

use crate::model::note::NoteTags;
use crate::model::suggestion::{Maturity, Suggestion};
use crate::model::tag::{Tag, TagSet};

/// Default maintenance flag understood by the reconciler.
pub const DEFAULT_MAINTENANCE_TAG: &str = "for-review";

/// Reconciliation rules beyond the fixed maturity scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    /// Tags treated as maintenance flags; at most one survives.
    pub maintenance_tags: TagSet,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            maintenance_tags: TagSet::from([Tag::from_static(DEFAULT_MAINTENANCE_TAG)]),
        }
    }
}

impl TagPolicy {
    pub fn is_maintenance(&self, tag: &Tag) -> bool {
        self.maintenance_tags.contains(tag)
    }
}

/// Canonical tag set plus its diff against the current tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub final_tags: TagSet,
    pub added: TagSet,
    pub removed: TagSet,
    /// Maturity value that ended up in `final_tags`.
    pub maturity: Option<Maturity>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Removed tags that exist only as inline markup.
    ///
    /// Body text is never edited, so these remain in the note's effective
    /// set after the header is rewritten.
    pub fn inline_retained(&self, note: &NoteTags) -> TagSet {
        self.removed
            .iter()
            .filter(|tag| note.is_inline_only(tag))
            .cloned()
            .collect()
    }
}

/// Reconciles `suggestion` against the note's `current` effective tags.
pub fn reconcile(current: &TagSet, suggestion: &Suggestion, policy: &TagPolicy) -> Reconciliation {
    let mut final_tags = TagSet::new();
    let mut topic_maturity: Option<Maturity> = None;
    let mut topic_maintenance: Option<&Tag> = None;

    for topic in &suggestion.topics {
        if let Some(value) = Maturity::from_tag(topic) {
            topic_maturity = topic_maturity.max(Some(value));
        } else if policy.is_maintenance(topic) {
            topic_maintenance = topic_maintenance.or(Some(topic));
        } else {
            final_tags.insert(topic.clone());
        }
    }

    let maturity = suggestion
        .maturity
        .as_ref()
        .and_then(Maturity::from_tag)
        .or(topic_maturity);
    if let Some(value) = maturity {
        final_tags.insert(value.tag());
    }

    let maintenance = suggestion
        .maintenance
        .as_ref()
        .filter(|tag| Maturity::from_tag(tag).is_none())
        .or(topic_maintenance);
    if let Some(tag) = maintenance {
        final_tags.insert(tag.clone());
    }

    let added = final_tags.difference(current).cloned().collect();
    let removed = current.difference(&final_tags).cloned().collect();

    Reconciliation {
        final_tags,
        added,
        removed,
        maturity,
    }
}
