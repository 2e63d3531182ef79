//! Classifier suggestion model.
//!
//! # Responsibility
//! - Define the closed maturity scale.
//! - Carry one classifier suggestion exactly as received, before policy.
//!
//! # Invariants
//! - `Suggestion` is unvalidated input; the reconciler enforces the
//!   at-most-one maturity / maintenance rules.

use crate::model::tag::Tag;
use serde::{Deserialize, Serialize};

/// Editorial completeness of a note, ordered from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    /// Draft, short, just a link or thought.
    Seed,
    /// Has structure but needs work.
    Sprout,
    /// Polished and complete.
    Evergreen,
}

impl Maturity {
    pub const ALL: [Maturity; 3] = [Maturity::Seed, Maturity::Sprout, Maturity::Evergreen];

    /// Bare tag name for this maturity value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Sprout => "sprout",
            Self::Evergreen => "evergreen",
        }
    }

    /// Maps a tag onto the scale. Matching is exact, as for every tag.
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        match tag.as_str() {
            "seed" => Some(Self::Seed),
            "sprout" => Some(Self::Sprout),
            "evergreen" => Some(Self::Evergreen),
            _ => None,
        }
    }

    pub fn tag(self) -> Tag {
        Tag::from_static(self.as_str())
    }
}

/// Raw classifier output for one note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestion {
    /// Topic tags in classifier order.
    pub topics: Vec<Tag>,
    /// Claimed maturity tag; may be outside the scale.
    pub maturity: Option<Tag>,
    /// Optional maintenance flag such as `for-review`.
    pub maintenance: Option<Tag>,
}
