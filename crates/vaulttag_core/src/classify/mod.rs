//! External classifier boundary.
//!
//! # Responsibility
//! - Define the capability interface the orchestrator calls per note.
//! - Shape the request (bounded content prefix, current tags, vocabulary).
//! - Parse loosely formatted responses into a typed [`Suggestion`].
//!
//! # Invariants
//! - Classifier failures are soft: they mean "no suggestion" for that note.
//! - Response parsing does not depend on any live classifier.

pub mod response;

use crate::model::suggestion::Suggestion;
use crate::model::tag::{Tag, TagSet};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of content characters submitted per note.
pub const DEFAULT_CONTENT_LIMIT: usize = 4000;

/// Error returned by a classifier call.
#[derive(Debug)]
pub enum ClassifyError {
    /// The response was empty or whitespace only.
    EmptyResponse,
    /// No object-shaped structured data could be found in the response.
    NoStructuredData,
    /// The structured data had the wrong shape.
    InvalidShape(String),
    /// The classifier could not be reached or failed to run.
    Unavailable(String),
}

impl Display for ClassifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyResponse => write!(f, "classifier returned an empty response"),
            Self::NoStructuredData => {
                write!(f, "classifier response contains no structured object")
            }
            Self::InvalidShape(message) => {
                write!(f, "classifier response has an invalid shape: {message}")
            }
            Self::Unavailable(message) => write!(f, "classifier unavailable: {message}"),
        }
    }
}

impl Error for ClassifyError {}

/// Input for one classification call.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyRequest<'a> {
    /// Bounded prefix of the note content.
    pub content: &'a str,
    pub current_tags: &'a TagSet,
    /// Ranked corpus vocabulary, most frequent first.
    pub vocabulary: &'a [Tag],
}

impl<'a> ClassifyRequest<'a> {
    /// Builds a request, cutting `content` to at most `content_limit` chars.
    pub fn new(
        content: &'a str,
        current_tags: &'a TagSet,
        vocabulary: &'a [Tag],
        content_limit: usize,
    ) -> Self {
        Self {
            content: truncate_chars(content, content_limit),
            current_tags,
            vocabulary,
        }
    }
}

/// Tag suggestion capability, e.g. a generative model behind a prompt.
///
/// Implementations are called from several worker threads at once.
pub trait Classifier: Send + Sync {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Suggestion, ClassifyError>;
}

/// Returns the longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
