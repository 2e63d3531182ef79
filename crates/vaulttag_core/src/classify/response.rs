//! Best-effort structured-data extraction from classifier text.
//!
//! Classifier output is treated as near-JSON: the first `{` from which a
//! complete JSON object can be read wins, so prose or code fences around
//! the object are ignored.

use crate::classify::ClassifyError;
use crate::model::suggestion::Suggestion;
use crate::model::tag::Tag;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
struct RawSuggestion {
    #[serde(default, alias = "topics")]
    topic_tags: Option<RawTagList>,
    #[serde(default, alias = "maturity")]
    maturity_tag: Option<String>,
    #[serde(default, alias = "maintenance")]
    maintenance_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTagList {
    Items(Vec<Value>),
    Delimited(String),
}

/// Parses a raw classifier response into a [`Suggestion`].
///
/// # Errors
/// - `EmptyResponse` for blank text.
/// - `NoStructuredData` when no JSON object is embedded in the text.
/// - `InvalidShape` when the object fields have unusable types.
pub fn parse_suggestion_response(text: &str) -> Result<Suggestion, ClassifyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    let object = first_object(text).ok_or(ClassifyError::NoStructuredData)?;
    let raw: RawSuggestion = serde_json::from_value(Value::Object(object))
        .map_err(|err| ClassifyError::InvalidShape(err.to_string()))?;

    let topics = match raw.topic_tags {
        Some(RawTagList::Items(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(Tag::parse)
            .collect(),
        Some(RawTagList::Delimited(text)) => text
            .replace(',', " ")
            .split_whitespace()
            .filter_map(Tag::parse)
            .collect(),
        None => Vec::new(),
    };

    Ok(Suggestion {
        topics,
        maturity: optional_tag(raw.maturity_tag.as_deref()),
        maintenance: optional_tag(raw.maintenance_tag.as_deref()),
    })
}

/// Returns the first JSON object embedded in `text`.
pub fn first_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

fn optional_tag(value: Option<&str>) -> Option<Tag> {
    let value = value?.trim();
    if value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none") {
        return None;
    }
    Tag::parse(value)
}
