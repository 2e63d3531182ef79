//! Structured header block handling.
//!
//! A header block starts at the first line of the file (after an optional
//! BOM) with a `---` line and ends at the next `---` or `...` line. The
//! enclosed text is parsed as YAML and must be a mapping.

use crate::model::tag::Tag;
use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const HEADER_DELIMITER: &str = "---";
const HEADER_END_ALT: &str = "...";
const BOM: char = '\u{feff}';
/// Header key holding the tag list.
pub const TAGS_KEY: &str = "tags";

/// Byte layout of a header block inside note content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlock {
    /// Start of the YAML text (just after the opening delimiter line).
    pub yaml_start: usize,
    /// End of the YAML text (start of the closing delimiter line).
    pub yaml_end: usize,
    /// Start of the body (just after the closing delimiter line).
    pub body_start: usize,
    /// Line ending used by the opening delimiter.
    pub line_ending: &'static str,
}

impl HeaderBlock {
    pub fn yaml<'a>(&self, content: &'a str) -> &'a str {
        &content[self.yaml_start..self.yaml_end]
    }
}

/// Note content split into optional header and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitNote<'a> {
    pub header: Option<HeaderBlock>,
    pub body: &'a str,
}

/// Header YAML could not be read as a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParseError(pub String);

impl Display for HeaderParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for HeaderParseError {}

/// Locates the header block. Content without a closed block is all body.
pub fn split(content: &str) -> SplitNote<'_> {
    match locate_header(content) {
        Some(header) => SplitNote {
            header: Some(header),
            body: &content[header.body_start..],
        },
        None => SplitNote {
            header: None,
            body: content,
        },
    }
}

fn locate_header(content: &str) -> Option<HeaderBlock> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if !first.ends_with('\n') {
        return None;
    }
    let opening = first.strip_prefix(BOM).unwrap_or(first).trim_end();
    if opening != HEADER_DELIMITER {
        return None;
    }
    let line_ending = if first.ends_with("\r\n") { "\r\n" } else { "\n" };

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == HEADER_DELIMITER || trimmed == HEADER_END_ALT {
            return Some(HeaderBlock {
                yaml_start,
                yaml_end: offset,
                body_start: offset + line.len(),
                line_ending,
            });
        }
        offset += line.len();
    }
    None
}

/// Parses header YAML. An empty block is an empty mapping.
pub fn parse_header(yaml: &str) -> Result<Mapping, HeaderParseError> {
    let value: Value =
        serde_yaml::from_str(yaml).map_err(|err| HeaderParseError(err.to_string()))?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(HeaderParseError(format!(
            "header must be a key-value mapping, found {}",
            value_kind(&other)
        ))),
    }
}

/// Reads the `tags` field in declaration order.
///
/// Accepts a list, a comma/space-delimited string, or absence.
pub fn header_tags(mapping: &Mapping) -> Vec<Tag> {
    match mapping.get(TAGS_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) => text
            .replace(',', " ")
            .split_whitespace()
            .filter_map(Tag::parse)
            .collect(),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter_map(|text| Tag::parse(&text))
            .collect(),
        Some(other) => scalar_text(other)
            .and_then(|text| Tag::parse(&text))
            .into_iter()
            .collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
