//! Tag extraction from note content.
//!
//! # Responsibility
//! - Read header tags from the structured header block.
//! - Match inline `#tag` tokens in body text (header excluded).
//!
//! # Invariants
//! - Extraction is pure: the same content always yields the same result.
//! - A malformed header yields zero header tags; inline matching still runs.

use crate::model::note::{HeaderTags, InlineTags, NoteTags};
use crate::model::tag::Tag;
use crate::note::frontmatter::{header_tags, parse_header, split};
use crate::note::{NoteError, NoteResult};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// The trailing boundary is checked by hand in `extract_inline`.
static INLINE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#([A-Za-z0-9_/-]+)").expect("valid inline tag regex"));

/// Extracts both tag surfaces from raw note content.
pub fn extract(content: &str) -> NoteTags {
    let parts = split(content);
    let (header, header_error) = match parts.header {
        Some(block) => match parse_header(block.yaml(content)) {
            Ok(mapping) => (HeaderTags::from_ordered(header_tags(&mapping)), None),
            Err(err) => (HeaderTags::default(), Some(err.to_string())),
        },
        None => (HeaderTags::default(), None),
    };

    NoteTags {
        header,
        inline: extract_inline(parts.body),
        header_error,
    }
}

/// Matches inline tags in body text.
///
/// A marker counts only when preceded by start-of-text or whitespace and
/// followed by whitespace, `.`, `,`, `!`, `?`, `)` or end-of-text, so
/// headings such as `# Title` and mid-word `a#b` are skipped.
pub fn extract_inline(body: &str) -> InlineTags {
    let tags = INLINE_TAG_RE.captures_iter(body).filter_map(|caps| {
        let name = caps.get(1)?;
        let next = body[name.end()..].chars().next();
        if next.map_or(true, is_tag_terminator) {
            Tag::parse(name.as_str())
        } else {
            None
        }
    });
    InlineTags::from_ordered(tags)
}

fn is_tag_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | ')')
}

/// Reads one note file and extracts its tags.
///
/// Header parse failures are logged and degrade to zero header tags.
pub fn read_note_tags(path: &Path) -> NoteResult<(String, NoteTags)> {
    let content = std::fs::read_to_string(path).map_err(|source| NoteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tags = extract(&content);
    if let Some(reason) = tags.header_error.as_deref() {
        warn!(
            "event=header_malformed module=extract status=degraded path={} reason={}",
            path.display(),
            reason.replace('\n', " ")
        );
    }
    Ok((content, tags))
}

#[cfg(test)]
mod tests {
    use super::{extract, extract_inline};
    use crate::model::tag::tag_set;

    fn inline_names(body: &str) -> Vec<String> {
        extract_inline(body)
            .as_slice()
            .iter()
            .map(|tag| tag.as_str().to_string())
            .collect()
    }

    #[test]
    fn inline_matches_marked_tokens_with_boundaries() {
        assert_eq!(
            inline_names("#start then #mid, and (#paren) #end"),
            vec!["start", "mid", "end"]
        );
        assert_eq!(inline_names("line\n#next-line/sub_tag!"), vec!["next-line/sub_tag"]);
    }

    #[test]
    fn inline_skips_headings_mid_word_and_bad_terminators() {
        assert!(inline_names("# Title\n## Sub").is_empty());
        assert!(inline_names("email a#b and x#y").is_empty());
        assert!(inline_names("#tag; #other:").is_empty());
        assert!(inline_names("(#paren").is_empty());
    }

    #[test]
    fn inline_stops_at_unicode_letters() {
        assert!(inline_names("#café").is_empty());
    }

    #[test]
    fn header_block_is_excluded_from_inline_scan() {
        let tags = extract("---\ntitle: '#notinline'\n---\nbody #real\n");
        assert_eq!(tags.inline.to_set(), tag_set(["real"]));
        assert!(tags.header.is_empty());
    }

    #[test]
    fn malformed_header_keeps_inline_tags() {
        let tags = extract("---\ntags: [broken\n---\nbody #still-here\n");
        assert!(tags.is_header_malformed());
        assert!(tags.header.is_empty());
        assert_eq!(tags.effective(), tag_set(["still-here"]));
    }

    #[test]
    fn combines_header_and_inline_sources() {
        let content = "---\ntags: [foo, bar]\n---\nSome prose about #baz.\n";
        let tags = extract(content);
        assert_eq!(tags.effective(), tag_set(["foo", "bar", "baz"]));
        assert_eq!(extract(content), tags);
    }
}
