//! Header writer: replaces the `tags` field of a note header.
//!
//! # Responsibility
//! - Rewrite only the top-level `tags` entry with the bare tag list.
//! - Leave every other header line and the whole body byte-identical.
//!
//! # Invariants
//! - The rewritten header is re-parsed and checked before anything is written.
//! - An unparsable header aborts the write; the file stays untouched.
//! - Files are replaced atomically (temp file + rename).

use crate::atomic_file::write_atomically;
use crate::model::tag::TagSet;
use crate::note::frontmatter::{
    header_tags, parse_header, split, HeaderBlock, HEADER_DELIMITER, TAGS_KEY,
};
use crate::note::{NoteError, NoteResult};
use log::debug;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

const BOM: char = '\u{feff}';

/// Why a header rewrite was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    MalformedHeader(String),
    Render(String),
}

/// Re-reads `path`, replaces its header tags with `final_tags`, and writes it back.
pub fn apply(path: &Path, final_tags: &TagSet) -> NoteResult<()> {
    let content = fs::read_to_string(path).map_err(|source| NoteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let updated = rewrite_tags(&content, final_tags).map_err(|err| match err {
        RewriteError::MalformedHeader(message) => NoteError::MalformedHeader {
            path: path.to_path_buf(),
            message,
        },
        RewriteError::Render(message) => NoteError::Render {
            path: path.to_path_buf(),
            message,
        },
    })?;

    if updated == content {
        debug!(
            "event=header_write module=writer status=unchanged path={}",
            path.display()
        );
        return Ok(());
    }

    write_atomically(path, updated.as_bytes()).map_err(|source| NoteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "event=header_write module=writer status=ok path={} tags={}",
        path.display(),
        final_tags.len()
    );
    Ok(())
}

/// Returns `content` with its header `tags` entry replaced by `final_tags`.
///
/// A note without a header gets a new header block holding only `tags`.
pub fn rewrite_tags(content: &str, final_tags: &TagSet) -> Result<String, RewriteError> {
    let parts = split(content);
    let Some(block) = parts.header else {
        return prepend_header(content, final_tags);
    };

    let yaml = block.yaml(content);
    let original =
        parse_header(yaml).map_err(|err| RewriteError::MalformedHeader(err.to_string()))?;
    let entry = render_tags_entry(final_tags, block.line_ending)?;
    let new_yaml = replace_tags_entry(yaml, &entry, block.line_ending);
    verify(&original, &new_yaml, final_tags)?;

    Ok(splice(content, &block, &new_yaml))
}

fn prepend_header(content: &str, final_tags: &TagSet) -> Result<String, RewriteError> {
    let (bom, rest) = match content.strip_prefix(BOM) {
        Some(rest) => (BOM.to_string(), rest),
        None => (String::new(), content),
    };
    let line_ending = if rest.contains("\r\n") { "\r\n" } else { "\n" };
    let entry = render_tags_entry(final_tags, line_ending)?;
    verify(&Mapping::new(), &entry, final_tags)?;
    Ok(format!(
        "{bom}{HEADER_DELIMITER}{line_ending}{entry}{HEADER_DELIMITER}{line_ending}{rest}"
    ))
}

fn splice(content: &str, block: &HeaderBlock, new_yaml: &str) -> String {
    let mut out = String::with_capacity(content.len() + new_yaml.len());
    out.push_str(&content[..block.yaml_start]);
    out.push_str(new_yaml);
    out.push_str(&content[block.yaml_end..]);
    out
}

fn render_tags_entry(final_tags: &TagSet, line_ending: &str) -> Result<String, RewriteError> {
    let mut entry = Mapping::new();
    entry.insert(
        Value::String(TAGS_KEY.to_string()),
        Value::Sequence(
            final_tags
                .iter()
                .map(|tag| Value::String(tag.as_str().to_string()))
                .collect(),
        ),
    );
    let rendered =
        serde_yaml::to_string(&entry).map_err(|err| RewriteError::Render(err.to_string()))?;
    if line_ending == "\n" {
        Ok(rendered)
    } else {
        Ok(rendered.replace('\n', line_ending))
    }
}

/// Swaps the top-level `tags` entry (key line plus continuation lines) for
/// `entry`, or appends `entry` when the key is absent.
fn replace_tags_entry(yaml: &str, entry: &str, line_ending: &str) -> String {
    let lines: Vec<&str> = yaml.split_inclusive('\n').collect();
    let Some(start) = lines.iter().position(|line| is_tags_key_line(line)) else {
        let mut out = yaml.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(line_ending);
        }
        out.push_str(entry);
        return out;
    };

    let mut end = start + 1;
    while end < lines.len() && (is_continuation(lines[end]) || lines[end].trim().is_empty()) {
        end += 1;
    }
    // Trailing blank lines belong to whatever follows.
    while end > start + 1 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }

    let mut out = String::with_capacity(yaml.len() + entry.len());
    for line in &lines[..start] {
        out.push_str(line);
    }
    out.push_str(entry);
    for line in &lines[end..] {
        out.push_str(line);
    }
    out
}

fn is_tags_key_line(line: &str) -> bool {
    let rest = ["\"tags\"", "'tags'", TAGS_KEY]
        .iter()
        .find_map(|key| line.strip_prefix(key));
    let Some(rest) = rest else {
        return false;
    };
    match rest.trim_start_matches([' ', '\t']).strip_prefix(':') {
        Some(after) => after.is_empty() || after.starts_with(char::is_whitespace),
        None => false,
    }
}

fn is_continuation(line: &str) -> bool {
    if line.starts_with([' ', '\t']) {
        return true;
    }
    match line.strip_prefix('-') {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

fn verify(original: &Mapping, new_yaml: &str, final_tags: &TagSet) -> Result<(), RewriteError> {
    let mut updated = parse_header(new_yaml).map_err(|err| {
        RewriteError::Render(format!("rewritten header does not parse: {err}"))
    })?;

    let written: TagSet = header_tags(&updated).into_iter().collect();
    if &written != final_tags {
        return Err(RewriteError::Render(
            "rewritten header tags do not match requested tags".to_string(),
        ));
    }

    let mut before = original.clone();
    before.remove(TAGS_KEY);
    updated.remove(TAGS_KEY);
    if before != updated {
        return Err(RewriteError::Render(
            "rewriting tags would change other header fields".to_string(),
        ));
    }
    Ok(())
}
