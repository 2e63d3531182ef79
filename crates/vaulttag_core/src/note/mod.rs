//! Note file reading, tag extraction and header rewriting.
//!
//! # Responsibility
//! - Split a note into its structured header block and free-form body.
//! - Extract header and inline tag surfaces.
//! - Rewrite the header `tags` field without touching anything else.
//!
//! # Invariants
//! - Body bytes are never modified by any operation in this module.
//! - A failed write leaves the original file untouched.

pub mod extract;
pub mod frontmatter;
pub mod writer;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub type NoteResult<T> = Result<T, NoteError>;

/// Error for note read and write operations.
#[derive(Debug)]
pub enum NoteError {
    /// File could not be read or is not valid UTF-8.
    Read { path: PathBuf, source: io::Error },
    /// Header block exists but is not a valid key-value document.
    MalformedHeader { path: PathBuf, message: String },
    /// Rendering the new header failed or did not read back as expected.
    Render { path: PathBuf, message: String },
    /// Writing or replacing the file failed.
    Write { path: PathBuf, source: io::Error },
}

impl Display for NoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read note `{}`: {source}", path.display())
            }
            Self::MalformedHeader { path, message } => {
                write!(f, "malformed header in `{}`: {message}", path.display())
            }
            Self::Render { path, message } => {
                write!(f, "failed to render header for `{}`: {message}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "failed to write note `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for NoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::MalformedHeader { .. } | Self::Render { .. } => None,
        }
    }
}
