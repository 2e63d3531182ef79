//! Domain model for tags, note tag surfaces and suggestions.
//!
//! # Invariants
//! - A tag is stored in canonical bare form; `#` is presentation only.
//! - Header tags and inline tags stay separate until merged for reading.

pub mod note;
pub mod suggestion;
pub mod tag;
