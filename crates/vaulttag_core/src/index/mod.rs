//! Tag vocabulary indexing over a note directory tree.

pub mod tag_index;
