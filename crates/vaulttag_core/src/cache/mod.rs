//! Change tracking across process invocations.
//!
//! # Responsibility
//! - Skip notes that have not changed since they were last handled.
//!
//! # Invariants
//! - The cache is advisory; force mode bypasses it entirely.
//! - Deleting the store is always safe and forces a full rescan.

pub mod change_cache;
