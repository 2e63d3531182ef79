//! Tagging use-cases.
//!
//! # Responsibility
//! - Reconcile raw classifier output into canonical tag sets.
//! - Orchestrate scan, suggest and apply over a vault.

pub mod reconcile;
pub mod tagging_service;
