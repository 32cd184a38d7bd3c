//! Domain values exchanged with extension providers.
//!
//! # Responsibility
//! - Define the minimal entities form extension points operate on.
//!
//! # Invariants
//! - Entities are identified by a stable `EntityId`.

pub mod form;
