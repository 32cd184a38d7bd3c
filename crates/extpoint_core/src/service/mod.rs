//! Use-case services built on extension aggregation.
//!
//! # Responsibility
//! - Expose host-facing queries for concrete extension points.
//! - Keep the web layer decoupled from registry details.

pub mod form_extension_service;
