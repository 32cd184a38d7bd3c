//! Extension registry and aggregation.
//!
//! Capabilities are declared as `ExtensionPoint` types; providers register
//! under them in an explicit `ExtensionRegistry`, and `ExtensionAggregator`
//! merges their results. Discovery and lifecycle of the modules that own the
//! providers belong to the host.

pub mod aggregator;
pub mod point;
pub mod provider;
pub mod registry;
