//! Capability-based extension registry with ordered aggregation.
//! Hosts register typed providers per capability and query them through
//! stateless aggregations.

pub mod config;
pub mod extension;
pub mod logging;
pub mod model;
pub mod service;

pub use config::{AggregationConfig, ConfigError, KeyConflictPolicy, LoggingConfig, NameTieBreak};
pub use extension::aggregator::{
    AggregationError, ExtensionAggregator, KeyConflict, KeyedCollection, ProviderAssignments,
};
pub use extension::point::{is_valid_capability_id, ExtensionPoint};
pub use extension::provider::{ProviderError, ProviderResult};
pub use extension::registry::{
    ExtensionRegistry, ProviderLookup, RegisteredProvider, RegistryError,
};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::form::{EntityId, Form, FormEntryContext, Person};
pub use service::form_extension_service::{
    AddEncounterToVisit, AddEncounterToVisitExtension, FormEntry, FormEntryHandler,
    FormExtensionService, CAPABILITY_ADD_ENCOUNTER_TO_VISIT, CAPABILITY_FORM_ENTRY_HANDLER,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
