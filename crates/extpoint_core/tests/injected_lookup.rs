//! Aggregation against a host-provided `ProviderLookup` instead of the
//! bundled registry.

use extpoint_core::{
    AggregationConfig, AggregationError, ExtensionPoint, ExtensionRegistry, Form, FormEntry,
    FormEntryContext, FormEntryHandler, FormExtensionService, KeyConflictPolicy, Person,
    ProviderLookup, ProviderResult, RegisteredProvider, CAPABILITY_FORM_ENTRY_HANDLER,
};
use std::any::Any;
use std::cell::Cell;
use std::sync::Arc;

struct NamedHandler(Vec<Form>);

impl FormEntryHandler for NamedHandler {
    fn forms_module_can_enter(
        &self,
        _context: &FormEntryContext,
    ) -> ProviderResult<Option<Vec<Form>>> {
        Ok(Some(self.0.clone()))
    }
}

/// Host lookup that only knows form-entry handlers and counts queries.
struct CountingLookup {
    handlers: Vec<RegisteredProvider<dyn FormEntryHandler>>,
    lookups: Cell<usize>,
}

impl ProviderLookup for CountingLookup {
    fn lookup<E: ExtensionPoint>(&self) -> Vec<RegisteredProvider<E::Provider>> {
        self.lookups.set(self.lookups.get() + 1);
        if E::ID != CAPABILITY_FORM_ENTRY_HANDLER {
            return vec![];
        }
        let handlers: &dyn Any = &self.handlers;
        handlers
            .downcast_ref::<Vec<RegisteredProvider<E::Provider>>>()
            .cloned()
            .unwrap_or_default()
    }
}

fn handler_entry(extension_id: &str, form: &Form) -> RegisteredProvider<dyn FormEntryHandler> {
    let handler: Arc<dyn FormEntryHandler> = Arc::new(NamedHandler(vec![form.clone()]));
    RegisteredProvider::new(extension_id, handler)
}

#[test]
fn service_queries_the_injected_lookup() {
    let shared = Form::new("Triage");
    let lookup = CountingLookup {
        handlers: vec![handler_entry("a", &shared), handler_entry("b", &shared)],
        lookups: Cell::new(0),
    };

    let service = FormExtensionService::new(&lookup);
    let assignments = service
        .forms_module_can_enter(&Person::new("Jane Roe"))
        .expect("keyed aggregation");
    assert_eq!(assignments[&shared].extension_id(), "b");

    let visit_forms = service
        .forms_modules_can_add_encounter_to_visit()
        .expect("sorted aggregation");
    assert!(visit_forms.is_empty());
    assert_eq!(lookup.lookups.get(), 2);
}

#[test]
fn reject_policy_surfaces_conflicting_handlers() {
    let shared = Form::new("Triage");
    let mut registry = ExtensionRegistry::new();
    registry
        .register::<FormEntry>("a", Arc::new(NamedHandler(vec![shared.clone()])))
        .expect("a should register");
    registry
        .register::<FormEntry>("b", Arc::new(NamedHandler(vec![shared])))
        .expect("b should register");

    let config = AggregationConfig::from_json_str(r#"{"key_conflict_policy":"reject"}"#)
        .expect("config should parse");
    assert_eq!(config.key_conflict_policy, KeyConflictPolicy::Reject);

    let err = FormExtensionService::with_config(&registry, config)
        .forms_module_can_enter_checked(&Person::new("Jane Roe"))
        .expect_err("conflict should be rejected");
    assert!(matches!(
        err,
        AggregationError::ConflictingClaim { ref first, ref second, .. }
            if first == "a" && second == "b"
    ));
}
