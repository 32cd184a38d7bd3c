//! Form extension points and their use-case service.
//!
//! # Responsibility
//! - Declare the `can-add-encounter-to-visit` and `form-entry-handler`
//!   capabilities with their typed provider interfaces.
//! - Answer the two questions the web layer asks about them.
//!
//! # Invariants
//! - The service never caches provider output.
//! - A fresh `FormEntryContext` is built for every entry query.

use crate::config::AggregationConfig;
use crate::extension::aggregator::{AggregationError, ExtensionAggregator, ProviderAssignments};
use crate::extension::point::ExtensionPoint;
use crate::extension::provider::ProviderResult;
use crate::extension::registry::ProviderLookup;
use crate::model::form::{Form, FormEntryContext, Person};

/// Capability id for modules able to add encounters to a visit.
pub const CAPABILITY_ADD_ENCOUNTER_TO_VISIT: &str = "can-add-encounter-to-visit";
/// Capability id for modules handling form entry.
pub const CAPABILITY_FORM_ENTRY_HANDLER: &str = "form-entry-handler";

/// Provider interface for `can-add-encounter-to-visit`.
pub trait AddEncounterToVisitExtension: Send + Sync {
    /// Forms this module can attach to an existing visit.
    fn forms_module_can_add_encounter_to_visit(&self) -> ProviderResult<Option<Vec<Form>>>;
}

/// Provider interface for `form-entry-handler`.
pub trait FormEntryHandler: Send + Sync {
    /// Forms this module can enter for the context's person.
    fn forms_module_can_enter(
        &self,
        context: &FormEntryContext,
    ) -> ProviderResult<Option<Vec<Form>>>;
}

pub struct AddEncounterToVisit;

impl ExtensionPoint for AddEncounterToVisit {
    const ID: &'static str = CAPABILITY_ADD_ENCOUNTER_TO_VISIT;
    type Provider = dyn AddEncounterToVisitExtension;
    type Context = ();
    type Item = Form;

    fn invoke(
        provider: &Self::Provider,
        _context: &Self::Context,
    ) -> ProviderResult<Option<Vec<Form>>> {
        provider.forms_module_can_add_encounter_to_visit()
    }
}

pub struct FormEntry;

impl ExtensionPoint for FormEntry {
    const ID: &'static str = CAPABILITY_FORM_ENTRY_HANDLER;
    type Provider = dyn FormEntryHandler;
    type Context = FormEntryContext;
    type Item = Form;

    fn invoke(
        provider: &Self::Provider,
        context: &Self::Context,
    ) -> ProviderResult<Option<Vec<Form>>> {
        provider.forms_module_can_enter(context)
    }
}

/// Form-centric queries over registered extensions.
pub struct FormExtensionService<'r, R: ProviderLookup> {
    aggregator: ExtensionAggregator<'r, R>,
}

impl<'r, R: ProviderLookup> FormExtensionService<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self {
            aggregator: ExtensionAggregator::new(registry),
        }
    }

    pub fn with_config(registry: &'r R, config: AggregationConfig) -> Self {
        Self {
            aggregator: ExtensionAggregator::with_config(registry, config),
        }
    }

    /// Returns every form some module can add to a visit, sorted by name.
    pub fn forms_modules_can_add_encounter_to_visit(&self) -> ProviderResult<Vec<Form>> {
        self.aggregator
            .collect_sorted::<AddEncounterToVisit, _>(&(), Form::name_key)
    }

    /// Matches forms with the handler that enters them for `person`.
    ///
    /// When two handlers claim one form the later-registered handler wins.
    pub fn forms_module_can_enter(
        &self,
        person: &Person,
    ) -> ProviderResult<ProviderAssignments<FormEntry>> {
        let context = FormEntryContext::new(person.clone());
        self.aggregator.collect_keyed::<FormEntry>(&context)
    }

    /// Like [`Self::forms_module_can_enter`], applying the configured
    /// conflict policy.
    pub fn forms_module_can_enter_checked(
        &self,
        person: &Person,
    ) -> Result<ProviderAssignments<FormEntry>, AggregationError> {
        let context = FormEntryContext::new(person.clone());
        self.aggregator.collect_keyed_checked::<FormEntry>(&context)
    }
}
