//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire a registry with sample form providers and print both aggregations.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `extpoint_cli [aggregation-config.json]`

use extpoint_core::{
    init_logging, AddEncounterToVisit, AddEncounterToVisitExtension, AggregationConfig,
    ExtensionRegistry, Form, FormEntry, FormEntryContext, FormEntryHandler, FormExtensionService,
    LoggingConfig, Person, ProviderResult,
};
use log::info;
use std::process::ExitCode;
use std::sync::Arc;

struct SampleModule {
    forms: Vec<Form>,
}

impl AddEncounterToVisitExtension for SampleModule {
    fn forms_module_can_add_encounter_to_visit(&self) -> ProviderResult<Option<Vec<Form>>> {
        Ok(Some(self.forms.clone()))
    }
}

impl FormEntryHandler for SampleModule {
    fn forms_module_can_enter(
        &self,
        _context: &FormEntryContext,
    ) -> ProviderResult<Option<Vec<Form>>> {
        Ok(Some(self.forms.clone()))
    }
}

fn main() -> ExitCode {
    if let Err(err) = init_logging(&LoggingConfig::from_env()) {
        eprintln!("logging disabled: {err}");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|err| format!("cannot read `{path}`: {err}"))?;
            AggregationConfig::from_json_str(&raw).map_err(|err| err.to_string())?
        }
        None => AggregationConfig::default(),
    };

    let registry = sample_registry().map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok version={} capabilities={}",
        extpoint_core::core_version(),
        registry.capability_ids().join(",")
    );

    let service = FormExtensionService::with_config(&registry, config);
    println!("extpoint_core version={}", extpoint_core::core_version());

    let visit_forms = service
        .forms_modules_can_add_encounter_to_visit()
        .map_err(|err| err.to_string())?;
    for form in &visit_forms {
        println!("can-add-encounter-to-visit form={}", form.name);
    }

    let assignments = service
        .forms_module_can_enter_checked(&Person::new("Sample Patient"))
        .map_err(|err| err.to_string())?;
    let mut entries: Vec<(&str, &str)> = assignments
        .iter()
        .map(|(form, entry)| (form.name.as_str(), entry.extension_id()))
        .collect();
    entries.sort_unstable();
    for (form, extension_id) in entries {
        println!("form-entry-handler form={form} handler={extension_id}");
    }
    Ok(())
}

fn sample_registry() -> Result<ExtensionRegistry, extpoint_core::RegistryError> {
    let triage = Form::new("Triage");
    let intake = Arc::new(SampleModule {
        forms: vec![triage.clone()],
    });
    let ward = Arc::new(SampleModule {
        forms: vec![Form::new("Discharge"), triage],
    });

    let mut registry = ExtensionRegistry::new();
    registry.register::<FormEntry>("intake", intake.clone())?;
    registry.register::<FormEntry>("ward", ward.clone())?;
    registry.register::<AddEncounterToVisit>("intake", intake)?;
    registry.register::<AddEncounterToVisit>("ward", ward)?;
    Ok(registry)
}
