//! In-process extension registry keyed by capability.
//!
//! # Responsibility
//! - Hold registered providers per capability, already typed as the
//!   capability's provider interface.
//! - Serve lookups in stable registration order.
//!
//! # Invariants
//! - One capability id is bound to exactly one `ExtensionPoint` type.
//! - One extension id appears at most once per capability.
//! - Lookups never fail; unknown capabilities resolve to no providers.

use crate::extension::point::{is_dotted_identifier, is_valid_capability_id, ExtensionPoint};
use log::{debug, info, warn};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// One provider handle plus the extension that registered it.
pub struct RegisteredProvider<P: ?Sized> {
    extension_id: String,
    provider: Arc<P>,
}

impl<P: ?Sized> RegisteredProvider<P> {
    pub fn new(extension_id: impl Into<String>, provider: Arc<P>) -> Self {
        Self {
            extension_id: extension_id.into(),
            provider,
        }
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns a shared handle to the provider.
    pub fn handle(&self) -> Arc<P> {
        Arc::clone(&self.provider)
    }
}

impl<P: ?Sized> Clone for RegisteredProvider<P> {
    fn clone(&self) -> Self {
        Self {
            extension_id: self.extension_id.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: ?Sized> Debug for RegisteredProvider<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("extension_id", &self.extension_id)
            .finish_non_exhaustive()
    }
}

/// Registry query seam consumed by the aggregator.
///
/// Hosts may back this with their own module system; tests use
/// [`ExtensionRegistry`] filled with fakes.
pub trait ProviderLookup {
    /// Returns providers registered for `E::ID` in registration order.
    fn lookup<E: ExtensionPoint>(&self) -> Vec<RegisteredProvider<E::Provider>>;
}

trait ProviderSlot: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn point_name(&self) -> &'static str;
    fn extension_ids(&self) -> Vec<&str>;
    fn remove_extension(&mut self, extension_id: &str) -> usize;
    fn len(&self) -> usize;
}

struct TypedSlot<E: ExtensionPoint> {
    providers: Vec<RegisteredProvider<E::Provider>>,
    _point: PhantomData<fn() -> E>,
}

impl<E: ExtensionPoint> TypedSlot<E> {
    fn new() -> Self {
        Self {
            providers: Vec::new(),
            _point: PhantomData,
        }
    }
}

impl<E: ExtensionPoint> ProviderSlot for TypedSlot<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn point_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn extension_ids(&self) -> Vec<&str> {
        self.providers
            .iter()
            .map(RegisteredProvider::extension_id)
            .collect()
    }

    fn remove_extension(&mut self, extension_id: &str) -> usize {
        let before = self.providers.len();
        self.providers
            .retain(|entry| entry.extension_id() != extension_id);
        before - self.providers.len()
    }

    fn len(&self) -> usize {
        self.providers.len()
    }
}

/// Registry of providers grouped by capability id.
#[derive(Default)]
pub struct ExtensionRegistry {
    slots: BTreeMap<&'static str, Box<dyn ProviderSlot>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one provider for extension point `E`.
    ///
    /// The provider is appended after every provider already registered for
    /// the same capability.
    pub fn register<E: ExtensionPoint>(
        &mut self,
        extension_id: &str,
        provider: Arc<E::Provider>,
    ) -> Result<(), RegistryError> {
        let extension_id = extension_id.trim();
        if !is_dotted_identifier(extension_id) {
            return Err(RegistryError::InvalidExtensionId(extension_id.to_string()));
        }
        if !is_valid_capability_id(E::ID) {
            return Err(RegistryError::InvalidCapabilityId(E::ID.to_string()));
        }

        let slot = self
            .slots
            .entry(E::ID)
            .or_insert_with(|| Box::new(TypedSlot::<E>::new()));
        let existing_point = slot.point_name();
        let Some(typed) = slot.as_any_mut().downcast_mut::<TypedSlot<E>>() else {
            return Err(RegistryError::CapabilityTypeMismatch {
                capability: E::ID.to_string(),
                registered: existing_point.to_string(),
                requested: type_name::<E>().to_string(),
            });
        };
        if typed
            .providers
            .iter()
            .any(|entry| entry.extension_id() == extension_id)
        {
            return Err(RegistryError::DuplicateRegistration {
                capability: E::ID.to_string(),
                extension_id: extension_id.to_string(),
            });
        }

        typed
            .providers
            .push(RegisteredProvider::new(extension_id, provider));
        info!(
            "event=provider_registered module=registry status=ok capability={} extension_id={} position={}",
            E::ID,
            extension_id,
            typed.providers.len()
        );
        Ok(())
    }

    /// Removes every provider owned by `extension_id`.
    ///
    /// Returns how many registrations were dropped. Capabilities left without
    /// providers are removed from the registry.
    pub fn unregister(&mut self, extension_id: &str) -> usize {
        let extension_id = extension_id.trim();
        let removed: usize = self
            .slots
            .values_mut()
            .map(|slot| slot.remove_extension(extension_id))
            .sum();
        self.slots.retain(|_, slot| slot.len() > 0);
        debug!(
            "event=provider_unregistered module=registry status=ok extension_id={} removed={}",
            extension_id, removed
        );
        removed
    }

    /// Total number of registrations across all capabilities.
    pub fn len(&self) -> usize {
        self.slots.values().map(|slot| slot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns capability ids with at least one provider, sorted.
    pub fn capability_ids(&self) -> Vec<&'static str> {
        self.slots.keys().copied().collect()
    }

    pub fn provider_count(&self, capability_id: &str) -> usize {
        self.slots.get(capability_id).map_or(0, |slot| slot.len())
    }

    /// Returns extension ids registered for one capability, in registration
    /// order. Works without knowing the capability's provider type.
    pub fn extension_ids(&self, capability_id: &str) -> Vec<String> {
        self.slots
            .get(capability_id)
            .map(|slot| {
                slot.extension_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ProviderLookup for ExtensionRegistry {
    fn lookup<E: ExtensionPoint>(&self) -> Vec<RegisteredProvider<E::Provider>> {
        let Some(slot) = self.slots.get(E::ID) else {
            return vec![];
        };
        match slot.as_any().downcast_ref::<TypedSlot<E>>() {
            Some(typed) => typed.providers.clone(),
            None => {
                warn!(
                    "event=lookup_type_mismatch module=registry status=skipped capability={} registered={} requested={}",
                    E::ID,
                    slot.point_name(),
                    type_name::<E>()
                );
                vec![]
            }
        }
    }
}

impl Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (capability, slot) in &self.slots {
            map.entry(capability, &slot.extension_ids());
        }
        map.finish()
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidExtensionId(String),
    InvalidCapabilityId(String),
    DuplicateRegistration {
        capability: String,
        extension_id: String,
    },
    CapabilityTypeMismatch {
        capability: String,
        registered: String,
        requested: String,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExtensionId(value) => write!(f, "extension id is invalid: {value}"),
            Self::InvalidCapabilityId(value) => write!(f, "capability id is invalid: {value}"),
            Self::DuplicateRegistration {
                capability,
                extension_id,
            } => write!(
                f,
                "extension `{extension_id}` already registered for capability `{capability}`"
            ),
            Self::CapabilityTypeMismatch {
                capability,
                registered,
                requested,
            } => write!(
                f,
                "capability `{capability}` is bound to `{registered}`, not `{requested}`"
            ),
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::{ExtensionRegistry, ProviderLookup, RegistryError};
    use crate::extension::point::ExtensionPoint;
    use crate::extension::provider::ProviderResult;
    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greetings(&self) -> Vec<String>;
    }

    struct FixedGreeter(&'static str);

    impl Greeter for FixedGreeter {
        fn greetings(&self) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    struct Greeting;

    impl ExtensionPoint for Greeting {
        const ID: &'static str = "greeting";
        type Provider = dyn Greeter;
        type Context = ();
        type Item = String;

        fn invoke(
            provider: &Self::Provider,
            _context: &Self::Context,
        ) -> ProviderResult<Option<Vec<String>>> {
            Ok(Some(provider.greetings()))
        }
    }

    struct ShadowGreeting;

    impl ExtensionPoint for ShadowGreeting {
        const ID: &'static str = "greeting";
        type Provider = dyn Greeter;
        type Context = ();
        type Item = String;

        fn invoke(
            _provider: &Self::Provider,
            _context: &Self::Context,
        ) -> ProviderResult<Option<Vec<String>>> {
            Ok(None)
        }
    }

    struct BadlyNamed;

    impl ExtensionPoint for BadlyNamed {
        const ID: &'static str = "Bad Name";
        type Provider = dyn Greeter;
        type Context = ();
        type Item = String;

        fn invoke(
            _provider: &Self::Provider,
            _context: &Self::Context,
        ) -> ProviderResult<Option<Vec<String>>> {
            Ok(None)
        }
    }

    fn greeter(text: &'static str) -> Arc<dyn Greeter> {
        Arc::new(FixedGreeter(text))
    }

    #[test]
    fn lookup_preserves_registration_order() {
        let mut registry = ExtensionRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry
                .register::<Greeting>(id, greeter("hi"))
                .expect("registration should succeed");
        }

        let ids: Vec<String> = registry
            .lookup::<Greeting>()
            .iter()
            .map(|entry| entry.extension_id().to_string())
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.extension_ids("greeting"), ids);
    }

    #[test]
    fn unknown_capability_resolves_to_no_providers() {
        let registry = ExtensionRegistry::new();
        assert!(registry.lookup::<Greeting>().is_empty());
        assert_eq!(registry.provider_count("greeting"), 0);
        assert!(registry.extension_ids("greeting").is_empty());
    }

    #[test]
    fn rejects_invalid_or_duplicate_extension_id() {
        let mut registry = ExtensionRegistry::new();
        let invalid = registry.register::<Greeting>("Greeter Module", greeter("hi"));
        assert!(matches!(invalid, Err(RegistryError::InvalidExtensionId(_))));

        registry
            .register::<Greeting>("  greeter  ", greeter("hi"))
            .expect("trimmed id should register");
        let duplicate = registry.register::<Greeting>("greeter", greeter("hello"));
        assert!(matches!(
            duplicate,
            Err(RegistryError::DuplicateRegistration { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_invalid_capability_id() {
        let mut registry = ExtensionRegistry::new();
        let err = registry
            .register::<BadlyNamed>("greeter", greeter("hi"))
            .expect_err("malformed capability id must fail");
        assert_eq!(err, RegistryError::InvalidCapabilityId("Bad Name".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_second_point_type_for_same_capability() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register::<Greeting>("greeter", greeter("hi"))
            .expect("first registration should succeed");

        let err = registry
            .register::<ShadowGreeting>("shadow", greeter("hi"))
            .expect_err("conflicting point type must fail");
        assert!(matches!(err, RegistryError::CapabilityTypeMismatch { .. }));
        assert!(registry.lookup::<ShadowGreeting>().is_empty());
        assert_eq!(registry.lookup::<Greeting>().len(), 1);
    }

    #[test]
    fn unregister_drops_extension_and_empty_capabilities() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register::<Greeting>("first", greeter("a"))
            .expect("first should register");
        registry
            .register::<Greeting>("second", greeter("b"))
            .expect("second should register");

        assert_eq!(registry.unregister("first"), 1);
        assert_eq!(registry.extension_ids("greeting"), vec!["second"]);
        assert_eq!(registry.unregister("first"), 0);

        assert_eq!(registry.unregister("second"), 1);
        assert!(registry.capability_ids().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_provider_handle_shares_instance() {
        let mut registry = ExtensionRegistry::new();
        let provider = greeter("shared");
        registry
            .register::<Greeting>("greeter", Arc::clone(&provider))
            .expect("registration should succeed");

        let found = registry.lookup::<Greeting>();
        assert!(Arc::ptr_eq(&found[0].handle(), &provider));
        assert_eq!(found[0].provider().greetings(), vec!["shared"]);
    }
}
