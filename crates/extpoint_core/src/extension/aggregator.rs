//! Ordered and keyed aggregation over registered providers.
//!
//! # Responsibility
//! - Invoke every provider of one capability in registry order.
//! - Merge their items into a name-ordered list or an item-to-provider map.
//!
//! # Invariants
//! - Unknown capabilities and `None` provider results contribute nothing.
//! - The first provider fault aborts the call and is returned unchanged.
//! - No state survives between calls.

use crate::config::{AggregationConfig, KeyConflictPolicy, NameTieBreak};
use crate::extension::point::ExtensionPoint;
use crate::extension::provider::{ProviderError, ProviderResult};
use crate::extension::registry::{ProviderLookup, RegisteredProvider};
use log::{debug, error, warn};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Item-to-provider assignments for extension point `E`.
pub type ProviderAssignments<E> = HashMap<
    <E as ExtensionPoint>::Item,
    RegisteredProvider<<E as ExtensionPoint>::Provider>,
>;

/// One overridden claim observed during keyed aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConflict<T> {
    pub item: T,
    /// Extension whose earlier claim was replaced.
    pub displaced: String,
    pub winner: String,
}

/// Keyed aggregation result plus the overrides that produced it.
pub struct KeyedCollection<E: ExtensionPoint> {
    pub assignments: ProviderAssignments<E>,
    pub conflicts: Vec<KeyConflict<E::Item>>,
}

impl<E> Debug for KeyedCollection<E>
where
    E: ExtensionPoint,
    E::Item: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCollection")
            .field("assignments", &self.assignments)
            .field("conflicts", &self.conflicts)
            .finish()
    }
}

/// Stateless query facade over a provider registry.
pub struct ExtensionAggregator<'r, R: ProviderLookup> {
    registry: &'r R,
    config: AggregationConfig,
}

impl<'r, R: ProviderLookup> ExtensionAggregator<'r, R> {
    /// Creates an aggregator with default policies.
    pub fn new(registry: &'r R) -> Self {
        Self::with_config(registry, AggregationConfig::default())
    }

    pub fn with_config(registry: &'r R, config: AggregationConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> AggregationConfig {
        self.config
    }

    /// Collects unique items from every provider of `E`, ordered by
    /// `name_key` (lexicographic byte order).
    ///
    /// Byte order equals code point order, so it differs from UTF-16 code
    /// unit order when keys mix supplementary-plane characters with
    /// U+E000..=U+FFFF.
    ///
    /// # Contract
    /// - Equal items collapse to the first one seen.
    /// - Distinct items with equal keys follow `NameTieBreak`: kept in
    ///   first-seen order, or reduced to the first one seen.
    /// - Returns the first provider fault unchanged.
    pub fn collect_sorted<E, K>(
        &self,
        context: &E::Context,
        name_key: K,
    ) -> ProviderResult<Vec<E::Item>>
    where
        E: ExtensionPoint,
        K: Fn(&E::Item) -> &str,
    {
        let providers = self.registry.lookup::<E>();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for entry in &providers {
            let Some(batch) = invoke_provider::<E>(entry, context)? else {
                continue;
            };
            for item in batch {
                if seen.insert(item.clone()) {
                    items.push(item);
                }
            }
        }

        items.sort_by(|a, b| name_key(a).cmp(name_key(b)));
        if self.config.name_tie_break == NameTieBreak::CollapseByName {
            items.dedup_by(|later, earlier| name_key(&*later) == name_key(&*earlier));
        }

        debug!(
            "event=collect_sorted module=aggregator status=ok capability={} providers={} items={}",
            E::ID,
            providers.len(),
            items.len()
        );
        Ok(items)
    }

    /// Maps every item produced by providers of `E` to the provider that
    /// produced it. When several providers produce one item the last one in
    /// registry order wins; each override is logged at `warn`.
    pub fn collect_keyed<E: ExtensionPoint>(
        &self,
        context: &E::Context,
    ) -> ProviderResult<ProviderAssignments<E>> {
        self.collect_keyed_report::<E>(context)
            .map(|collection| collection.assignments)
    }

    /// Same as [`Self::collect_keyed`], also returning every override.
    pub fn collect_keyed_report<E: ExtensionPoint>(
        &self,
        context: &E::Context,
    ) -> ProviderResult<KeyedCollection<E>> {
        let providers = self.registry.lookup::<E>();
        let mut assignments: ProviderAssignments<E> = HashMap::new();
        let mut conflicts = Vec::new();

        for entry in &providers {
            let Some(batch) = invoke_provider::<E>(entry, context)? else {
                continue;
            };
            for item in batch {
                if let Some(displaced) = claim(&mut assignments, item.clone(), entry) {
                    warn!(
                        "event=claim_overridden module=aggregator status=overridden capability={} displaced={} winner={}",
                        E::ID,
                        displaced,
                        entry.extension_id()
                    );
                    conflicts.push(KeyConflict {
                        item,
                        displaced,
                        winner: entry.extension_id().to_string(),
                    });
                }
            }
        }

        debug!(
            "event=collect_keyed module=aggregator status=ok capability={} providers={} items={} conflicts={}",
            E::ID,
            providers.len(),
            assignments.len(),
            conflicts.len()
        );
        Ok(KeyedCollection {
            assignments,
            conflicts,
        })
    }

    /// Keyed aggregation honoring the configured `KeyConflictPolicy`.
    ///
    /// With `Reject`, the first item claimed by two different providers
    /// aborts the call with [`AggregationError::ConflictingClaim`].
    pub fn collect_keyed_checked<E: ExtensionPoint>(
        &self,
        context: &E::Context,
    ) -> Result<ProviderAssignments<E>, AggregationError> {
        if self.config.key_conflict_policy == KeyConflictPolicy::LastWriterWins {
            return Ok(self.collect_keyed::<E>(context)?);
        }

        let providers = self.registry.lookup::<E>();
        let mut assignments: ProviderAssignments<E> = HashMap::new();
        for entry in &providers {
            let Some(batch) = invoke_provider::<E>(entry, context)? else {
                continue;
            };
            for item in batch {
                if let Some(displaced) = claim(&mut assignments, item, entry) {
                    error!(
                        "event=claim_rejected module=aggregator status=error capability={} first={} second={}",
                        E::ID,
                        displaced,
                        entry.extension_id()
                    );
                    return Err(AggregationError::ConflictingClaim {
                        capability: E::ID.to_string(),
                        first: displaced,
                        second: entry.extension_id().to_string(),
                    });
                }
            }
        }

        debug!(
            "event=collect_keyed module=aggregator status=ok capability={} providers={} items={} conflicts=0",
            E::ID,
            providers.len(),
            assignments.len()
        );
        Ok(assignments)
    }
}

fn invoke_provider<E: ExtensionPoint>(
    entry: &RegisteredProvider<E::Provider>,
    context: &E::Context,
) -> ProviderResult<Option<Vec<E::Item>>> {
    E::invoke(entry.provider(), context).map_err(|err| {
        error!(
            "event=provider_fault module=aggregator status=error capability={} extension_id={} code={}",
            E::ID,
            entry.extension_id(),
            err.code
        );
        err
    })
}

/// Assigns `item` to `entry`, returning the extension id it displaced when
/// another extension held the claim.
fn claim<T, P>(
    assignments: &mut HashMap<T, RegisteredProvider<P>>,
    item: T,
    entry: &RegisteredProvider<P>,
) -> Option<String>
where
    T: Eq + std::hash::Hash,
    P: ?Sized,
{
    match assignments.entry(item) {
        Entry::Vacant(slot) => {
            slot.insert(entry.clone());
            None
        }
        Entry::Occupied(mut slot) => {
            let previous = slot.insert(entry.clone());
            (previous.extension_id() != entry.extension_id())
                .then(|| previous.extension_id().to_string())
        }
    }
}

/// Errors from policy-checked aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    Provider(ProviderError),
    ConflictingClaim {
        capability: String,
        first: String,
        second: String,
    },
}

impl From<ProviderError> for AggregationError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl Display for AggregationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(err) => write!(f, "{err}"),
            Self::ConflictingClaim {
                capability,
                first,
                second,
            } => write!(
                f,
                "extensions `{first}` and `{second}` claim the same item for capability `{capability}`"
            ),
        }
    }
}

impl Error for AggregationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::ConflictingClaim { .. } => None,
        }
    }
}
