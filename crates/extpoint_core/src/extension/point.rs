//! Typed extension point contracts.
//!
//! # Responsibility
//! - Bind one capability identifier to its provider interface at compile time.
//! - Describe how a provider is invoked and what it yields.
//!
//! # Invariants
//! - `ID` is stable and unique across all extension points of one registry.
//! - `invoke` returning `Ok(None)` means "nothing from this provider".

use crate::extension::provider::ProviderResult;
use std::hash::Hash;

/// One named extension point (capability).
///
/// The registry stores providers under `ID` already typed as
/// `Self::Provider`, so lookups never need to narrow a generic extension
/// object at runtime.
pub trait ExtensionPoint: 'static {
    /// Capability identifier, e.g. `form-entry-handler`.
    const ID: &'static str;

    /// Provider interface, usually a `dyn Trait`.
    type Provider: ?Sized + Send + Sync + 'static;

    /// Per-call request context handed to every provider.
    type Context;

    /// Domain value produced by providers.
    type Item: Clone + Eq + Hash;

    /// Calls the capability-specific retrieval method on one provider.
    fn invoke(
        provider: &Self::Provider,
        context: &Self::Context,
    ) -> ProviderResult<Option<Vec<Self::Item>>>;
}

/// Returns whether `value` is a well-formed capability identifier.
///
/// Accepted shape: lowercase ascii letters and digits, separated by single
/// `-`, `_` or `.` characters, not starting or ending with a separator.
pub fn is_valid_capability_id(value: &str) -> bool {
    is_dotted_identifier(value)
}

pub(crate) fn is_dotted_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
        } else if matches!(c, '.' | '_' | '-') && !prev_separator {
            prev_separator = true;
        } else {
            return false;
        }
    }
    !prev_separator
}

#[cfg(test)]
mod tests {
    use super::is_valid_capability_id;

    #[test]
    fn accepts_known_capability_shapes() {
        assert!(is_valid_capability_id("form-entry-handler"));
        assert!(is_valid_capability_id("can-add-encounter-to-visit"));
        assert!(is_valid_capability_id("web.extension.v2"));
    }

    #[test]
    fn rejects_malformed_capability_ids() {
        assert!(!is_valid_capability_id(""));
        assert!(!is_valid_capability_id("Form Entry"));
        assert!(!is_valid_capability_id("-leading"));
        assert!(!is_valid_capability_id("trailing-"));
        assert!(!is_valid_capability_id("double--dash"));
    }
}
