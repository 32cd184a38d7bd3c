//! Provider fault envelope.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Fault raised by a provider while producing its items.
///
/// Aggregations return this value unchanged to their caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Extension that owns the failing provider.
    pub extension_id: String,
    /// Capability being queried when the fault happened.
    pub capability: String,
    /// Stable machine-readable code, e.g. `backend_unavailable`.
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(
        extension_id: impl Into<String>,
        capability: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            extension_id: extension_id.into(),
            capability: capability.into(),
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "provider `{}` failed for capability `{}` [{}]: {}",
            self.extension_id, self.capability, self.code, self.message
        )
    }
}

impl Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::ProviderError;

    #[test]
    fn display_names_extension_capability_and_code() {
        let err = ProviderError::new(
            "htmlformentry",
            "form-entry-handler",
            "backend_unavailable",
            "form store offline",
            true,
        );
        let rendered = err.to_string();
        assert!(rendered.contains("htmlformentry"));
        assert!(rendered.contains("form-entry-handler"));
        assert!(rendered.contains("backend_unavailable"));
        assert!(rendered.contains("form store offline"));
    }
}
