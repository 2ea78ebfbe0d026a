//! String value formats and the validator registry.
//!
//! A text value type is either free (any string) or carries a named format.
//! Format names resolve to validators through an explicit registry owned by
//! the model, rather than global state.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{InstanceError, KbResult, ModelError};

/// Format constraint for a text value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextFormat {
    /// Any string.
    Free,
    /// A named format resolved through the [`TextFormatRegistry`].
    Named(String),
}

impl TextFormat {
    /// Free subsumes everything; named formats only subsume themselves.
    pub fn subsumes(&self, other: &TextFormat) -> bool {
        match (self, other) {
            (TextFormat::Free, _) => true,
            (TextFormat::Named(a), TextFormat::Named(b)) => a == b,
            (TextFormat::Named(_), TextFormat::Free) => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TextFormat::Free => None,
            TextFormat::Named(n) => Some(n),
        }
    }
}

impl std::fmt::Display for TextFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextFormat::Free => write!(f, "free"),
            TextFormat::Named(n) => write!(f, "{n}"),
        }
    }
}

/// Decides whether a string conforms to a named format.
pub trait TextValidator: Send + Sync {
    fn is_valid(&self, value: &str) -> bool;
}

impl<F> TextValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, value: &str) -> bool {
        self(value)
    }
}

/// Named-format validator registry with an explicit lifecycle.
///
/// Owned by the concept model and passed through context; registering the
/// same name again replaces the previous validator.
#[derive(Clone, Default)]
pub struct TextFormatRegistry {
    validators: Arc<DashMap<String, Arc<dyn TextValidator>>>,
}

impl TextFormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under a format name.
    pub fn register(&self, name: impl Into<String>, validator: impl TextValidator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    /// Whether a format name is known.
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Validate a string against a format.
    ///
    /// Free formats always pass; an unregistered named format is a model
    /// error, a failing validator is an instance error.
    pub fn validate(&self, format: &TextFormat, value: &str) -> KbResult<()> {
        let TextFormat::Named(name) = format else {
            return Ok(());
        };
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| ModelError::UnknownTextFormat { name: name.clone() })?;
        if validator.is_valid(value) {
            Ok(())
        } else {
            Err(InstanceError::TextFormatViolation {
                format: name.clone(),
                value: value.into(),
            }
            .into())
        }
    }
}

impl std::fmt::Debug for TextFormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFormatRegistry")
            .field("formats", &self.validators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_subsumes_named_but_not_vice_versa() {
        let free = TextFormat::Free;
        let iso = TextFormat::Named("iso-date".into());
        assert!(free.subsumes(&iso));
        assert!(free.subsumes(&free));
        assert!(!iso.subsumes(&free));
        assert!(iso.subsumes(&iso));
        assert!(!iso.subsumes(&TextFormat::Named("other".into())));
    }

    #[test]
    fn registry_validates_named_formats() {
        let registry = TextFormatRegistry::new();
        registry.register("digits", |s: &str| s.chars().all(|c| c.is_ascii_digit()));

        let digits = TextFormat::Named("digits".into());
        assert!(registry.validate(&digits, "12345").is_ok());
        assert!(registry.validate(&digits, "12a45").is_err());
        assert!(registry.validate(&TextFormat::Free, "anything").is_ok());

        let unknown = TextFormat::Named("missing".into());
        assert!(registry.validate(&unknown, "x").is_err());
    }
}
