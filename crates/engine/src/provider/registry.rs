use std::fmt;
use std::sync::Arc;

use certloom_types::{ProviderKey, ProviderUsage};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::builtin::BUILTIN_PROVIDERS;
use super::descriptor::{ConstructionProps, DescriptorError, Deps, ProviderDescriptor, ProviderInfo};
use super::mount::FieldSetInstance;
use crate::i18n::LocaleContext;
use crate::schema::Schema;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("provider '{0}' is already registered")]
    Duplicate(ProviderKey),
}

/// Arguments for [`ProviderRegistry::instantiate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstantiateOptions {
    pub construction_props: ConstructionProps,
    pub deps: Deps,
}

/// Mapping from [`ProviderKey`] to [`ProviderDescriptor`].
///
/// The registry is populated once at start-up and treated as immutable
/// afterwards, so it can be shared behind an `Arc` without locking. Insertion
/// order is kept only so listings are stable; lookups are by key.
///
/// Every lookup tolerates keys that are not registered (for example a key
/// stored on a record before its provider was removed) and returns `None`
/// instead of failing. Errors raised inside a descriptor are caught here,
/// logged, and downgraded to "nothing to render".
#[derive(Default)]
pub struct ProviderRegistry {
    descriptors: IndexMap<ProviderKey, Arc<dyn ProviderDescriptor>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("keys", &self.descriptors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every provider shipped in this crate.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        for factory in BUILTIN_PROVIDERS {
            if let Err(error) = registry.register(factory()) {
                warn!(error = %error, "skipping built-in provider");
            }
        }
        registry
    }

    pub fn register(&mut self, descriptor: Arc<dyn ProviderDescriptor>) -> Result<(), RegistryError> {
        let key = descriptor.key();
        if self.descriptors.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        debug!(provider_key = %key, "provider registered");
        self.descriptors.insert(key, descriptor);
        Ok(())
    }

    /// Looks up a descriptor. Unknown keys resolve to `None`.
    pub fn resolve(&self, key: &str) -> Option<Arc<dyn ProviderDescriptor>> {
        let descriptor = self.descriptors.get(key).cloned();
        if descriptor.is_none() {
            debug!(provider_key = %key, "provider key not registered");
        }
        descriptor
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ProviderKey> {
        self.descriptors.keys()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Metadata of registered providers, optionally restricted to one usage.
    pub fn infos(&self, usage: Option<ProviderUsage>) -> Vec<ProviderInfo> {
        self.descriptors
            .values()
            .map(|descriptor| descriptor.info())
            .filter(|info| usage.is_none_or(|usage| info.supports(usage)))
            .collect()
    }

    /// The provider's schema, or `None` when unknown or unavailable.
    pub fn schema_for(&self, key: &str, locale: &LocaleContext) -> Option<Schema> {
        let descriptor = self.resolve(key)?;
        match descriptor.schema(locale) {
            Ok(schema) => Some(schema),
            Err(error) => {
                warn!(provider_key = %key, error = %error, "provider schema unavailable");
                None
            }
        }
    }

    /// The provider's initial values, or `None` when it has none, is unknown, or is unavailable.
    pub fn initial_values_for(&self, key: &str) -> Option<Value> {
        let descriptor = self.resolve(key)?;
        match checked_initial_values(descriptor.as_ref()) {
            Ok(values) => values,
            Err(error) => {
                warn!(provider_key = %key, error = %error, "provider initial values unavailable");
                None
            }
        }
    }

    /// Produces a render-ready field-set instance for `key`.
    ///
    /// Pure and idempotent: calling it again with the same arguments yields an
    /// equivalent instance. Returns `None` for unknown keys and for providers
    /// whose schema or initial values cannot be produced.
    pub fn instantiate(&self, key: &str, options: InstantiateOptions) -> Option<FieldSetInstance> {
        let descriptor = self.resolve(key)?;

        if let Err(error) = descriptor.schema(&LocaleContext::default()) {
            warn!(provider_key = %key, error = %error, "provider temporarily unavailable; rendering nothing");
            return None;
        }
        let initial_values = match checked_initial_values(descriptor.as_ref()) {
            Ok(values) => values,
            Err(error) => {
                warn!(provider_key = %key, error = %error, "provider temporarily unavailable; rendering nothing");
                return None;
            }
        };

        debug!(provider_key = %key, dep_count = options.deps.values().len(), "field-set instantiated");
        Some(FieldSetInstance::new(descriptor, options, initial_values))
    }
}

fn checked_initial_values(descriptor: &dyn ProviderDescriptor) -> Result<Option<Value>, DescriptorError> {
    match descriptor.initial_values()? {
        Some(values) if !values.is_object() => Err(DescriptorError::MalformedInitialValues { key: descriptor.key() }),
        values => Ok(values),
    }
}
