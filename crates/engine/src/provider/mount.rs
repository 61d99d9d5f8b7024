//! The single field-set slot of a host form.

use std::fmt;
use std::sync::Arc;

use certloom_types::{FieldPath, ProviderKey};
use serde_json::Value;
use tracing::debug;

use super::descriptor::{ConstructionProps, Deps, FieldSet, ProviderDescriptor, RenderProps};
use super::registry::{InstantiateOptions, ProviderRegistry};
use crate::i18n::LocaleContext;

/// A render-ready field-set produced by [`ProviderRegistry::instantiate`].
#[derive(Clone)]
pub struct FieldSetInstance {
    key: ProviderKey,
    descriptor: Arc<dyn ProviderDescriptor>,
    construction_props: ConstructionProps,
    deps: Deps,
    initial_values: Option<Value>,
    generation: u64,
}

impl fmt::Debug for FieldSetInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSetInstance")
            .field("key", &self.key)
            .field("deps", &self.deps)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl FieldSetInstance {
    pub(crate) fn new(descriptor: Arc<dyn ProviderDescriptor>, options: InstantiateOptions, initial_values: Option<Value>) -> Self {
        Self {
            key: descriptor.key(),
            descriptor,
            construction_props: options.construction_props,
            deps: options.deps,
            initial_values,
            generation: 0,
        }
    }

    pub fn key(&self) -> &ProviderKey {
        &self.key
    }

    pub fn deps(&self) -> &Deps {
        &self.deps
    }

    /// Mount counter value at the time this instance was mounted; `0` when never mounted.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn initial_values(&self) -> Option<&Value> {
        self.initial_values.as_ref()
    }

    pub fn descriptor(&self) -> &Arc<dyn ProviderDescriptor> {
        &self.descriptor
    }

    /// Renders the field-set at `base_path` for the config subtree `values`.
    pub fn render(&self, base_path: &FieldPath, values: Option<&Value>, locale: &LocaleContext) -> FieldSet {
        self.descriptor.render_fields(&RenderProps {
            base_path,
            values,
            construction_props: &self.construction_props,
            deps: &self.deps,
            locale,
        })
    }
}

/// Holds at most one mounted [`FieldSetInstance`].
///
/// `mount` re-instantiates exactly when the requested key or any dependency
/// differs from the previous request. The previous instance is dropped before
/// the next one is created, so two providers are never mounted together.
#[derive(Debug, Default)]
pub struct FieldSetMount {
    current: Option<FieldSetInstance>,
    last_request: Option<(ProviderKey, Deps)>,
    generation: u64,
}

impl FieldSetMount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts the field-set for `key`, or empties the slot when `key` is `None`.
    ///
    /// Returns `None` when the slot is empty, which includes unknown and
    /// unavailable providers.
    pub fn mount(&mut self, registry: &ProviderRegistry, key: Option<&str>, options: InstantiateOptions) -> Option<&FieldSetInstance> {
        let Some(key) = key else {
            self.unmount();
            return None;
        };

        let unchanged = self
            .last_request
            .as_ref()
            .is_some_and(|(last_key, last_deps)| last_key.as_str() == key && *last_deps == options.deps);
        if unchanged {
            return self.current.as_ref();
        }

        self.unmount();
        self.generation += 1;
        self.last_request = Some((ProviderKey::from(key), options.deps.clone()));
        let generation = self.generation;
        self.current = registry.instantiate(key, options).map(|mut instance| {
            instance.generation = generation;
            instance
        });
        debug!(provider_key = %key, generation, mounted = self.current.is_some(), "field-set slot updated");
        self.current.as_ref()
    }

    /// Empties the slot and returns the instance that was mounted.
    pub fn unmount(&mut self) -> Option<FieldSetInstance> {
        self.last_request = None;
        self.current.take()
    }

    pub fn current(&self) -> Option<&FieldSetInstance> {
        self.current.as_ref()
    }

    /// Number of instantiations performed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(deps: Vec<Value>) -> InstantiateOptions {
        InstantiateOptions {
            construction_props: ConstructionProps::new(),
            deps: Deps::new(deps),
        }
    }

    #[test]
    fn remounts_only_when_key_or_deps_change() {
        let registry = ProviderRegistry::with_builtin_providers();
        let mut slot = FieldSetMount::new();

        assert_eq!(slot.mount(&registry, Some("ssh"), options(vec![json!("deploy")])).map(|i| i.generation()), Some(1));
        assert_eq!(slot.mount(&registry, Some("ssh"), options(vec![json!("deploy")])).map(|i| i.generation()), Some(1));
        assert_eq!(slot.mount(&registry, Some("ssh"), options(vec![json!("notify")])).map(|i| i.generation()), Some(2));
        let instance = slot.mount(&registry, Some("webhook"), options(vec![json!("notify")])).expect("mounted");
        assert_eq!(instance.key().as_str(), "webhook");
        assert_eq!(instance.generation(), 3);
    }

    #[test]
    fn unknown_keys_leave_the_slot_empty_without_churn() {
        let registry = ProviderRegistry::with_builtin_providers();
        let mut slot = FieldSetMount::new();
        slot.mount(&registry, Some("webhook"), InstantiateOptions::default());

        assert!(slot.mount(&registry, Some("retired"), InstantiateOptions::default()).is_none());
        assert!(slot.current().is_none());
        let generation = slot.generation();
        assert!(slot.mount(&registry, Some("retired"), InstantiateOptions::default()).is_none());
        assert_eq!(slot.generation(), generation);
    }

    #[test]
    fn clearing_the_key_unmounts() {
        let registry = ProviderRegistry::with_builtin_providers();
        let mut slot = FieldSetMount::new();
        slot.mount(&registry, Some("webhook"), InstantiateOptions::default());
        assert!(slot.mount(&registry, None, InstantiateOptions::default()).is_none());
        assert!(slot.current().is_none());
        assert!(slot.mount(&registry, Some("webhook"), InstantiateOptions::default()).is_some());
    }

    #[test]
    fn renders_at_the_requested_base_path() {
        let registry = ProviderRegistry::with_builtin_providers();
        let instance = registry.instantiate("webhook", InstantiateOptions::default()).expect("webhook");
        let fields = instance.render(&FieldPath::parse("providerConfig"), None, &LocaleContext::default());
        assert_eq!(fields.field("url").map(|field| field.path.to_string()), Some("providerConfig.url".into()));
    }
}
