use std::sync::Arc;

use certloom_engine::provider::builtin::{ssh, webhook};
use certloom_engine::{
    ConfigSchemaSource, DescriptorError, FieldSet, HostSchemaOptions, InstantiateOptions, LocaleContext, ProviderDescriptor, ProviderInfo,
    ProviderRegistry, RenderProps, Schema, compose_schema,
};
use certloom_types::{HostKind, Locale, ProviderKey, ProviderUsage};
use serde_json::{Value, json};

/// Fails every call, standing in for a provider whose catalog could not be loaded.
struct UnavailableProvider;

impl ProviderDescriptor for UnavailableProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from("flaky"),
            name: "Flaky".into(),
            usages: vec![ProviderUsage::Dns],
            builtin: false,
        }
    }

    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        FieldSet::new(self.key(), props.base_path.clone())
    }

    fn schema(&self, _locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        Err(DescriptorError::Unavailable {
            key: self.key(),
            reason: "message catalog not loaded".into(),
        })
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(None)
    }
}

#[test]
fn every_builtin_schema_accepts_the_shape_of_its_defaults() {
    let registry = ProviderRegistry::with_builtin_providers();
    let locale = LocaleContext::default();
    for key in registry.keys() {
        let Some(defaults) = registry.initial_values_for(key.as_str()) else {
            continue;
        };
        let schema = registry.schema_for(key.as_str(), &locale).expect("schema");
        if let Err(errors) = schema.validate(&defaults, &locale) {
            for error in &errors {
                assert!(
                    !error.message.starts_with("Expected") && !error.message.starts_with("Must be one of"),
                    "{key}: default value has the wrong shape at {}: {}",
                    error.path,
                    error.message
                );
            }
        }
    }
}

#[test]
fn schema_structure_does_not_depend_on_locale() {
    let registry = ProviderRegistry::with_builtin_providers();
    let english = LocaleContext::new(Locale::EnUs);
    let chinese = LocaleContext::new(Locale::ZhCn);
    for key in registry.keys() {
        let english_schema = registry.schema_for(key.as_str(), &english).expect("schema");
        let chinese_schema = registry.schema_for(key.as_str(), &chinese).expect("schema");
        assert_eq!(english_schema.describe(), chinese_schema.describe(), "{key}");
    }
}

#[test]
fn unknown_keys_degrade_to_always_valid() {
    let registry = ProviderRegistry::with_builtin_providers();
    let options = HostSchemaOptions::for_host(HostKind::Access);
    for key in ["", "SSH", "Webhook", "cloudflare", "../../etc/passwd", "ssh.extra"] {
        if registry.contains(key) {
            continue;
        }
        assert!(registry.resolve(key).is_none(), "{key:?}");
        let composed = compose_schema(&registry, &options, Some(key), &LocaleContext::default());
        let record = json!({ "providerKey": key, "config": { "whatever": [1, 2, 3] } });
        let config_errors = composed.validate(&record).err().map(|errors| errors.under(&"config".into()).len()).unwrap_or(0);
        assert_eq!(config_errors, 0, "{key:?}");
    }
}

#[test]
fn unavailable_descriptors_are_contained() {
    let mut registry = ProviderRegistry::with_builtin_providers();
    registry.register(Arc::new(UnavailableProvider)).expect("new key");

    assert!(registry.resolve("flaky").is_some());
    assert!(registry.schema_for("flaky", &LocaleContext::default()).is_none());
    assert!(registry.instantiate("flaky", InstantiateOptions::default()).is_none());

    let composed = compose_schema(
        &registry,
        &HostSchemaOptions::for_host(HostKind::Access),
        Some("flaky"),
        &LocaleContext::default(),
    );
    assert_eq!(composed.source(), &ConfigSchemaSource::Unavailable(ProviderKey::from("flaky")));
    assert!(composed.validate(&json!({ "providerKey": "flaky", "config": {} })).is_ok());
}

#[test]
fn exemplar_keys_are_stable() {
    let registry = ProviderRegistry::with_builtin_providers();
    assert!(registry.contains(webhook::KEY));
    assert!(registry.contains(ssh::KEY));
    let keys = registry.keys().map(ProviderKey::as_str).collect::<Vec<_>>();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted, "built-in table should stay ASCII-sorted");
}
