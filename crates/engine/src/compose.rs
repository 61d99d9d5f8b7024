//! Composition of the host-level validation schema.
//!
//! The host record schema combines fixed host fields (provider key, credential
//! reference, host-specific fields) with the active provider's schema placed
//! at the host's mount path. Composition is pure: identical inputs always give
//! structurally identical schemas, so [`SchemaComposer`] only memoises for
//! speed.

use std::sync::Arc;

use certloom_types::{FieldPath, HostKind, PathSegment, ProviderKey, ValidationErrors};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use tracing::debug;

use crate::field_paths::value_at;
use crate::i18n::LocaleContext;
use crate::provider::{Deps, ProviderRegistry};
use crate::schema::{ObjectSchema, Schema};
use crate::store::{ConfigStore, JsonConfigStore};

/// A plain string field declared at host level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostField {
    pub name: String,
    /// Catalog key of the field label, used for the required prompt.
    pub label_key: String,
    pub required: bool,
    pub max_length: Option<usize>,
}

impl HostField {
    pub fn optional(name: &str, label_key: &str) -> Self {
        Self {
            name: name.to_string(),
            label_key: label_key.to_string(),
            required: false,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    fn schema(&self, locale: &LocaleContext) -> Schema {
        let mut schema = Schema::string().trim().required_message(locale.please_enter(&self.label_key));
        if let Some(max) = self.max_length {
            schema = schema.max_length(max);
        }
        if self.required { schema } else { schema.optional() }
    }
}

/// Describes how a host embeds provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSchemaOptions {
    /// Host field holding the selected [`ProviderKey`].
    pub provider_field: String,
    /// Host field holding the stored credential reference, if the host has one.
    pub credential_field: Option<String>,
    /// Where provider configuration is mounted. Must not be the root.
    pub mount: FieldPath,
    pub host_fields: Vec<HostField>,
    /// Reject records whose provider key is no longer registered.
    pub require_known_provider: bool,
    /// Reject records without a provider key.
    pub require_provider: bool,
}

impl HostSchemaOptions {
    pub fn for_host(kind: HostKind) -> Self {
        let host_fields = match kind {
            HostKind::Access => vec![HostField::optional("name", "name").max_length(64)],
            HostKind::Deploy => Vec::new(),
        };
        Self {
            provider_field: "providerKey".to_string(),
            credential_field: kind.credential_field().map(str::to_string),
            mount: kind.mount_path(),
            host_fields,
            require_known_provider: false,
            require_provider: true,
        }
    }

    pub fn provider_path(&self) -> FieldPath {
        FieldPath::root().child(self.provider_field.as_str())
    }
}

/// Where the schema at the mount path came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "providerKey", rename_all = "camelCase")]
pub enum ConfigSchemaSource {
    /// No provider selected; the subtree accepts anything.
    Unselected,
    Provider(ProviderKey),
    /// Key not registered (for example a retired provider on a legacy record); accepts anything.
    Unknown(ProviderKey),
    /// Descriptor failed to produce a schema; accepts anything.
    Unavailable(ProviderKey),
}

impl ConfigSchemaSource {
    pub fn provider_key(&self) -> Option<&ProviderKey> {
        match self {
            ConfigSchemaSource::Unselected => None,
            ConfigSchemaSource::Provider(key) | ConfigSchemaSource::Unknown(key) | ConfigSchemaSource::Unavailable(key) => Some(key),
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, ConfigSchemaSource::Provider(_))
    }
}

/// The effective schema of a host record.
#[derive(Debug, Clone)]
pub struct HostSchema {
    schema: Schema,
    source: ConfigSchemaSource,
    mount: FieldPath,
    locale: LocaleContext,
}

impl HostSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn source(&self) -> &ConfigSchemaSource {
        &self.source
    }

    pub fn mount(&self) -> &FieldPath {
        &self.mount
    }

    pub fn describe(&self) -> Value {
        self.schema.describe()
    }

    /// Validates a whole host record.
    ///
    /// Error paths are absolute within the record. When a provider is active
    /// and its configuration is missing, the configuration validates as an
    /// empty object so every missing field is reported individually.
    pub fn validate(&self, record: &Value) -> Result<Value, ValidationErrors> {
        if self.source.is_provider()
            && record.is_object()
            && value_at(record, &self.mount).is_none_or(Value::is_null)
            && let Ok(mut store) = JsonConfigStore::from_value(record.clone())
            && store.set(&self.mount, Value::Object(JsonMap::new())).is_ok()
        {
            return self.schema.validate(&store.snapshot(), &self.locale);
        }
        self.schema.validate(record, &self.locale)
    }
}

/// Builds the host schema for `provider_key`.
///
/// Never fails: unknown keys and descriptor errors degrade the mounted subtree
/// to "accept anything" and are recorded in [`HostSchema::source`].
pub fn compose_schema(
    registry: &ProviderRegistry,
    options: &HostSchemaOptions,
    provider_key: Option<&str>,
    locale: &LocaleContext,
) -> HostSchema {
    let provider_key = provider_key.map(str::trim).filter(|key| !key.is_empty());

    let (source, config_schema) = match provider_key {
        None => (ConfigSchemaSource::Unselected, Schema::any()),
        Some(key) if !registry.contains(key) => (ConfigSchemaSource::Unknown(ProviderKey::from(key)), Schema::any()),
        Some(key) => match registry.schema_for(key, locale) {
            Some(schema) => (ConfigSchemaSource::Provider(ProviderKey::from(key)), schema),
            None => (ConfigSchemaSource::Unavailable(ProviderKey::from(key)), Schema::any()),
        },
    };

    let mut provider_options = registry.keys().map(ProviderKey::to_string).collect::<Vec<_>>();
    if let ConfigSchemaSource::Unknown(key) = &source
        && !options.require_known_provider
    {
        provider_options.push(key.to_string());
    }
    let mut provider_schema = Schema::enumeration(provider_options).required_message(locale.please_select("provider"));
    if !options.require_provider {
        provider_schema = provider_schema.optional();
    }

    let mut host = ObjectSchema::new().field(options.provider_field.as_str(), provider_schema);
    if let Some(credential_field) = &options.credential_field {
        let builtin = match &source {
            ConfigSchemaSource::Provider(key) => registry.resolve(key.as_str()).is_some_and(|descriptor| descriptor.info().builtin),
            _ => false,
        };
        let credential_schema = Schema::string().trim().required_message(locale.please_select("credential"));
        host = host.field(
            credential_field.as_str(),
            if builtin { credential_schema.optional() } else { credential_schema },
        );
    }
    for field in &options.host_fields {
        host = host.field(field.name.as_str(), field.schema(locale));
    }
    let host = mount_at(host, options.mount.segments(), config_schema);

    debug!(
        provider_key = ?provider_key,
        source = ?source,
        mount = %options.mount,
        locale = %locale.locale(),
        "host schema composed"
    );
    HostSchema {
        schema: Schema::object(host.passthrough()),
        source,
        mount: options.mount.clone(),
        locale: *locale,
    }
}

/// Places `config` under `segments`, building nested pass-through objects for
/// multi-segment mount paths.
fn mount_at(host: ObjectSchema, segments: &[PathSegment], config: Schema) -> ObjectSchema {
    match segments {
        [] => host,
        [only] => host.field(only.to_string(), config),
        [first, rest @ ..] => {
            let optional = config.is_optional();
            let inner = Schema::object(mount_at(ObjectSchema::new(), rest, config).passthrough());
            host.field(first.to_string(), if optional { inner.optional() } else { inner })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ComposeKey {
    provider_key: Option<String>,
    deps: Deps,
    locale: LocaleContext,
}

/// Memoises the last composed schema by `(provider key, deps, locale)`.
#[derive(Debug)]
pub struct SchemaComposer {
    options: HostSchemaOptions,
    cached: Option<(ComposeKey, Arc<HostSchema>)>,
}

impl SchemaComposer {
    pub fn new(options: HostSchemaOptions) -> Self {
        Self { options, cached: None }
    }

    pub fn options(&self) -> &HostSchemaOptions {
        &self.options
    }

    pub fn compose(&mut self, registry: &ProviderRegistry, provider_key: Option<&str>, deps: &Deps, locale: &LocaleContext) -> Arc<HostSchema> {
        let key = ComposeKey {
            provider_key: provider_key.map(str::to_string),
            deps: deps.clone(),
            locale: *locale,
        };
        if let Some((cached_key, schema)) = &self.cached
            && *cached_key == key
        {
            return Arc::clone(schema);
        }
        let schema = Arc::new(compose_schema(registry, &self.options, provider_key, locale));
        self.cached = Some((key, Arc::clone(&schema)));
        schema
    }
}
