//! The provider plugin contract and its render output.
//!
//! A descriptor is the `{ render_fields, schema, initial_values }` triple for
//! one provider. It never reads ambient state: the base path at which its
//! field-set is mounted and the current values under that path are passed in
//! through [`RenderProps`].

use certloom_types::{FieldPath, ProviderKey, ProviderUsage};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

use crate::field_paths::value_at;
use crate::i18n::LocaleContext;
use crate::schema::Schema;
use crate::store::{ConfigStore, StoreError};

/// Descriptor-specific construction props, opaque to the registry.
pub type ConstructionProps = JsonMap<String, Value>;

/// Host-level values a field-set depends on. Compared element-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deps(Vec<Value>);

impl Deps {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// The first dep naming a [`ProviderUsage`]. Hosts pass their usage mode this way.
    pub fn usage(&self) -> Option<ProviderUsage> {
        self.0.iter().filter_map(Value::as_str).find_map(|text| text.parse().ok())
    }
}

impl FromIterator<Value> for Deps {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Static metadata about a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub key: ProviderKey,
    pub name: String,
    pub usages: Vec<ProviderUsage>,
    /// Built-in providers need no stored credential.
    pub builtin: bool,
}

impl ProviderInfo {
    pub fn supports(&self, usage: ProviderUsage) -> bool {
        self.usages.contains(&usage)
    }
}

/// Failures raised inside a descriptor while producing its schema or defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("provider '{key}' is unavailable: {reason}")]
    Unavailable { key: ProviderKey, reason: String },

    #[error("provider '{key}' returned initial values that are not an object")]
    MalformedInitialValues { key: ProviderKey },
}

/// Inputs for rendering a field-set.
#[derive(Debug, Clone, Copy)]
pub struct RenderProps<'a> {
    /// Where the provider's configuration lives inside the host record.
    pub base_path: &'a FieldPath,
    /// Current configuration subtree, if any.
    pub values: Option<&'a Value>,
    pub construction_props: &'a ConstructionProps,
    pub deps: &'a Deps,
    pub locale: &'a LocaleContext,
}

impl RenderProps<'_> {
    /// String value of a local field, used to decide sub-mode visibility.
    pub fn str_value(&self, field: &str) -> Option<&str> {
        self.values
            .and_then(|values| value_at(values, &FieldPath::root().child(field)))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Secret,
    Number,
    TextArea,
    Toggle,
    Select { options: Vec<String> },
    /// Repeatable homogeneous sub-records; `item` paths are relative to one entry.
    List { item: Vec<FieldNode> },
}

/// One renderable field, addressed absolutely inside the host record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    pub path: FieldPath,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldNode {
    pub fn new(base_path: &FieldPath, name: &str, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            path: base_path.child(name),
            label: label.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_secret(&self) -> bool {
        matches!(self.kind, FieldKind::Secret)
    }
}

/// Render-ready field-set for one provider, bound to a base path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSet {
    pub provider_key: ProviderKey,
    pub base_path: FieldPath,
    pub fields: Vec<FieldNode>,
}

impl FieldSet {
    pub fn new(provider_key: ProviderKey, base_path: FieldPath) -> Self {
        Self {
            provider_key,
            base_path,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Absolute paths of rendered secret fields.
    pub fn secret_paths(&self) -> Vec<FieldPath> {
        self.fields.iter().filter(|field| field.is_secret()).map(|field| field.path.clone()).collect()
    }

    /// Seeds defaults for rendered fields that are absent in the store.
    ///
    /// Only fields present in this field-set are considered, so defaults of a
    /// sub-mode that is not currently visible stay unset. Present values are
    /// never overwritten. Returns the number of fields written.
    pub fn seed(&self, store: &mut dyn ConfigStore, initial_values: Option<&Value>) -> Result<usize, StoreError> {
        let Some(Value::Object(defaults)) = initial_values else {
            return Ok(0);
        };
        let mut written = 0;
        for field in &self.fields {
            let Some(default) = defaults.get(&field.name) else {
                continue;
            };
            if store.get(&field.path).is_some_and(|current| !current.is_null()) {
                continue;
            }
            store.set(&field.path, default.clone())?;
            written += 1;
        }
        Ok(written)
    }
}

/// A provider plugin. Implementations must be pure: no I/O, no interior state
/// that changes between calls.
pub trait ProviderDescriptor: Send + Sync {
    fn info(&self) -> ProviderInfo;

    /// Produces the field-set for the current values, bound to `props.base_path`.
    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet;

    /// Validation schema for the configuration subtree.
    ///
    /// Must be callable before any value exists; `locale` affects message text only.
    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError>;

    /// Default values for a fresh configuration; must be accepted by [`schema`](Self::schema)'s shape.
    fn initial_values(&self) -> Result<Option<Value>, DescriptorError>;

    /// Local fields whose value selects a sub-mode (visibility and requiredness).
    fn mode_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn key(&self) -> ProviderKey {
        self.info().key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonConfigStore;
    use serde_json::json;

    fn field_set() -> FieldSet {
        let base = FieldPath::parse("config");
        FieldSet::new(ProviderKey::from("webhook"), base.clone())
            .with(FieldNode::new(&base, "url", "URL", FieldKind::Text).required())
            .with(FieldNode::new(
                &base,
                "method",
                "Method",
                FieldKind::Select {
                    options: vec!["GET".into(), "POST".into()],
                },
            ))
    }

    #[test]
    fn seed_fills_only_absent_rendered_fields() {
        let mut store = JsonConfigStore::from_value(json!({ "config": { "url": "https://kept" } })).unwrap();
        let written = field_set()
            .seed(&mut store, Some(&json!({ "url": "", "method": "POST", "unrendered": true })))
            .expect("seed");
        assert_eq!(written, 1);
        assert_eq!(store.snapshot(), json!({ "config": { "url": "https://kept", "method": "POST" } }));
    }

    #[test]
    fn usage_is_read_from_the_first_matching_dep() {
        assert_eq!(Deps::default().usage(), None);
        let deps = Deps::new(vec![json!(42), json!("password"), json!("Notification"), json!("deployment")]);
        assert_eq!(deps.usage(), Some(ProviderUsage::Notification));
    }

    #[test]
    fn seed_ignores_missing_defaults() {
        let mut store = JsonConfigStore::new();
        assert_eq!(field_set().seed(&mut store, None).unwrap(), 0);
        assert_eq!(store.snapshot(), json!({}));
    }

    #[test]
    fn render_props_expose_local_string_values() {
        let values = json!({ "authMethod": "key" });
        let base = FieldPath::parse("providerConfig");
        let props = RenderProps {
            base_path: &base,
            values: Some(&values),
            construction_props: &ConstructionProps::new(),
            deps: &Deps::default(),
            locale: &LocaleContext::default(),
        };
        assert_eq!(props.str_value("authMethod"), Some("key"));
        assert_eq!(props.str_value("missing"), None);
    }
}
