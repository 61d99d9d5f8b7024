//! # Certloom Engine
//!
//! Runtime-pluggable, schema-validated provider configuration blocks.
//!
//! A host record (an access credential or a deployment node) selects a
//! provider by key. The engine resolves that key to a
//! [`ProviderDescriptor`](provider::ProviderDescriptor), mounts its field-set
//! at the host's configuration path, composes the host-level validation
//! schema, and manages what happens to entered values when the selected
//! provider changes.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use certloom_engine::{HostForm, LocaleContext, ProviderRegistry};
//! use certloom_types::{FieldPath, HostKind};
//! use serde_json::json;
//!
//! let registry = Arc::new(ProviderRegistry::with_builtin_providers());
//! let mut form = HostForm::create(HostKind::Access, registry, LocaleContext::default());
//!
//! form.select_provider(Some("webhook"))?;
//! assert_eq!(form.record()["config"], json!({ "url": "", "method": "POST" }));
//!
//! let errors = form.validate().unwrap_err();
//! assert_eq!(errors.to_string(), "config.url: Please enter webhook URL");
//!
//! form.set_value(&FieldPath::parse("config.url"), json!("https://hooks.example.com/certs"))?;
//! assert!(form.validate().is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`schema`**: declarative schema tree, validator and object refinements
//! - **`i18n`**: locale-aware message and label catalog
//! - **`store`**: path-addressed [`ConfigStore`] over the edited record
//! - **`provider`**: descriptor contract, registry, field-set slot, built-in providers
//! - **`compose`**: host schema composition and memoisation
//! - **`switch`**: provider-switch state machine and surfaced-error bag
//! - **`host`**: host form session and the [`RecordSink`] dispatch boundary

pub mod compose;
pub mod field_paths;
pub mod host;
pub mod i18n;
pub mod provider;
pub mod schema;
pub mod store;
pub mod switch;

pub use compose::{ConfigSchemaSource, HostField, HostSchema, HostSchemaOptions, SchemaComposer, compose_schema};
pub use host::{HostForm, HostFormError, RecordSink, SubmitError};
pub use i18n::LocaleContext;
pub use provider::{
    ConstructionProps, DescriptorError, Deps, FieldKind, FieldNode, FieldSet, FieldSetInstance, FieldSetMount, InstantiateOptions,
    ProviderDescriptor, ProviderInfo, ProviderRegistry, RegistryError, RenderProps,
};
pub use schema::Schema;
pub use store::{ConfigStore, JsonConfigStore, StoreError};
pub use switch::{FieldErrors, ProviderSwitch, SwitchState, SwitchTransition};
