//! Host form session: one record editor embedding a provider field-set.
//!
//! [`HostForm`] owns the record being edited and wires the registry, the
//! field-set slot, the schema composer and the provider-switch state machine
//! together. Submission hands the validated record to a [`RecordSink`], the
//! boundary to the external automation engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use certloom_types::{FieldPath, HostKind, ProviderKey, ValidationErrors};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compose::{HostSchema, HostSchemaOptions, SchemaComposer, compose_schema};
use crate::field_paths::value_at;
use crate::i18n::LocaleContext;
use crate::provider::{ConstructionProps, Deps, FieldSet, FieldSetMount, InstantiateOptions, ProviderRegistry};
use crate::store::{ConfigStore, JsonConfigStore, StoreError};
use crate::switch::{FieldErrors, ProviderSwitch, SwitchState, SwitchTransition};

/// Seeding can reveal further sub-mode fields; bounded so a descriptor whose
/// defaults keep toggling modes cannot loop.
const MAX_SEED_PASSES: usize = 3;

/// Receives validated host records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn dispatch(&self, kind: HostKind, record: Value) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum HostFormError {
    #[error("the provider of a saved {kind} record cannot be changed (currently '{current}')")]
    ProviderLocked { kind: HostKind, current: ProviderKey },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a submit is already in progress")]
    Busy,

    #[error("validation failed: {0}")]
    Invalid(ValidationErrors),

    #[error("failed to dispatch the record")]
    Dispatch(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Clears the pending flag when the submit future completes or is dropped.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Editor state for one access credential or deployment node.
pub struct HostForm {
    kind: HostKind,
    registry: Arc<ProviderRegistry>,
    options: HostSchemaOptions,
    locale: LocaleContext,
    store: JsonConfigStore,
    switch: ProviderSwitch,
    errors: FieldErrors,
    slot: FieldSetMount,
    composer: SchemaComposer,
    construction_props: ConstructionProps,
    host_deps: Deps,
    persisted: bool,
    pending: AtomicBool,
}

impl std::fmt::Debug for HostForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostForm")
            .field("kind", &self.kind)
            .field("state", self.switch.state())
            .field("persisted", &self.persisted)
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

impl HostForm {
    /// Form for a new, empty record.
    pub fn create(kind: HostKind, registry: Arc<ProviderRegistry>, locale: LocaleContext) -> Self {
        Self::with_options(kind, HostSchemaOptions::for_host(kind), registry, JsonConfigStore::new(), false, locale)
    }

    /// Form editing a stored record.
    ///
    /// The stored provider key is resumed without a reset, and only fields
    /// absent from the record receive defaults.
    pub fn open(kind: HostKind, registry: Arc<ProviderRegistry>, record: Value, locale: LocaleContext) -> Result<Self, HostFormError> {
        let store = JsonConfigStore::from_value(record)?;
        let mut form = Self::with_options(kind, HostSchemaOptions::for_host(kind), registry, store, true, locale);
        form.refresh_field_set()?;
        Ok(form)
    }

    /// Form with explicit schema options, for hosts that do not follow a [`HostKind`] preset.
    pub fn with_options(
        kind: HostKind,
        options: HostSchemaOptions,
        registry: Arc<ProviderRegistry>,
        store: JsonConfigStore,
        persisted: bool,
        locale: LocaleContext,
    ) -> Self {
        let provider_path = options.provider_path();
        let key = store.get(&provider_path).and_then(Value::as_str).map(str::to_string);
        let switch = ProviderSwitch::resume(options.mount.clone(), key.as_deref());
        Self {
            kind,
            registry,
            composer: SchemaComposer::new(options.clone()),
            options,
            locale,
            store,
            switch,
            errors: FieldErrors::new(),
            slot: FieldSetMount::new(),
            construction_props: ConstructionProps::new(),
            host_deps: Deps::default(),
            persisted,
            pending: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn locale(&self) -> LocaleContext {
        self.locale
    }

    pub fn mount_path(&self) -> &FieldPath {
        &self.options.mount
    }

    pub fn state(&self) -> &SwitchState {
        self.switch.state()
    }

    pub fn provider_key(&self) -> Option<&ProviderKey> {
        self.switch.state().key()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Generation of the mounted field-set slot; changes whenever it is re-instantiated.
    pub fn mount_generation(&self) -> u64 {
        self.slot.generation()
    }

    /// The record as currently edited.
    pub fn record(&self) -> Value {
        self.store.snapshot()
    }

    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        self.store.get(path)
    }

    /// Host-level values the mounted field-set depends on, such as the host's
    /// usage mode. A change re-instantiates the field-set and seeds fields it reveals.
    pub fn set_deps(&mut self, deps: Deps) -> Result<(), HostFormError> {
        if self.host_deps == deps {
            return Ok(());
        }
        self.host_deps = deps;
        self.refresh_field_set()?;
        Ok(())
    }

    /// Props handed to the next instantiation. Changing them alone never re-mounts the field-set.
    pub fn set_construction_props(&mut self, props: ConstructionProps) {
        self.construction_props = props;
    }

    /// Changes the selected provider.
    ///
    /// Fails with [`HostFormError::ProviderLocked`] when the host locks the
    /// provider of persisted records and `key` differs from the stored one.
    pub fn select_provider(&mut self, key: Option<&str>) -> Result<SwitchTransition, HostFormError> {
        let next = key.map(str::trim).filter(|key| !key.is_empty());
        if self.persisted
            && self.kind.locks_provider_when_persisted()
            && let Some(current) = self.switch.state().key()
            && next != Some(current.as_str())
        {
            warn!(host = %self.kind, provider_key = %current, requested = ?next, "provider change rejected on a saved record");
            return Err(HostFormError::ProviderLocked {
                kind: self.kind,
                current: current.clone(),
            });
        }

        let transition = self.switch.select(next, &mut self.store, &mut self.errors);
        self.write_provider_field(next)?;
        if transition.is_destructive() {
            self.slot.unmount();
        }
        self.refresh_field_set()?;
        Ok(transition)
    }

    fn write_provider_field(&mut self, key: Option<&str>) -> Result<(), StoreError> {
        let provider_path = self.options.provider_path();
        match key {
            Some(key) => self.store.set(&provider_path, Value::String(key.to_string()))?,
            None => {
                self.store.reset(&provider_path);
            }
        }
        self.errors.clear_under(&provider_path);
        Ok(())
    }

    /// Writes one value.
    ///
    /// A write that covers the provider field, whether the field itself or
    /// one of its ancestors, goes through [`select_provider`](Self::select_provider)
    /// with the key carried by `value`, then lands on top of the switched state.
    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<(), HostFormError> {
        let provider_path = self.options.provider_path();
        if *path == provider_path {
            let key = value.as_str().map(str::to_string);
            return self.select_provider(key.as_deref()).map(|_| ());
        }
        if let Some(relative) = provider_path.strip_prefix(path) {
            if path.is_root() && !value.is_object() {
                return Err(StoreError::RootNotObject.into());
            }
            let key = value_at(&value, &relative).and_then(Value::as_str).map(str::to_string);
            let transition = self.select_provider(key.as_deref())?;
            debug!(host = %self.kind, path = %path, transition = ?transition, "record subtree replaced");
            self.store.set(path, value)?;
            let selected = self.switch.state().key().map(|key| key.as_str().to_string());
            self.write_provider_field(selected.as_deref())?;
            self.errors.clear_under(path);
            self.refresh_field_set()?;
            return Ok(());
        }

        self.store.set(path, value)?;
        self.errors.clear_under(path);
        if path.starts_with(&self.options.mount) || self.options.mount.starts_with(path) {
            // A mode field may have changed which fields are visible.
            self.refresh_field_set()?;
        }
        Ok(())
    }

    /// Mounts and renders the active field-set, seeding newly visible fields.
    pub fn field_set(&mut self) -> Result<Option<FieldSet>, HostFormError> {
        Ok(self.refresh_field_set()?)
    }

    fn refresh_field_set(&mut self) -> Result<Option<FieldSet>, StoreError> {
        let key = self.switch.state().key().map(|key| key.as_str().to_string());
        let options = InstantiateOptions {
            construction_props: self.construction_props.clone(),
            deps: self.effective_deps(key.as_deref()),
        };
        let Some(instance) = self.slot.mount(&self.registry, key.as_deref(), options).cloned() else {
            return Ok(None);
        };

        let mount = self.options.mount.clone();
        let mut field_set = instance.render(&mount, self.store.get(&mount), &self.locale);
        for _ in 0..MAX_SEED_PASSES {
            let written = field_set.seed(&mut self.store, instance.initial_values())?;
            if written == 0 {
                break;
            }
            debug!(provider_key = %instance.key(), written, "seeded default values");
            field_set = instance.render(&mount, self.store.get(&mount), &self.locale);
        }
        Ok(Some(field_set))
    }

    /// Host deps followed by the current values of the provider's mode fields.
    fn effective_deps(&self, key: Option<&str>) -> Deps {
        let mut deps = self.host_deps.clone();
        if let Some(descriptor) = key.and_then(|key| self.registry.resolve(key)) {
            for field in descriptor.mode_fields() {
                let path = self.options.mount.child(*field);
                deps.push(self.store.get(&path).cloned().unwrap_or(Value::Null));
            }
        }
        deps
    }

    /// The composed schema for the current provider, mode values and locale.
    pub fn schema(&mut self) -> Arc<HostSchema> {
        let key = self.switch.state().key().map(|key| key.as_str().to_string());
        let deps = self.effective_deps(key.as_deref());
        self.composer.compose(&self.registry, key.as_deref(), &deps, &self.locale)
    }

    /// Validates the record and surfaces the outcome in [`errors`](Self::errors).
    pub fn validate(&mut self) -> Result<Value, ValidationErrors> {
        let result = self.schema().validate(&self.store.snapshot());
        match &result {
            Ok(_) => self.errors.clear(),
            Err(errors) => self.errors.replace(errors.clone()),
        }
        result
    }

    /// Switches the message locale. Surfaced errors are re-rendered in the new locale.
    pub fn set_locale(&mut self, locale: LocaleContext) {
        if self.locale == locale {
            return;
        }
        self.locale = locale;
        self.revalidate_surfaced();
    }

    /// Re-renders surfaced errors; a clean form stays clean until the next explicit validation.
    fn revalidate_surfaced(&mut self) {
        if self.errors.is_empty() {
            return;
        }
        if self.validate().is_ok() {
            debug!(host = %self.kind, "surfaced errors resolved on revalidation");
        }
    }

    /// Validates the record and dispatches it to `sink`.
    ///
    /// Only one submit may be in flight; overlapping calls fail with
    /// [`SubmitError::Busy`]. The form itself is not modified, pass the
    /// outcome to [`finish_submit`](Self::finish_submit) to surface it.
    pub async fn submit(&self, sink: &dyn RecordSink) -> Result<Value, SubmitError> {
        if self.pending.swap(true, Ordering::AcqRel) {
            debug!(host = %self.kind, "submit ignored while another is pending");
            return Err(SubmitError::Busy);
        }
        let _guard = PendingGuard(&self.pending);

        let key = self.switch.state().key().map(ProviderKey::as_str);
        let schema = compose_schema(&self.registry, &self.options, key, &self.locale);
        let record = schema.validate(&self.store.snapshot()).map_err(SubmitError::Invalid)?;

        sink.dispatch(self.kind, record.clone()).await.map_err(|error| SubmitError::Dispatch(error.into()))?;
        info!(host = %self.kind, provider_key = ?key, "record dispatched");
        Ok(record)
    }

    /// Applies a submit outcome: surfaces validation errors, or marks the record saved.
    pub fn finish_submit(&mut self, outcome: &Result<Value, SubmitError>) {
        match outcome {
            Ok(record) => {
                if let Ok(store) = JsonConfigStore::from_value(record.clone()) {
                    self.store = store;
                }
                self.errors.clear();
                self.persisted = true;
            }
            Err(SubmitError::Invalid(errors)) => self.errors.replace(errors.clone()),
            Err(SubmitError::Busy | SubmitError::Dispatch(_)) => {}
        }
    }
}
