//! Provider-switch state machine.
//!
//! Decides what happens to the mounted configuration subtree and to surfaced
//! errors when the selected provider changes:
//!
//! | from            | to               | config subtree      | errors under mount |
//! |-----------------|------------------|---------------------|--------------------|
//! | `Unselected`    | `Selected(k)`    | reset               | cleared            |
//! | `Selected(a)`   | `Selected(b≠a)`  | reset               | cleared            |
//! | `Selected(a)`   | `Selected(a)`    | kept                | cleared            |
//! | `Selected(_)`   | `Unselected`     | reset               | cleared            |
//!
//! Seeding of defaults is done afterwards by the mounted field-set, so only
//! rendered fields receive them.

use certloom_types::{FieldError, FieldPath, ProviderKey, ValidationErrors};
use serde::Serialize;
use tracing::debug;

use crate::store::ConfigStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SwitchState {
    #[default]
    Unselected,
    #[serde(rename_all = "camelCase")]
    Selected { key: ProviderKey, freshly_switched: bool },
}

impl SwitchState {
    pub fn key(&self) -> Option<&ProviderKey> {
        match self {
            SwitchState::Unselected => None,
            SwitchState::Selected { key, .. } => Some(key),
        }
    }

    /// `true` when the configuration subtree was reset by the last selection.
    pub fn is_freshly_switched(&self) -> bool {
        matches!(self, SwitchState::Selected { freshly_switched: true, .. })
    }
}

/// Outcome of [`ProviderSwitch::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchTransition {
    FirstPick,
    Switched { from: ProviderKey },
    Reconfirmed,
    Cleared,
    Unchanged,
}

impl SwitchTransition {
    /// Whether the configuration subtree was discarded.
    pub fn is_destructive(&self) -> bool {
        matches!(self, SwitchTransition::FirstPick | SwitchTransition::Switched { .. } | SwitchTransition::Cleared)
    }
}

/// Errors currently surfaced by a host form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: ValidationErrors,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all surfaced errors, typically with the result of a submit attempt.
    pub fn replace(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Drops every error at or below `prefix` and returns how many were removed.
    pub fn clear_under(&mut self, prefix: &FieldPath) -> usize {
        let before = self.errors.len();
        let kept = std::mem::take(&mut self.errors)
            .into_iter()
            .filter(|error| !error.path.starts_with(prefix))
            .collect::<Vec<_>>();
        self.errors = kept.into();
        before - self.errors.len()
    }

    pub fn clear(&mut self) {
        self.errors = ValidationErrors::new();
    }

    pub fn at(&self, path: &FieldPath) -> Vec<&FieldError> {
        self.errors.at(path)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn all(&self) -> &ValidationErrors {
        &self.errors
    }
}

/// Tracks the selected provider of one host form.
#[derive(Debug, Clone)]
pub struct ProviderSwitch {
    mount: FieldPath,
    state: SwitchState,
}

impl ProviderSwitch {
    /// Starts unselected, as for a new record.
    pub fn new(mount: FieldPath) -> Self {
        Self {
            mount,
            state: SwitchState::Unselected,
        }
    }

    /// Starts from a stored record's key without touching its configuration.
    pub fn resume(mount: FieldPath, key: Option<&str>) -> Self {
        let state = match normalize(key) {
            Some(key) => SwitchState::Selected {
                key: ProviderKey::from(key),
                freshly_switched: false,
            },
            None => SwitchState::Unselected,
        };
        Self { mount, state }
    }

    pub fn state(&self) -> &SwitchState {
        &self.state
    }

    pub fn mount(&self) -> &FieldPath {
        &self.mount
    }

    /// Applies a provider pick. Blank keys count as clearing the selection.
    pub fn select(&mut self, key: Option<&str>, store: &mut dyn ConfigStore, errors: &mut FieldErrors) -> SwitchTransition {
        let next = normalize(key);
        let transition = match (&self.state, next) {
            (SwitchState::Unselected, None) => return SwitchTransition::Unchanged,
            (SwitchState::Selected { key: current, .. }, Some(next)) if current.as_str() == next => SwitchTransition::Reconfirmed,
            (SwitchState::Selected { key: current, .. }, Some(_)) => SwitchTransition::Switched { from: current.clone() },
            (SwitchState::Unselected, Some(_)) => SwitchTransition::FirstPick,
            (SwitchState::Selected { .. }, None) => SwitchTransition::Cleared,
        };

        if transition.is_destructive() {
            store.reset(&self.mount);
        }
        let cleared = errors.clear_under(&self.mount);

        self.state = match (next, &self.state) {
            (None, _) => SwitchState::Unselected,
            (Some(_), SwitchState::Selected { key, freshly_switched }) if transition == SwitchTransition::Reconfirmed => {
                SwitchState::Selected {
                    key: key.clone(),
                    freshly_switched: *freshly_switched,
                }
            }
            (Some(next), _) => SwitchState::Selected {
                key: ProviderKey::from(next),
                freshly_switched: true,
            },
        };

        debug!(
            mount = %self.mount,
            transition = ?transition,
            provider_key = ?self.state.key().map(ProviderKey::as_str),
            cleared_errors = cleared,
            "provider selection applied"
        );
        transition
    }
}

fn normalize(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonConfigStore;
    use serde_json::json;

    fn config() -> FieldPath {
        FieldPath::parse("config")
    }

    #[test]
    fn switching_providers_discards_the_previous_config() {
        let mut store = JsonConfigStore::from_value(json!({ "providerKey": "webhook", "config": { "url": "https://a", "host": "x" } })).unwrap();
        let mut errors = FieldErrors::new();
        errors.push(FieldError::new(FieldPath::parse("config.url"), "Please enter webhook URL"));
        errors.push(FieldError::new(FieldPath::parse("name"), "too long"));

        let mut switch = ProviderSwitch::resume(config(), Some("webhook"));
        let transition = switch.select(Some("ssh"), &mut store, &mut errors);

        assert_eq!(transition, SwitchTransition::Switched { from: ProviderKey::from("webhook") });
        assert_eq!(store.get(&config()), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.at(&FieldPath::parse("name")).len(), 1);
        assert!(switch.state().is_freshly_switched());
    }

    #[test]
    fn reconfirming_keeps_values_but_clears_errors() {
        let mut store = JsonConfigStore::from_value(json!({ "config": { "host": "kept" } })).unwrap();
        let mut errors = FieldErrors::new();
        errors.push(FieldError::new(FieldPath::parse("config.authMethod"), "stale"));

        let mut switch = ProviderSwitch::resume(config(), Some("ssh"));
        assert_eq!(switch.select(Some("ssh"), &mut store, &mut errors), SwitchTransition::Reconfirmed);
        assert_eq!(store.get(&FieldPath::parse("config.host")), Some(&json!("kept")));
        assert!(errors.is_empty());
        assert!(!switch.state().is_freshly_switched());
    }

    #[test]
    fn first_pick_and_clearing() {
        let mut store = JsonConfigStore::new();
        let mut errors = FieldErrors::new();
        let mut switch = ProviderSwitch::new(config());

        assert_eq!(switch.select(None, &mut store, &mut errors), SwitchTransition::Unchanged);
        assert_eq!(switch.select(Some("webhook"), &mut store, &mut errors), SwitchTransition::FirstPick);
        store.set(&FieldPath::parse("config.url"), json!("https://x")).unwrap();
        assert_eq!(switch.select(Some("  "), &mut store, &mut errors), SwitchTransition::Cleared);
        assert_eq!(switch.state(), &SwitchState::Unselected);
        assert!(!store.contains(&config()));
    }
}
