//! Shared helpers for the Certloom binaries: settings, path expansion and
//! secret redaction.

mod path_processing;
pub mod redact;
pub mod settings;

pub use path_processing::expand_tilde;
pub use redact::{redact_json, redact_paths};
pub use settings::{Settings, SettingsError};
