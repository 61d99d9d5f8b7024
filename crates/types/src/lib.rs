//! Shared data model for the Certloom provider configuration engine.
//!
//! These types are deliberately free of behaviour beyond parsing and
//! formatting so that both the engine and the CLI can agree on wire shapes.

mod errors;
mod locale;
mod path;
mod provider;

pub use errors::{FieldError, ValidationErrors};
pub use locale::{Locale, UnsupportedLocale};
pub use path::{FieldPath, PathSegment};
pub use provider::{HostKind, ParseKindError, ProviderKey, ProviderUsage};
