//! Field-addressed validation errors.
//!
//! Every user-correctable problem is reported through the same channel: a
//! [`FieldError`] carrying the absolute path of the offending value and a
//! locale-specific message. There is no separate error class for cross-field
//! rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FieldPath;

/// A single validation failure addressed at a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: FieldPath,
    pub message: String,
}

impl FieldError {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Re-addresses the error below `prefix`.
    pub fn prefixed(mut self, prefix: &FieldPath) -> Self {
        self.path = prefix.join(&self.path);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// The failure side of a schema validation: one or more [`FieldError`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// True when an error is already reported at exactly `path`.
    pub fn has_error_at(&self, path: &FieldPath) -> bool {
        self.0.iter().any(|error| &error.path == path)
    }

    /// Errors reported at exactly `path`.
    pub fn at(&self, path: &FieldPath) -> Vec<&FieldError> {
        self.0.iter().filter(|error| &error.path == path).collect()
    }

    /// Errors reported at `prefix` or anywhere below it.
    pub fn under(&self, prefix: &FieldPath) -> Vec<&FieldError> {
        self.0.iter().filter(|error| error.path.starts_with(prefix)).collect()
    }

    /// Re-addresses every error below `prefix`.
    pub fn prefixed(self, prefix: &FieldPath) -> Self {
        Self(self.0.into_iter().map(|error| error.prefixed(prefix)).collect())
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();
        f.write_str(&rendered.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_and_filters_by_path() {
        let errors = ValidationErrors::from(vec![
            FieldError::new(FieldPath::parse("url"), "required"),
            FieldError::new(FieldPath::parse("headers"), "invalid"),
        ])
        .prefixed(&FieldPath::parse("config"));

        assert_eq!(errors.len(), 2);
        assert!(errors.has_error_at(&FieldPath::parse("config.url")));
        assert_eq!(errors.under(&FieldPath::parse("config")).len(), 2);
        assert!(errors.under(&FieldPath::parse("providerConfig")).is_empty());
        assert_eq!(errors.to_string(), "config.url: required; config.headers: invalid");
    }

    #[test]
    fn serializes_path_as_text() {
        let error = FieldError::new(FieldPath::parse("config.password"), "Password is required");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, serde_json::json!({ "path": "config.password", "message": "Password is required" }));
    }
}
