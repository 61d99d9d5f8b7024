//! Field paths addressing values inside a host record.
//!
//! A [`FieldPath`] is the explicit replacement for ambient "nested fields"
//! context: every field-set receives its base path as an argument and composes
//! child paths from it. Paths render as dotted text (`config.jumpServers.0.host`)
//! and the root path renders as the empty string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array position.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// Ordered address of a value inside a JSON-like record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path addressing the record itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from pre-split segments.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parses dotted text. Purely numeric segments become array indices;
    /// empty segments are ignored so `""` and `"."` both yield the root.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with an object member appended.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// Returns a new path with an array position appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Concatenates `other` after `self`.
    pub fn join(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// True when `prefix` addresses this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Removes `prefix` from the front, yielding the relative remainder.
    pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<Self> {
        self.segments.strip_prefix(prefix.segments.as_slice()).map(|rest| Self {
            segments: rest.to_vec(),
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_text_with_indices() {
        let path = FieldPath::parse("config.jumpServers.0.host");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("config".into()),
                PathSegment::Key("jumpServers".into()),
                PathSegment::Index(0),
                PathSegment::Key("host".into()),
            ]
        );
        assert_eq!(path.to_string(), "config.jumpServers.0.host");
    }

    #[test]
    fn root_renders_empty_and_ignores_blank_segments() {
        assert!(FieldPath::parse("").is_root());
        assert!(FieldPath::parse(".").is_root());
        assert_eq!(FieldPath::root().to_string(), "");
        assert_eq!(FieldPath::parse("a..b").to_string(), "a.b");
    }

    #[test]
    fn child_and_prefix_helpers_compose() {
        let base = FieldPath::parse("providerConfig");
        let field = base.child("password");
        assert_eq!(field.to_string(), "providerConfig.password");
        assert!(field.starts_with(&base));
        assert_eq!(field.strip_prefix(&base), Some(FieldPath::parse("password")));
        assert_eq!(field.parent(), Some(base.clone()));
        assert!(!base.starts_with(&field));
        assert_eq!(FieldPath::root().join(&field), field);
    }

    #[test]
    fn serializes_as_dotted_string() {
        let path = FieldPath::root().child("hops").index(2);
        let json = serde_json::to_string(&path).expect("serialize path");
        assert_eq!(json, "\"hops.2\"");
        let back: FieldPath = serde_json::from_str(&json).expect("deserialize path");
        assert_eq!(back, path);
    }
}
