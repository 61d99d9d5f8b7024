//! Explicit, path-addressed access to the host record being edited.
//!
//! Field-sets never share a mutable form controller; they receive a
//! `&mut dyn ConfigStore` and read or write values by [`FieldPath`].

use certloom_types::{FieldPath, PathSegment};
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

use crate::field_paths::{value_at, value_at_mut};

/// Errors raised while writing into a [`ConfigStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("cannot write '{path}': '{parent}' holds a scalar value")]
    NotAContainer { path: FieldPath, parent: FieldPath },

    #[error("cannot write '{path}': index {index} is past the end of a list of {len} items")]
    IndexOutOfBounds { path: FieldPath, index: usize, len: usize },

    #[error("cannot replace the record root with a non-object value")]
    RootNotObject,
}

/// Read/write access to a JSON-like record by field path.
pub trait ConfigStore {
    /// Returns the value at `path`, or `None` when absent.
    fn get(&self, path: &FieldPath) -> Option<&Value>;

    /// Writes `value` at `path`, creating intermediate objects or lists.
    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), StoreError>;

    /// Removes the subtree at `path` so it reads as absent. Returns the removed value.
    fn reset(&mut self, path: &FieldPath) -> Option<Value>;

    /// A copy of the whole record.
    fn snapshot(&self) -> Value;

    fn contains(&self, path: &FieldPath) -> bool {
        self.get(path).is_some()
    }
}

/// [`ConfigStore`] backed by an in-memory JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonConfigStore {
    root: Value,
}

impl Default for JsonConfigStore {
    fn default() -> Self {
        Self {
            root: Value::Object(JsonMap::new()),
        }
    }
}

impl JsonConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing record. Non-object records are rejected.
    pub fn from_value(root: Value) -> Result<Self, StoreError> {
        if root.is_object() {
            Ok(Self { root })
        } else {
            Err(StoreError::RootNotObject)
        }
    }

    pub fn into_value(self) -> Value {
        self.root
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, path: &FieldPath) -> Option<&Value> {
        value_at(&self.root, path)
    }

    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), StoreError> {
        let Some((last, parents)) = path.segments().split_last() else {
            return match value {
                Value::Object(_) => {
                    self.root = value;
                    Ok(())
                }
                _ => Err(StoreError::RootNotObject),
            };
        };

        let mut current = &mut self.root;
        let mut walked = FieldPath::root();
        for (position, segment) in parents.iter().enumerate() {
            // The container kind for a missing node is decided by the segment that follows it.
            let next = parents.get(position + 1).unwrap_or(last);
            current = descend(current, segment, next, path, &walked)?;
            walked = FieldPath::from_segments(parents[..=position].iter().cloned());
        }
        write_leaf(current, last, value, path, &walked)
    }

    fn reset(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, _) = path.segments().split_last()?;
        let parent = path.parent()?;
        match (value_at_mut(&mut self.root, &parent)?, last) {
            (Value::Object(map), PathSegment::Key(key)) => map.remove(key),
            (Value::Object(map), PathSegment::Index(index)) => map.remove(&index.to_string()),
            (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
                // Removing would shift later entries onto other paths; blank the slot instead.
                Some(std::mem::replace(&mut items[*index], Value::Null))
            }
            _ => None,
        }
    }

    fn snapshot(&self) -> Value {
        self.root.clone()
    }
}

fn empty_container_for(segment: &PathSegment) -> Value {
    match segment {
        PathSegment::Key(_) => Value::Object(JsonMap::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    }
}

fn descend<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    next: &PathSegment,
    path: &FieldPath,
    walked: &FieldPath,
) -> Result<&'a mut Value, StoreError> {
    if current.is_null() {
        *current = empty_container_for(segment);
    }
    match (current, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            let slot = map.entry(key.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = empty_container_for(next);
            }
            Ok(slot)
        }
        (Value::Object(map), PathSegment::Index(index)) => {
            let slot = map.entry(index.to_string()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = empty_container_for(next);
            }
            Ok(slot)
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            if *index > len {
                return Err(StoreError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                    len,
                });
            }
            if *index == len {
                items.push(empty_container_for(next));
            }
            let slot = &mut items[*index];
            if slot.is_null() {
                *slot = empty_container_for(next);
            }
            Ok(slot)
        }
        _ => Err(StoreError::NotAContainer {
            path: path.clone(),
            parent: walked.clone(),
        }),
    }
}

fn write_leaf(current: &mut Value, last: &PathSegment, value: Value, path: &FieldPath, walked: &FieldPath) -> Result<(), StoreError> {
    if current.is_null() {
        *current = empty_container_for(last);
    }
    match (current, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Object(map), PathSegment::Index(index)) => {
            map.insert(index.to_string(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            match (*index).cmp(&len) {
                std::cmp::Ordering::Less => items[*index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => {
                    return Err(StoreError::IndexOutOfBounds {
                        path: path.clone(),
                        index: *index,
                        len,
                    });
                }
            }
            Ok(())
        }
        _ => Err(StoreError::NotAContainer {
            path: path.clone(),
            parent: walked.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_containers() {
        let mut store = JsonConfigStore::new();
        store
            .set(&FieldPath::parse("providerConfig.jumpServers.0.host"), json!("bastion"))
            .expect("write nested value");
        assert_eq!(
            store.snapshot(),
            json!({ "providerConfig": { "jumpServers": [{ "host": "bastion" }] } })
        );
    }

    #[test]
    fn set_refuses_to_traverse_scalars_and_gaps() {
        let mut store = JsonConfigStore::from_value(json!({ "config": "flat", "list": [] })).unwrap();
        let error = store.set(&FieldPath::parse("config.url"), json!("x")).unwrap_err();
        assert_eq!(
            error,
            StoreError::NotAContainer {
                path: FieldPath::parse("config.url"),
                parent: FieldPath::parse("config"),
            }
        );
        assert!(matches!(
            store.set(&FieldPath::parse("list.3"), json!(1)),
            Err(StoreError::IndexOutOfBounds { index: 3, len: 0, .. })
        ));
    }

    #[test]
    fn reset_makes_subtree_absent() {
        let mut store = JsonConfigStore::from_value(json!({ "providerKey": "webhook", "config": { "url": "x" } })).unwrap();
        let removed = store.reset(&FieldPath::parse("config"));
        assert_eq!(removed, Some(json!({ "url": "x" })));
        assert!(!store.contains(&FieldPath::parse("config")));
        assert_eq!(store.snapshot(), json!({ "providerKey": "webhook" }));
        assert_eq!(store.reset(&FieldPath::parse("config")), None);
    }

    #[test]
    fn root_must_stay_an_object() {
        assert_eq!(JsonConfigStore::from_value(json!([])).unwrap_err(), StoreError::RootNotObject);
        let mut store = JsonConfigStore::new();
        assert_eq!(store.set(&FieldPath::root(), json!(1)).unwrap_err(), StoreError::RootNotObject);
    }
}
