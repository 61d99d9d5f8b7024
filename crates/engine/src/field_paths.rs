//! Shared helpers for resolving field paths against JSON values.
//!
//! These utilities back both the [`ConfigStore`](crate::store::ConfigStore)
//! implementation and field-set seeding so path semantics stay consistent.

use certloom_types::{FieldPath, PathSegment};
use serde_json::Value;

/// Resolve `path` against `value`, returning the addressed node if present.
///
/// `null` is reported as present; callers decide whether to treat it as absent.
pub fn value_at<'a>(value: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            // Numeric keys written into objects are addressed by their text form.
            (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`value_at`].
pub fn value_at_mut<'a>(value: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path.segments() {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            (PathSegment::Index(index), Value::Object(map)) => map.get_mut(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// True when the value counts as "not filled in" for requiredness checks:
/// absent, `null`, a blank string, or an empty list.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Returns the string at `field` of an object, if it is a string.
pub fn str_field<'a>(object: &'a serde_json::Map<String, Value>, field: &str) -> Option<&'a str> {
    object.get(field).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_objects_and_arrays() {
        let record = json!({
            "providerConfig": {
                "jumpServers": [{ "host": "bastion" }]
            }
        });
        let host = value_at(&record, &FieldPath::parse("providerConfig.jumpServers.0.host"));
        assert_eq!(host, Some(&json!("bastion")));
        assert!(value_at(&record, &FieldPath::parse("providerConfig.jumpServers.1")).is_none());
        assert!(value_at(&record, &FieldPath::parse("providerConfig.jumpServers.0.host.deeper")).is_none());
        assert_eq!(value_at(&record, &FieldPath::root()), Some(&record));
    }

    #[test]
    fn blank_detection_covers_empty_shapes() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!("   "))));
        assert!(is_blank(Some(&json!([]))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!(false))));
    }
}
