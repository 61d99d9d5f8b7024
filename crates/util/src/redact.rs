//! Masking of secret values before records are printed or logged.

use certloom_types::{FieldPath, PathSegment};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const REDACTED: &str = "<redacted>";

static SENSITIVE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^secret|(password|passphrase|secret|token|apikey|accesskey|privatekey|secretkey)$|^key$")
        .expect("sensitive key regex should compile")
});

/// Whether an object member named `key` holds a secret.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

/// Returns a copy of `value` with every non-empty string under a sensitive key masked.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, member)| {
                    let masked = match member {
                        Value::String(text) if is_sensitive_key(key) && !text.is_empty() => Value::String(REDACTED.to_string()),
                        other => redact_json(other),
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Returns a copy of `value` with the non-empty strings at `paths` masked,
/// whatever their member names. Pair with the secret fields a provider renders.
pub fn redact_paths(value: &Value, paths: &[FieldPath]) -> Value {
    let mut redacted = value.clone();
    for path in paths {
        if let Some(Value::String(text)) = member_mut(&mut redacted, path)
            && !text.is_empty()
        {
            *text = REDACTED.to_string();
        }
    }
    redacted
}

fn member_mut<'a>(value: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    path.segments().iter().try_fold(value, |current, segment| match (segment, current) {
        (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key),
        (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_secret_members_at_any_depth() {
        let record = json!({
            "providerKey": "ssh",
            "config": {
                "password": "hunter2",
                "key": "-----BEGIN-----",
                "keyPassphrase": "",
                "jumpServers": [{ "host": "hop", "password": "p" }]
            }
        });
        assert_eq!(
            redact_json(&record),
            json!({
                "providerKey": "ssh",
                "config": {
                    "password": REDACTED,
                    "key": REDACTED,
                    "keyPassphrase": "",
                    "jumpServers": [{ "host": "hop", "password": REDACTED }]
                }
            })
        );
    }

    #[test]
    fn recognises_common_secret_names() {
        assert!(is_sensitive_key("botToken"));
        assert!(is_sensitive_key("pfxPassword"));
        assert!(!is_sensitive_key("providerKey"));
        assert!(!is_sensitive_key("credentialRef"));
        assert!(is_sensitive_key("secretAccessKey"));
        assert!(is_sensitive_key("accessKey"));
        assert!(is_sensitive_key("secretId"));
        assert!(!is_sensitive_key("accessKeyId"));
    }

    #[test]
    fn masks_declared_secret_paths_regardless_of_name() {
        let record = json!({ "providerConfig": { "signature": "abc", "host": "h", "list": ["x"] } });
        let paths = [
            FieldPath::parse("providerConfig.signature"),
            FieldPath::parse("providerConfig.missing"),
            FieldPath::parse("providerConfig.list.0"),
        ];
        assert_eq!(
            redact_paths(&record, &paths),
            json!({ "providerConfig": { "signature": REDACTED, "host": "h", "list": [REDACTED] } })
        );
    }
}
