use std::net::IpAddr;

use certloom_types::{FieldError, FieldPath, ValidationErrors};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map as JsonMap, Value};

use super::{ArraySchema, NumberRules, ObjectSchema, Schema, SchemaKind, StringFormat, StringRules, UnknownKeys};
use crate::i18n::{LocaleContext, Message};

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]([A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?(\.[A-Za-z0-9_]([A-Za-z0-9_-]{0,61}[A-Za-z0-9_])?)*\.?$")
        .expect("hostname regex should compile")
});

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Validates `value` against `schema`, pushing failures into `errors`.
///
/// Returns the parsed output, or `None` when the value is absent (or invalid).
/// `null` is treated the same as an absent value.
pub(crate) fn validate_node(
    schema: &Schema,
    value: Option<&Value>,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    if let SchemaKind::Lazy(lazy) = schema.kind() {
        let mut resolved = lazy.resolve();
        if schema.is_optional() {
            resolved = resolved.optional();
        }
        return validate_node(&resolved, value, path, locale, errors);
    }
    if let SchemaKind::Any = schema.kind() {
        return value.cloned();
    }

    let value = match value {
        None | Some(Value::Null) => return missing(schema, path, locale, errors),
        Some(value) => value,
    };

    match schema.kind() {
        SchemaKind::String(rules) => validate_string(schema, rules, value, path, locale, errors),
        SchemaKind::Number(rules) => validate_number(schema, rules, value, path, locale, errors),
        SchemaKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => invalid(schema, path, locale, errors, Message::InvalidType { expected: "boolean" }),
        },
        SchemaKind::Enum(options) => match value {
            Value::String(text) if text.is_empty() => missing(schema, path, locale, errors),
            Value::String(text) if options.iter().any(|option| option == text) => Some(value.clone()),
            _ => invalid(schema, path, locale, errors, Message::InvalidEnum { options: options.as_slice() }),
        },
        SchemaKind::Object(object) => validate_object(schema, object, value, path, locale, errors),
        SchemaKind::Array(array) => validate_array(schema, array, value, path, locale, errors),
        SchemaKind::Any | SchemaKind::Lazy(_) => Some(value.clone()),
    }
}

fn missing(schema: &Schema, path: &FieldPath, locale: &LocaleContext, errors: &mut ValidationErrors) -> Option<Value> {
    if !schema.is_optional() {
        let message = schema
            .messages()
            .required
            .clone()
            .unwrap_or_else(|| locale.message(Message::Required));
        errors.push(FieldError::new(path.clone(), message));
    }
    None
}

fn invalid(
    schema: &Schema,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
    fallback: Message<'_>,
) -> Option<Value> {
    let message = schema.messages().invalid.clone().unwrap_or_else(|| locale.message(fallback));
    errors.push(FieldError::new(path.clone(), message));
    None
}

fn validate_string(
    schema: &Schema,
    rules: &StringRules,
    value: &Value,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let Value::String(raw) = value else {
        return invalid(schema, path, locale, errors, Message::InvalidType { expected: "string" });
    };
    let text = if rules.trim { raw.trim().to_string() } else { raw.clone() };

    if text.is_empty() {
        // An optional field left blank is kept as typed; format rules do not apply.
        if schema.is_optional() {
            return Some(Value::String(text));
        }
        return missing(schema, path, locale, errors);
    }

    let length = text.chars().count();
    if let Some(min) = rules.min_length
        && length < min
    {
        return invalid(schema, path, locale, errors, Message::TooShort { min });
    }
    if let Some(max) = rules.max_length
        && length > max
    {
        return invalid(schema, path, locale, errors, Message::TooLong { max });
    }
    if let Some(pattern) = &rules.pattern
        && !pattern.is_match(&text)
    {
        return invalid(schema, path, locale, errors, Message::PatternMismatch);
    }
    match rules.format {
        Some(StringFormat::Url) if !is_valid_url(&text) => invalid(schema, path, locale, errors, Message::InvalidUrl),
        Some(StringFormat::Hostname) if !is_valid_host(&text) => invalid(schema, path, locale, errors, Message::InvalidHostname),
        _ => Some(Value::String(text)),
    }
}

fn is_valid_url(text: &str) -> bool {
    url::Url::parse(text).map(|parsed| parsed.has_host()).unwrap_or(false)
}

fn is_valid_host(text: &str) -> bool {
    let unbracketed = text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')).unwrap_or(text);
    if unbracketed.parse::<IpAddr>().is_ok() {
        return true;
    }
    text.len() <= MAX_HOSTNAME_LENGTH && HOSTNAME_REGEX.is_match(text)
}

fn validate_number(
    schema: &Schema,
    rules: &NumberRules,
    value: &Value,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let (number, coerced) = match value {
        Value::Number(number) => (number.as_f64(), false),
        Value::String(text) if rules.coerce => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return missing(schema, path, locale, errors);
            }
            (trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite()), true)
        }
        _ => (None, false),
    };
    let Some(number) = number else {
        return invalid(schema, path, locale, errors, Message::InvalidType { expected: "number" });
    };

    if rules.integer && number.fract() != 0.0 {
        return invalid(schema, path, locale, errors, Message::NotInteger);
    }
    if let Some(min) = rules.minimum
        && number < min
    {
        return invalid(schema, path, locale, errors, Message::TooSmall { min });
    }
    if let Some(max) = rules.maximum
        && number > max
    {
        return invalid(schema, path, locale, errors, Message::TooBig { max });
    }

    if !coerced {
        return Some(value.clone());
    }
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(number as i64));
    }
    serde_json::Number::from_f64(number).map(Value::Number)
}

fn validate_object(
    schema: &Schema,
    object: &ObjectSchema,
    value: &Value,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let Value::Object(input) = value else {
        return invalid(schema, path, locale, errors, Message::InvalidType { expected: "object" });
    };

    let mut output = JsonMap::new();
    for (name, field_schema) in object.fields() {
        let field_path = path.child(name.as_str());
        if let Some(parsed) = validate_node(field_schema, input.get(name), &field_path, locale, errors) {
            output.insert(name.clone(), parsed);
        }
    }
    if object.unknown_keys() == UnknownKeys::Passthrough {
        for (name, member) in input {
            if !object.fields().contains_key(name) {
                output.insert(name.clone(), member.clone());
            }
        }
    }
    for refinement in object.refinements() {
        refinement.apply(input, path, locale, errors);
    }
    Some(Value::Object(output))
}

fn validate_array(
    schema: &Schema,
    array: &ArraySchema,
    value: &Value,
    path: &FieldPath,
    locale: &LocaleContext,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let Value::Array(items) = value else {
        return invalid(schema, path, locale, errors, Message::InvalidType { expected: "array" });
    };
    if let Some(min) = array.min_items
        && items.len() < min
    {
        return invalid(schema, path, locale, errors, Message::TooFewItems { min });
    }
    let output = items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_node(&array.items, Some(item), &path.index(index), locale, errors).unwrap_or(Value::Null))
        .collect();
    Some(Value::Array(output))
}
