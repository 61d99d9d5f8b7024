//! Declarative validation schemas for provider configuration.
//!
//! A [`Schema`] is an immutable, cloneable tree describing the accepted shape
//! of a JSON value. Validation collects every failure as a
//! [`FieldError`](certloom_types::FieldError) addressed relative to the schema
//! root and, on success, returns the parsed output (coerced numbers, trimmed
//! strings, unknown object keys stripped unless the object passes them through).
//!
//! Modules:
//! - `refine`: object-level refinements, including discriminated sub-mode rules
//! - `validate`: the validator walking a schema against a value

mod refine;
mod validate;

use std::fmt;
use std::sync::Arc;

use certloom_types::{FieldPath, ValidationErrors};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map as JsonMap, Value, json};

use crate::i18n::LocaleContext;

pub use refine::{CustomRule, DiscriminatedRule, Refinement, Requirement};

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Url,
    Hostname,
}

impl StringFormat {
    fn as_str(self) -> &'static str {
        match self {
            StringFormat::Url => "url",
            StringFormat::Hostname => "hostname",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub format: Option<StringFormat>,
    pub trim: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NumberRules {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub integer: bool,
    /// Accept numeric-looking strings and store them as numbers.
    pub coerce: bool,
}

/// Policy for object members the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Drop undeclared members from the validated output.
    #[default]
    Strip,
    /// Copy undeclared members to the output untouched.
    Passthrough,
}

/// Object schema with ordered fields and post-validation refinements.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: IndexMap<String, Schema>,
    unknown_keys: UnknownKeys,
    refinements: Vec<Refinement>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn refine(mut self, refinement: impl Into<Refinement>) -> Self {
        self.refinements.push(refinement.into());
        self
    }

    pub fn passthrough(mut self) -> Self {
        self.unknown_keys = UnknownKeys::Passthrough;
        self
    }

    pub fn fields(&self) -> &IndexMap<String, Schema> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.fields.get(name)
    }

    pub fn refinements(&self) -> &[Refinement] {
        &self.refinements
    }

    pub fn unknown_keys(&self) -> UnknownKeys {
        self.unknown_keys
    }
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub items: Box<Schema>,
    pub min_items: Option<usize>,
}

type SchemaBuilder = dyn Fn() -> Schema + Send + Sync;

/// Named, lazily built schema used for recursive structures.
#[derive(Clone)]
pub struct LazySchema {
    name: String,
    build: Arc<SchemaBuilder>,
}

impl LazySchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolve(&self) -> Schema {
        (self.build)()
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySchema").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum SchemaKind {
    /// Accepts any value, including absence.
    Any,
    String(StringRules),
    Number(NumberRules),
    Boolean,
    /// Closed set of string literals.
    Enum(Vec<String>),
    Object(ObjectSchema),
    Array(ArraySchema),
    Lazy(LazySchema),
}

/// Custom message overrides for a schema node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMessages {
    pub required: Option<String>,
    pub invalid: Option<String>,
}

/// A node in a validation schema tree.
#[derive(Debug, Clone)]
pub struct Schema {
    kind: SchemaKind,
    optional: bool,
    messages: SchemaMessages,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            messages: SchemaMessages::default(),
        }
    }

    /// Accepts anything; always optional.
    pub fn any() -> Self {
        Self {
            optional: true,
            ..Self::of(SchemaKind::Any)
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number(NumberRules::default()))
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn enumeration<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::Enum(options.into_iter().map(Into::into).collect()))
    }

    pub fn object(object: ObjectSchema) -> Self {
        Self::of(SchemaKind::Object(object))
    }

    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array(ArraySchema {
            items: Box::new(items),
            min_items: None,
        }))
    }

    /// Defers construction until validation reaches this node.
    pub fn lazy<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Schema + Send + Sync + 'static,
    {
        Self::of(SchemaKind::Lazy(LazySchema {
            name: name.into(),
            build: Arc::new(build),
        }))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.messages.required = Some(message.into());
        self
    }

    pub fn invalid_message(mut self, message: impl Into<String>) -> Self {
        self.messages.invalid = Some(message.into());
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.min_length = Some(min);
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.max_length = Some(max);
        }
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.pattern = Some(pattern);
        }
        self
    }

    pub fn url(mut self) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.format = Some(StringFormat::Url);
        }
        self
    }

    pub fn hostname(mut self) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.format = Some(StringFormat::Hostname);
        }
        self
    }

    pub fn trim(mut self) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.trim = true;
        }
        self
    }

    pub fn integer(mut self) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.integer = true;
        }
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.minimum = Some(min);
        }
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.maximum = Some(max);
        }
        self
    }

    pub fn coerce(mut self) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.coerce = true;
        }
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        if let SchemaKind::Array(array) = &mut self.kind {
            array.min_items = Some(min);
        }
        self
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn messages(&self) -> &SchemaMessages {
        &self.messages
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Validates `value` and returns the parsed output.
    ///
    /// Error paths are relative to this schema's root. Built-in messages are
    /// resolved through `locale`; custom messages set on nodes take precedence.
    pub fn validate(&self, value: &Value, locale: &LocaleContext) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let output = validate::validate_node(self, Some(value), &FieldPath::root(), locale, &mut errors);
        if errors.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(errors)
        }
    }

    /// Locale-independent structural description in a JSON-Schema-like form.
    ///
    /// Two schemas with equal descriptions accept and reject the same shapes.
    /// Lazy nodes are emitted as `$ref`s into a `definitions` block at the root.
    pub fn describe(&self) -> Value {
        let mut definitions = JsonMap::new();
        let mut description = self.describe_node(&mut definitions);
        if !definitions.is_empty()
            && let Value::Object(root) = &mut description
        {
            root.insert("definitions".into(), Value::Object(definitions));
        }
        description
    }

    fn describe_node(&self, definitions: &mut JsonMap<String, Value>) -> Value {
        match &self.kind {
            SchemaKind::Any => json!({}),
            SchemaKind::String(rules) => {
                let mut out = JsonMap::new();
                out.insert("type".into(), json!("string"));
                if let Some(min) = rules.min_length {
                    out.insert("minLength".into(), json!(min));
                }
                if let Some(max) = rules.max_length {
                    out.insert("maxLength".into(), json!(max));
                }
                if let Some(pattern) = &rules.pattern {
                    out.insert("pattern".into(), json!(pattern.as_str()));
                }
                if let Some(format) = rules.format {
                    out.insert("format".into(), json!(format.as_str()));
                }
                Value::Object(out)
            }
            SchemaKind::Number(rules) => {
                let mut out = JsonMap::new();
                out.insert("type".into(), json!(if rules.integer { "integer" } else { "number" }));
                if let Some(min) = rules.minimum {
                    out.insert("minimum".into(), json!(min));
                }
                if let Some(max) = rules.maximum {
                    out.insert("maximum".into(), json!(max));
                }
                if rules.coerce {
                    out.insert("x-coerce".into(), json!(true));
                }
                Value::Object(out)
            }
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Enum(options) => json!({ "type": "string", "enum": options }),
            SchemaKind::Object(object) => {
                let properties = object
                    .fields
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.describe_node(definitions)))
                    .collect::<JsonMap<String, Value>>();
                let required = object
                    .fields
                    .iter()
                    .filter(|(_, schema)| !schema.optional)
                    .map(|(name, _)| json!(name))
                    .collect::<Vec<_>>();
                let mut out = JsonMap::new();
                out.insert("type".into(), json!("object"));
                out.insert("properties".into(), Value::Object(properties));
                out.insert("required".into(), Value::Array(required));
                out.insert(
                    "additionalProperties".into(),
                    json!(object.unknown_keys == UnknownKeys::Passthrough),
                );
                if !object.refinements.is_empty() {
                    let refinements = object.refinements.iter().map(Refinement::describe).collect::<Vec<_>>();
                    out.insert("x-refinements".into(), Value::Array(refinements));
                }
                Value::Object(out)
            }
            SchemaKind::Array(array) => {
                let mut out = JsonMap::new();
                out.insert("type".into(), json!("array"));
                out.insert("items".into(), array.items.describe_node(definitions));
                if let Some(min) = array.min_items {
                    out.insert("minItems".into(), json!(min));
                }
                Value::Object(out)
            }
            SchemaKind::Lazy(lazy) => {
                if !definitions.contains_key(&lazy.name) {
                    // Placeholder first so a self-referencing schema terminates.
                    definitions.insert(lazy.name.clone(), Value::Null);
                    let resolved = lazy.resolve().describe_node(definitions);
                    definitions.insert(lazy.name.clone(), resolved);
                }
                json!({ "$ref": format!("#/definitions/{}", lazy.name) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certloom_types::Locale;

    fn english() -> LocaleContext {
        LocaleContext::new(Locale::EnUs)
    }

    fn webhook_like() -> Schema {
        Schema::object(
            ObjectSchema::new()
                .field("url", Schema::string().url().required_message("Please enter webhook URL"))
                .field("method", Schema::enumeration(["GET", "POST"]))
                .field("retries", Schema::number().integer().minimum(0.0).coerce().optional()),
        )
    }

    #[test]
    fn collects_errors_for_every_failing_field() {
        let errors = webhook_like()
            .validate(&json!({ "url": "", "method": "PUT" }), &english())
            .expect_err("should fail");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.at(&FieldPath::parse("url"))[0].message, "Please enter webhook URL");
        assert_eq!(errors.at(&FieldPath::parse("method"))[0].message, "Must be one of: GET, POST");
    }

    #[test]
    fn strips_unknown_keys_and_coerces_numbers() {
        let output = webhook_like()
            .validate(
                &json!({ "url": "https://example.com/hook", "method": "POST", "retries": "3", "stale": true }),
                &english(),
            )
            .expect("valid");
        assert_eq!(output, json!({ "url": "https://example.com/hook", "method": "POST", "retries": 3 }));
    }

    #[test]
    fn passthrough_objects_keep_undeclared_members() {
        let schema = Schema::object(ObjectSchema::new().field("name", Schema::string()).passthrough());
        let output = schema.validate(&json!({ "name": "n", "extra": 1 }), &english()).expect("valid");
        assert_eq!(output, json!({ "name": "n", "extra": 1 }));
    }

    #[test]
    fn description_is_locale_independent() {
        let english_schema = Schema::string().required_message(english().please_enter("ssh.host"));
        let chinese_schema = Schema::string().required_message(LocaleContext::new(Locale::ZhCn).please_enter("ssh.host"));
        assert_eq!(english_schema.describe(), chinese_schema.describe());
    }

    #[test]
    fn describes_lazy_nodes_by_reference() {
        let schema = Schema::array(Schema::lazy("sshConnection", Schema::string));
        assert_eq!(
            schema.describe(),
            json!({
                "type": "array",
                "items": { "$ref": "#/definitions/sshConnection" },
                "definitions": { "sshConnection": { "type": "string" } }
            })
        );
    }

    fn chain() -> Schema {
        Schema::object(
            ObjectSchema::new()
                .field("host", Schema::string())
                .field("next", Schema::array(Schema::lazy("hop", chain)).optional()),
        )
    }

    #[test]
    fn recursive_definitions_are_emitted_once() {
        let description = chain().describe();
        let hop = &description["definitions"]["hop"];
        assert_eq!(hop["properties"]["next"]["items"], json!({ "$ref": "#/definitions/hop" }));
        assert!(hop.get("definitions").is_none());
        assert_eq!(description["properties"]["next"]["items"], json!({ "$ref": "#/definitions/hop" }));
    }

    #[test]
    fn any_schema_accepts_absence_and_arbitrary_values() {
        let schema = Schema::object(ObjectSchema::new().field("config", Schema::any()));
        assert!(schema.validate(&json!({}), &english()).is_ok());
        let output = schema.validate(&json!({ "config": { "x": [1, 2] } }), &english()).expect("valid");
        assert_eq!(output, json!({ "config": { "x": [1, 2] } }));
    }
}
