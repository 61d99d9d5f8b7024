//! Object-level refinements evaluated after field validation.
//!
//! Refinements only ever see the object they are attached to. Their failures
//! are reported through the same [`ValidationErrors`] channel as ordinary field
//! rules, addressed at `<object path>.<field>`.

use std::fmt;
use std::sync::Arc;

use certloom_types::{FieldError, FieldPath, ValidationErrors};
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value, json};

use super::Schema;
use super::validate::validate_node;
use crate::field_paths::{is_blank, str_field};
use crate::i18n::LocaleContext;

/// A sibling field that must satisfy a check for one discriminator value.
#[derive(Debug, Clone)]
pub struct Requirement {
    field: String,
    check: RequirementCheck,
}

#[derive(Debug, Clone)]
enum RequirementCheck {
    /// Present and not blank; reports `message` otherwise.
    Present { message: String },
    /// Must validate against the schema; a blank value is reported by the schema itself.
    Schema(Box<Schema>),
}

impl Requirement {
    /// The field must be filled in.
    pub fn present(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            check: RequirementCheck::Present {
                message: message.into(),
            },
        }
    }

    /// The field must validate against `schema`.
    pub fn matching(field: impl Into<String>, schema: Schema) -> Self {
        Self {
            field: field.into(),
            check: RequirementCheck::Schema(Box::new(schema)),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Requiredness of sibling fields selected by the value of one mode field.
///
/// The discriminator itself is validated by its own field schema (usually a
/// closed enum); this rule only decides which siblings become mandatory.
/// Values of fields belonging to other modes are never touched.
#[derive(Debug, Clone)]
pub struct DiscriminatedRule {
    discriminator: String,
    cases: IndexMap<String, Vec<Requirement>>,
}

impl DiscriminatedRule {
    pub fn on(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            cases: IndexMap::new(),
        }
    }

    pub fn when(mut self, value: impl Into<String>, requirements: impl IntoIterator<Item = Requirement>) -> Self {
        self.cases.entry(value.into()).or_default().extend(requirements);
        self
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Names of fields required while the discriminator equals `value`.
    pub fn required_fields(&self, value: &str) -> Vec<&str> {
        self.cases
            .get(value)
            .map(|requirements| requirements.iter().map(Requirement::field).collect())
            .unwrap_or_default()
    }

    fn apply(&self, object: &JsonMap<String, Value>, path: &FieldPath, locale: &LocaleContext, errors: &mut ValidationErrors) {
        let Some(mode) = str_field(object, &self.discriminator) else {
            return;
        };
        let Some(requirements) = self.cases.get(mode) else {
            return;
        };
        for requirement in requirements {
            let field_path = path.child(requirement.field.as_str());
            if errors.has_error_at(&field_path) {
                continue;
            }
            let value = object.get(&requirement.field);
            match &requirement.check {
                RequirementCheck::Present { message } => {
                    if is_blank(value) {
                        errors.push(FieldError::new(field_path, message.clone()));
                    }
                }
                RequirementCheck::Schema(schema) => {
                    validate_node(schema, value, &field_path, locale, errors);
                }
            }
        }
    }

    fn describe(&self) -> Value {
        let cases = self
            .cases
            .iter()
            .map(|(value, requirements)| {
                let fields = requirements.iter().map(|requirement| json!(requirement.field)).collect::<Vec<_>>();
                (value.clone(), Value::Array(fields))
            })
            .collect::<JsonMap<String, Value>>();
        json!({ "discriminator": self.discriminator, "cases": cases })
    }
}

type CustomCheck = dyn Fn(&JsonMap<String, Value>) -> Vec<(String, String)> + Send + Sync;

/// Arbitrary object-level check returning `(field, message)` pairs.
#[derive(Clone)]
pub struct CustomRule {
    name: String,
    check: Arc<CustomCheck>,
}

impl CustomRule {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&JsonMap<String, Value>) -> Vec<(String, String)> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    fn apply(&self, object: &JsonMap<String, Value>, path: &FieldPath, errors: &mut ValidationErrors) {
        for (field, message) in (self.check)(object) {
            let field_path = path.child(field);
            if !errors.has_error_at(&field_path) {
                errors.push(FieldError::new(field_path, message));
            }
        }
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Refinement {
    Discriminated(DiscriminatedRule),
    Custom(CustomRule),
}

impl Refinement {
    pub(super) fn apply(&self, object: &JsonMap<String, Value>, path: &FieldPath, locale: &LocaleContext, errors: &mut ValidationErrors) {
        match self {
            Refinement::Discriminated(rule) => rule.apply(object, path, locale, errors),
            Refinement::Custom(rule) => rule.apply(object, path, errors),
        }
    }

    pub(super) fn describe(&self) -> Value {
        match self {
            Refinement::Discriminated(rule) => rule.describe(),
            Refinement::Custom(rule) => json!({ "custom": rule.name }),
        }
    }
}

impl From<DiscriminatedRule> for Refinement {
    fn from(rule: DiscriminatedRule) -> Self {
        Refinement::Discriminated(rule)
    }
}

impl From<CustomRule> for Refinement {
    fn from(rule: CustomRule) -> Self {
        Refinement::Custom(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ObjectSchema;
    use certloom_types::Locale;

    fn auth_schema() -> Schema {
        Schema::object(
            ObjectSchema::new()
                .field("authMethod", Schema::enumeration(["none", "password", "key"]))
                .field("password", Schema::string().optional())
                .field("key", Schema::string().optional())
                .refine(
                    DiscriminatedRule::on("authMethod")
                        .when("password", [Requirement::present("password", "Please enter SSH password")])
                        .when("key", [Requirement::present("key", "Please enter SSH private key")]),
                ),
        )
    }

    #[test]
    fn requires_only_fields_of_the_active_mode() {
        let locale = LocaleContext::new(Locale::EnUs);
        let errors = auth_schema()
            .validate(&json!({ "authMethod": "password", "password": "" }), &locale)
            .expect_err("password missing");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().path.to_string(), "password");

        let output = auth_schema()
            .validate(&json!({ "authMethod": "key", "password": "typed", "key": "---KEY---" }), &locale)
            .expect("key mode ignores password");
        assert_eq!(output["password"], json!("typed"));
    }

    #[test]
    fn skips_requirements_for_unknown_or_missing_mode() {
        let locale = LocaleContext::default();
        let errors = auth_schema().validate(&json!({ "authMethod": "token" }), &locale).expect_err("bad mode");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().path.to_string(), "authMethod");
    }

    #[test]
    fn custom_rules_do_not_duplicate_field_errors() {
        let locale = LocaleContext::default();
        let schema = Schema::object(
            ObjectSchema::new()
                .field("domain", Schema::string().required_message("domain required"))
                .refine(CustomRule::new("domain-required", |_| vec![("domain".into(), "again".into())])),
        );
        let errors = schema.validate(&json!({}), &locale).expect_err("missing domain");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.iter().next().unwrap().message, "domain required");
    }

    #[test]
    fn lists_required_fields_per_mode() {
        let rule = DiscriminatedRule::on("format").when("PEM", [Requirement::present("keyPath", "x")]);
        assert_eq!(rule.required_fields("PEM"), vec!["keyPath"]);
        assert!(rule.required_fields("PFX").is_empty());
    }
}
