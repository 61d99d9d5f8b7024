//! Writes certificates to the local file system. Built-in: needs no credential.

use std::sync::Arc;

use certloom_types::{ProviderKey, ProviderUsage};
use serde_json::{Value, json};

use crate::i18n::LocaleContext;
use crate::provider::{DescriptorError, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps};
use crate::schema::{DiscriminatedRule, ObjectSchema, Requirement, Schema};

pub const KEY: &str = "local";

pub const FORMATS: [&str; 2] = ["PEM", "PFX"];

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProvider;

pub fn descriptor() -> Arc<dyn ProviderDescriptor> {
    Arc::new(LocalProvider)
}

impl ProviderDescriptor for LocalProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from(KEY),
            name: "Local".into(),
            usages: vec![ProviderUsage::Deployment],
            builtin: true,
        }
    }

    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        let base = props.base_path;
        let locale = props.locale;
        let mut field_set = FieldSet::new(self.key(), base.clone())
            .with(
                FieldNode::new(
                    base,
                    "format",
                    locale.label("local.format"),
                    FieldKind::Select {
                        options: FORMATS.iter().map(ToString::to_string).collect(),
                    },
                )
                .required(),
            )
            .with(FieldNode::new(base, "certPath", locale.label("local.cert_path"), FieldKind::Text).required());
        match props.str_value("format") {
            Some("PEM") => {
                field_set = field_set.with(FieldNode::new(base, "keyPath", locale.label("local.key_path"), FieldKind::Text).required());
            }
            Some("PFX") => {
                field_set = field_set.with(FieldNode::new(base, "pfxPassword", locale.label("local.pfx_password"), FieldKind::Secret).required());
            }
            _ => {}
        }
        field_set
            .with(FieldNode::new(base, "preCommand", locale.label("local.pre_command"), FieldKind::TextArea))
            .with(FieldNode::new(base, "postCommand", locale.label("local.post_command"), FieldKind::TextArea))
    }

    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        Ok(Schema::object(
            ObjectSchema::new()
                .field("format", Schema::enumeration(FORMATS).required_message(locale.please_select("local.format")))
                .field("certPath", Schema::string().trim().required_message(locale.please_enter("local.cert_path")))
                .field("keyPath", Schema::string().trim().optional())
                .field("pfxPassword", Schema::string().optional())
                .field("preCommand", Schema::string().optional())
                .field("postCommand", Schema::string().optional())
                .refine(
                    DiscriminatedRule::on("format")
                        .when("PEM", [Requirement::present("keyPath", locale.please_enter("local.key_path"))])
                        .when("PFX", [Requirement::present("pfxPassword", locale.please_enter("local.pfx_password"))]),
                ),
        ))
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(Some(json!({ "format": "PEM" })))
    }

    fn mode_fields(&self) -> &'static [&'static str] {
        &["format"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(value: Value) -> Vec<String> {
        let locale = LocaleContext::default();
        LocalProvider
            .schema(&locale)
            .unwrap()
            .validate(&value, &locale)
            .err()
            .map(|errors| errors.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn format_decides_which_secret_is_required() {
        assert_eq!(
            errors_for(json!({ "format": "PEM", "certPath": "/etc/ssl/cert.pem" })),
            vec!["keyPath: Please enter private key file path"]
        );
        assert_eq!(
            errors_for(json!({ "format": "PFX", "certPath": "/etc/ssl/cert.pfx", "keyPath": "" })),
            vec!["pfxPassword: Please enter PFX password"]
        );
        assert!(errors_for(json!({ "format": "PFX", "certPath": "/etc/ssl/cert.pfx", "pfxPassword": "p" })).is_empty());
    }

    #[test]
    fn is_builtin() {
        assert!(LocalProvider.info().builtin);
    }
}
