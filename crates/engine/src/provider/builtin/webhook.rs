//! Generic HTTP callback target.

use std::sync::Arc;

use certloom_types::{ProviderKey, ProviderUsage};
use serde_json::{Map as JsonMap, Value, json};

use crate::i18n::{LocaleContext, Message};
use crate::provider::{DescriptorError, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps};
use crate::schema::{CustomRule, ObjectSchema, Schema};

pub const KEY: &str = "webhook";

pub const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

#[derive(Debug, Default, Clone, Copy)]
pub struct WebhookProvider;

pub fn descriptor() -> Arc<dyn ProviderDescriptor> {
    Arc::new(WebhookProvider)
}

impl ProviderDescriptor for WebhookProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from(KEY),
            name: "Webhook".into(),
            usages: vec![ProviderUsage::Notification, ProviderUsage::Deployment],
            builtin: false,
        }
    }

    /// Notification hosts get a body template; deployment hosts get the TLS toggle instead.
    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        let base = props.base_path;
        let locale = props.locale;
        let fields = FieldSet::new(self.key(), base.clone())
            .with(FieldNode::new(base, "url", locale.label("webhook.url"), FieldKind::Text).required())
            .with(
                FieldNode::new(
                    base,
                    "method",
                    locale.label("webhook.method"),
                    FieldKind::Select {
                        options: METHODS.iter().map(ToString::to_string).collect(),
                    },
                )
                .required(),
            )
            .with(FieldNode::new(base, "headers", locale.label("webhook.headers"), FieldKind::TextArea));
        match props.deps.usage() {
            Some(ProviderUsage::Notification) => fields.with(FieldNode::new(
                base,
                "payloadTemplate",
                locale.label("webhook.payload_template"),
                FieldKind::TextArea,
            )),
            _ => fields.with(FieldNode::new(
                base,
                "allowInsecureConnections",
                locale.label("webhook.allow_insecure"),
                FieldKind::Toggle,
            )),
        }
    }

    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        let locale = *locale;
        Ok(Schema::object(
            ObjectSchema::new()
                .field("url", Schema::string().trim().url().required_message(locale.please_enter("webhook.url")))
                .field("method", Schema::enumeration(METHODS).required_message(locale.please_select("webhook.method")))
                .field("headers", Schema::string().optional())
                .field("allowInsecureConnections", Schema::boolean().optional())
                .field("payloadTemplate", Schema::string().optional())
                .refine(CustomRule::new("webhook-headers", move |object| check_headers(object, &locale))),
        ))
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(Some(json!({ "url": "", "method": "POST" })))
    }
}

/// Each non-blank header line must be `Name: value` with a non-empty name.
fn check_headers(object: &JsonMap<String, Value>, locale: &LocaleContext) -> Vec<(String, String)> {
    let Some(headers) = object.get("headers").and_then(Value::as_str) else {
        return Vec::new();
    };
    headers
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .find(|(_, line)| line.split_once(':').is_none_or(|(name, _)| name.trim().is_empty()))
        .map(|(index, _)| vec![("headers".to_string(), locale.message(Message::InvalidHeaderLine { line: index + 1 }))])
        .unwrap_or_default()
}
