use std::sync::Arc;

use certloom_types::{ProviderKey, ProviderUsage};
use serde_json::Value;

use crate::i18n::LocaleContext;
use crate::provider::{DescriptorError, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps};
use crate::schema::{ObjectSchema, Schema};

pub const KEY: &str = "telegram";

/// Telegram bot notification channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelegramProvider;

pub fn descriptor() -> Arc<dyn ProviderDescriptor> {
    Arc::new(TelegramProvider)
}

impl ProviderDescriptor for TelegramProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from(KEY),
            name: "Telegram".into(),
            usages: vec![ProviderUsage::Notification],
            builtin: false,
        }
    }

    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        let base = props.base_path;
        FieldSet::new(self.key(), base.clone())
            .with(FieldNode::new(base, "botToken", props.locale.label("telegram.bot_token"), FieldKind::Secret).required())
            .with(FieldNode::new(base, "chatId", props.locale.label("telegram.chat_id"), FieldKind::Number))
    }

    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        Ok(Schema::object(
            ObjectSchema::new()
                .field("botToken", Schema::string().trim().required_message(locale.please_enter("telegram.bot_token")))
                // Group chat ids are negative.
                .field("chatId", Schema::number().integer().coerce().optional()),
        ))
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stores_numeric_looking_chat_ids_as_numbers() {
        let locale = LocaleContext::default();
        let schema = TelegramProvider.schema(&locale).unwrap();
        let output = schema
            .validate(&json!({ "botToken": "123:abc", "chatId": "-1001234567890" }), &locale)
            .expect("valid");
        assert_eq!(output, json!({ "botToken": "123:abc", "chatId": -1001234567890_i64 }));

        let errors = schema.validate(&json!({ "botToken": "t", "chatId": "@channel" }), &locale).unwrap_err();
        assert_eq!(errors.to_string(), "chatId: Expected number");
    }

    #[test]
    fn has_no_initial_values() {
        assert_eq!(TelegramProvider.initial_values().unwrap(), None);
    }
}
