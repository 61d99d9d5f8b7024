//! Alibaba Cloud CDN deployment target.
//!
//! Two addressing modes: replace the certificate bound to CDN domains
//! (`resourceType = domain`, with a domain match pattern) or replace an
//! uploaded certificate by id (`resourceType = certificate`).

use std::sync::Arc;

use certloom_types::{ProviderKey, ProviderUsage};
use serde_json::{Map as JsonMap, Value, json};

use crate::field_paths::{is_blank, str_field};
use crate::i18n::{LocaleContext, Message};
use crate::provider::{DescriptorError, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps};
use crate::schema::{CustomRule, DiscriminatedRule, ObjectSchema, Requirement, Schema};

pub const KEY: &str = "aliyun-cdn";

pub const RESOURCE_TYPES: [&str; 2] = ["domain", "certificate"];
pub const DOMAIN_MATCH_PATTERNS: [&str; 3] = ["exact", "wildcard", "certsan"];

const MODE_FIELDS: &[&str] = &["resourceType", "domainMatchPattern"];

#[derive(Debug, Default, Clone, Copy)]
pub struct AliyunCdnProvider;

pub fn descriptor() -> Arc<dyn ProviderDescriptor> {
    Arc::new(AliyunCdnProvider)
}

fn select(options: &[&str]) -> FieldKind {
    FieldKind::Select {
        options: options.iter().map(ToString::to_string).collect(),
    }
}

impl ProviderDescriptor for AliyunCdnProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from(KEY),
            name: "Alibaba Cloud CDN".into(),
            usages: vec![ProviderUsage::Deployment],
            builtin: false,
        }
    }

    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        let base = props.base_path;
        let locale = props.locale;
        let mut field_set = FieldSet::new(self.key(), base.clone()).with(
            FieldNode::new(base, "resourceType", locale.label("aliyun_cdn.resource_type"), select(&RESOURCE_TYPES)).required(),
        );
        match props.str_value("resourceType") {
            Some("domain") => {
                field_set = field_set.with(
                    FieldNode::new(
                        base,
                        "domainMatchPattern",
                        locale.label("aliyun_cdn.domain_match_pattern"),
                        select(&DOMAIN_MATCH_PATTERNS),
                    )
                    .required(),
                );
                if props.str_value("domainMatchPattern") != Some("certsan") {
                    field_set = field_set.with(FieldNode::new(base, "domain", locale.label("aliyun_cdn.domain"), FieldKind::Text).required());
                }
            }
            Some("certificate") => {
                field_set = field_set.with(
                    FieldNode::new(base, "certificateId", locale.label("aliyun_cdn.certificate_id"), FieldKind::Text).required(),
                );
            }
            _ => {}
        }
        field_set
    }

    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        let rule_locale = *locale;
        Ok(Schema::object(
            ObjectSchema::new()
                .field(
                    "resourceType",
                    Schema::enumeration(RESOURCE_TYPES).required_message(locale.please_select("aliyun_cdn.resource_type")),
                )
                .field("domainMatchPattern", Schema::enumeration(DOMAIN_MATCH_PATTERNS).optional())
                .field("domain", Schema::string().trim().optional())
                .field("certificateId", Schema::string().trim().optional())
                .refine(
                    DiscriminatedRule::on("resourceType")
                        .when(
                            "domain",
                            [Requirement::matching(
                                "domainMatchPattern",
                                Schema::enumeration(DOMAIN_MATCH_PATTERNS)
                                    .required_message(locale.please_select("aliyun_cdn.domain_match_pattern")),
                            )],
                        )
                        .when(
                            "certificate",
                            [Requirement::present("certificateId", locale.please_enter("aliyun_cdn.certificate_id"))],
                        ),
                )
                .refine(CustomRule::new("aliyun-cdn-domain", move |object| check_domain(object, &rule_locale))),
        ))
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(Some(json!({ "resourceType": "domain", "domainMatchPattern": "exact" })))
    }

    fn mode_fields(&self) -> &'static [&'static str] {
        MODE_FIELDS
    }
}

/// `domain` depends on two mode fields at once, so it is checked here rather
/// than by the single-discriminator rule.
fn check_domain(object: &JsonMap<String, Value>, locale: &LocaleContext) -> Vec<(String, String)> {
    if str_field(object, "resourceType") != Some("domain") {
        return Vec::new();
    }
    let pattern = str_field(object, "domainMatchPattern");
    if pattern == Some("certsan") {
        return Vec::new();
    }
    let domain = object.get("domain");
    if is_blank(domain) {
        return vec![("domain".into(), locale.please_enter("aliyun_cdn.domain"))];
    }
    match (pattern, domain.and_then(Value::as_str)) {
        (Some("wildcard"), Some(domain)) if !domain.trim().starts_with("*.") => {
            vec![("domain".into(), locale.message(Message::WildcardDomainExpected))]
        }
        _ => Vec::new(),
    }
}
