//! SSH host target with optional jump-server chain.
//!
//! Every entry of `jumpServers` is validated by the same connection schema as
//! the top-level record, so the `authMethod` rule applies per hop.

use std::sync::Arc;

use certloom_types::{FieldPath, ProviderKey, ProviderUsage};
use serde_json::{Value, json};

use crate::i18n::LocaleContext;
use crate::provider::{DescriptorError, FieldKind, FieldNode, FieldSet, ProviderDescriptor, ProviderInfo, RenderProps};
use crate::schema::{DiscriminatedRule, ObjectSchema, Requirement, Schema};

pub const KEY: &str = "ssh";

pub const AUTH_METHODS: [&str; 3] = ["none", "password", "key"];

const MODE_FIELDS: &[&str] = &["authMethod"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SshProvider;

pub fn descriptor() -> Arc<dyn ProviderDescriptor> {
    Arc::new(SshProvider)
}

/// Schema of one SSH connection, recursive through `jumpServers`.
pub fn connection_schema(locale: &LocaleContext) -> Schema {
    let hop_locale = *locale;
    Schema::object(
        ObjectSchema::new()
            .field("host", Schema::string().trim().hostname().required_message(locale.please_enter("ssh.host")))
            .field("port", Schema::number().integer().minimum(1.0).maximum(65535.0).coerce().optional())
            .field("username", Schema::string().optional())
            .field(
                "authMethod",
                Schema::enumeration(AUTH_METHODS).required_message(locale.please_select("ssh.auth_method")),
            )
            .field("password", Schema::string().optional())
            .field("key", Schema::string().optional())
            .field("keyPassphrase", Schema::string().optional())
            .field(
                "jumpServers",
                Schema::array(Schema::lazy("sshConnection", move || connection_schema(&hop_locale))).optional(),
            )
            .refine(
                DiscriminatedRule::on("authMethod")
                    .when("password", [Requirement::present("password", locale.please_enter("ssh.password"))])
                    .when("key", [Requirement::present("key", locale.please_enter("ssh.key"))]),
            ),
    )
}

fn connection_fields(base: &FieldPath, auth_method: Option<&str>, locale: &LocaleContext) -> Vec<FieldNode> {
    let mut fields = vec![
        FieldNode::new(base, "host", locale.label("ssh.host"), FieldKind::Text).required(),
        FieldNode::new(base, "port", locale.label("ssh.port"), FieldKind::Number),
        FieldNode::new(base, "username", locale.label("ssh.username"), FieldKind::Text),
        FieldNode::new(
            base,
            "authMethod",
            locale.label("ssh.auth_method"),
            FieldKind::Select {
                options: AUTH_METHODS.iter().map(ToString::to_string).collect(),
            },
        )
        .required(),
    ];
    match auth_method {
        Some("password") => {
            fields.push(FieldNode::new(base, "password", locale.label("ssh.password"), FieldKind::Secret).required());
        }
        Some("key") => {
            fields.push(FieldNode::new(base, "key", locale.label("ssh.key"), FieldKind::Secret).required());
            fields.push(FieldNode::new(base, "keyPassphrase", locale.label("ssh.key_passphrase"), FieldKind::Secret));
        }
        _ => {}
    }
    fields
}

impl ProviderDescriptor for SshProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            key: ProviderKey::from(KEY),
            name: "SSH".into(),
            usages: vec![ProviderUsage::Hosting, ProviderUsage::Deployment],
            builtin: false,
        }
    }

    fn render_fields(&self, props: &RenderProps<'_>) -> FieldSet {
        let base = props.base_path;
        let mut field_set = FieldSet::new(self.key(), base.clone());
        field_set.fields = connection_fields(base, props.str_value("authMethod"), props.locale);

        // Hops choose their own auth method, so every mode field is listed.
        let mut hop = connection_fields(&FieldPath::root(), None, props.locale);
        hop.push(FieldNode::new(&FieldPath::root(), "password", props.locale.label("ssh.password"), FieldKind::Secret));
        hop.push(FieldNode::new(&FieldPath::root(), "key", props.locale.label("ssh.key"), FieldKind::Secret));
        hop.push(FieldNode::new(
            &FieldPath::root(),
            "keyPassphrase",
            props.locale.label("ssh.key_passphrase"),
            FieldKind::Secret,
        ));
        field_set.with(FieldNode::new(
            base,
            "jumpServers",
            props.locale.label("ssh.jump_servers"),
            FieldKind::List { item: hop },
        ))
    }

    fn schema(&self, locale: &LocaleContext) -> Result<Schema, DescriptorError> {
        Ok(connection_schema(locale))
    }

    fn initial_values(&self) -> Result<Option<Value>, DescriptorError> {
        Ok(Some(json!({ "host": "" })))
    }

    fn mode_fields(&self) -> &'static [&'static str] {
        MODE_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ConstructionProps, Deps};

    fn errors_for(value: Value) -> Vec<String> {
        let locale = LocaleContext::default();
        match SshProvider.schema(&locale).unwrap().validate(&value, &locale) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn password_mode_requires_password() {
        assert_eq!(
            errors_for(json!({ "host": "ssh.example.com", "authMethod": "password", "password": "" })),
            vec!["password: Please enter SSH password"]
        );
        assert!(errors_for(json!({ "host": "ssh.example.com", "authMethod": "password", "password": "s3cret" })).is_empty());
    }

    #[test]
    fn key_mode_keeps_typed_password_without_requiring_it() {
        let locale = LocaleContext::default();
        let output = SshProvider
            .schema(&locale)
            .unwrap()
            .validate(
                &json!({ "host": "10.0.0.2", "authMethod": "key", "password": "typed", "key": "-----BEGIN-----" }),
                &locale,
            )
            .expect("valid");
        assert_eq!(output["password"], json!("typed"));
    }

    #[test]
    fn validates_each_jump_server_independently() {
        let errors = errors_for(json!({
            "host": "target.example.com",
            "authMethod": "none",
            "jumpServers": [
                { "host": "hop1.example.com", "authMethod": "key", "key": "k" },
                { "host": "hop2.example.com", "authMethod": "password" },
                { "host": "hop3.example.com", "authMethod": "none", "jumpServers": [{ "host": "", "authMethod": "none" }] }
            ]
        }));
        assert_eq!(
            errors,
            vec![
                "jumpServers.1.password: Please enter SSH password",
                "jumpServers.2.jumpServers.0.host: Please enter SSH host",
            ]
        );
    }

    #[test]
    fn coerces_port_strings() {
        let locale = LocaleContext::default();
        let output = SshProvider
            .schema(&locale)
            .unwrap()
            .validate(&json!({ "host": "h.example.com", "port": "2222", "authMethod": "none" }), &locale)
            .expect("valid");
        assert_eq!(output["port"], json!(2222));
        assert_eq!(
            errors_for(json!({ "host": "h.example.com", "port": 0, "authMethod": "none" })),
            vec!["port: Must be greater than or equal to 1"]
        );
    }

    #[test]
    fn renders_only_fields_of_the_active_mode() {
        let base = FieldPath::parse("config");
        let render = |values: Value| {
            SshProvider
                .render_fields(&RenderProps {
                    base_path: &base,
                    values: Some(&values),
                    construction_props: &ConstructionProps::new(),
                    deps: &Deps::default(),
                    locale: &LocaleContext::default(),
                })
                .names()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert_eq!(render(json!({})), vec!["host", "port", "username", "authMethod", "jumpServers"]);
        assert!(render(json!({ "authMethod": "password" })).contains(&"password".to_string()));
        let key_mode = render(json!({ "authMethod": "key" }));
        assert!(key_mode.contains(&"keyPassphrase".to_string()));
        assert!(!key_mode.contains(&"password".to_string()));
    }

    #[test]
    fn description_resolves_jump_server_references() {
        let description = connection_schema(&LocaleContext::default()).describe();
        assert_eq!(
            description["properties"]["jumpServers"]["items"],
            json!({ "$ref": "#/definitions/sshConnection" })
        );
        let definition = &description["definitions"]["sshConnection"];
        assert_eq!(definition["properties"]["host"]["format"], json!("hostname"));
        assert_eq!(definition["properties"]["jumpServers"]["items"]["$ref"], json!("#/definitions/sshConnection"));
    }
}
