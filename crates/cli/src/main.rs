use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use certloom_engine::field_paths::value_at;
use certloom_engine::{
    Deps, HostForm, HostSchemaOptions, InstantiateOptions, LocaleContext, ProviderRegistry, RecordSink, SubmitError, compose_schema,
};
use certloom_types::{FieldPath, HostKind, Locale, ProviderUsage, ValidationErrors};
use certloom_util::{Settings, expand_tilde, redact_json, redact_paths};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Value, json};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().unwrap_or_default();
    init_tracing(&settings);

    let matches = build_cli().get_matches();
    let locale = LocaleContext::new(matches.get_one::<Locale>("locale").copied().unwrap_or_else(|| settings.locale()));
    let registry = Arc::new(ProviderRegistry::with_builtin_providers());
    debug!(providers = registry.len(), locale = %locale.locale(), "registry ready");

    match matches.subcommand() {
        Some(("providers", sub)) => list_providers(&registry, sub),
        Some(("schema", sub)) => print_schema(&registry, sub, host_kind(sub, &settings), &locale),
        Some(("defaults", sub)) => print_defaults(&registry, sub),
        Some(("fields", sub)) => print_fields(&registry, sub, host_kind(sub, &settings), &locale),
        Some(("validate", sub)) => validate_record(&registry, sub, host_kind(sub, &settings), &locale),
        Some(("submit", sub)) => submit_record(registry, sub, host_kind(sub, &settings), locale).await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| settings.log_filter.clone())
        .unwrap_or_else(|| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    let host = || {
        Arg::new("host")
            .long("host")
            .action(ArgAction::Set)
            .value_parser(|text: &str| text.parse::<HostKind>())
            .help("Host record kind: access or deploy (defaults to the settings file)")
    };
    let key = || Arg::new("key").required(true).help("Provider key, for example webhook or ssh");
    let usage = || {
        Arg::new("usage")
            .long("usage")
            .action(ArgAction::Set)
            .value_parser(|text: &str| text.parse::<ProviderUsage>())
    };
    let file = || {
        Arg::new("file")
            .long("file")
            .short('f')
            .required(true)
            .action(ArgAction::Set)
            .help("Path to a JSON host record")
    };

    Command::new("certloom")
        .about("Inspect provider schemas and validate provider configuration records")
        .arg(
            Arg::new("locale")
                .long("locale")
                .global(true)
                .action(ArgAction::Set)
                .value_parser(|text: &str| text.parse::<Locale>())
                .help("Message locale, for example en-US or zh-CN"),
        )
        .subcommand(
            Command::new("providers")
                .about("List registered providers")
                .arg(usage().help("Only list providers supporting this usage")),
        )
        .subcommand(Command::new("schema").about("Print the composed host schema for a provider").arg(key()).arg(host()))
        .subcommand(Command::new("defaults").about("Print a provider's initial values").arg(key()))
        .subcommand(
            Command::new("fields")
                .about("Print the field-set a provider renders with its defaults")
                .arg(key())
                .arg(host())
                .arg(usage().help("Host usage mode the field-set is rendered for")),
        )
        .subcommand(Command::new("validate").about("Validate a stored host record").arg(file()).arg(host()))
        .subcommand(Command::new("submit").about("Validate a host record and dispatch it to stdout").arg(file()).arg(host()))
}

fn host_kind(matches: &ArgMatches, settings: &Settings) -> HostKind {
    matches.get_one::<HostKind>("host").copied().unwrap_or_else(|| settings.host())
}

fn required_key(matches: &ArgMatches) -> Result<&str> {
    matches.get_one::<String>("key").map(String::as_str).context("missing provider key")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list_providers(registry: &ProviderRegistry, matches: &ArgMatches) -> Result<()> {
    let usage = matches.get_one::<ProviderUsage>("usage").copied();
    print_json(&serde_json::to_value(registry.infos(usage))?)
}

fn print_schema(registry: &ProviderRegistry, matches: &ArgMatches, kind: HostKind, locale: &LocaleContext) -> Result<()> {
    let key = required_key(matches)?;
    let composed = compose_schema(registry, &HostSchemaOptions::for_host(kind), Some(key), locale);
    print_json(&json!({
        "host": kind,
        "source": composed.source(),
        "schema": composed.describe(),
    }))
}

fn print_defaults(registry: &ProviderRegistry, matches: &ArgMatches) -> Result<()> {
    let key = required_key(matches)?;
    if !registry.contains(key) {
        anyhow::bail!("unknown provider '{key}'");
    }
    print_json(&registry.initial_values_for(key).unwrap_or(Value::Null))
}

fn print_fields(registry: &ProviderRegistry, matches: &ArgMatches, kind: HostKind, locale: &LocaleContext) -> Result<()> {
    let key = required_key(matches)?;
    let deps = matches
        .get_one::<ProviderUsage>("usage")
        .map(|usage| Deps::new(vec![Value::String(usage.to_string())]))
        .unwrap_or_default();
    let options = InstantiateOptions {
        deps,
        ..InstantiateOptions::default()
    };
    let instance = registry
        .instantiate(key, options)
        .with_context(|| format!("provider '{key}' is unknown or unavailable"))?;
    let fields = instance.render(&kind.mount_path(), instance.initial_values(), locale);
    print_json(&serde_json::to_value(fields)?)
}

fn read_record(matches: &ArgMatches) -> Result<Value> {
    let file = matches.get_one::<String>("file").context("missing --file")?;
    let path = expand_tilde(file);
    read_json(&path)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read host record: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Host record is not valid JSON: {}", path.display()))
}

/// Absolute paths of the secret fields the record's provider renders for its current values.
fn secret_paths(registry: &ProviderRegistry, kind: HostKind, record: &Value, locale: &LocaleContext) -> Vec<FieldPath> {
    let options = HostSchemaOptions::for_host(kind);
    let Some(key) = record.get(&options.provider_field).and_then(Value::as_str) else {
        return Vec::new();
    };
    let Some(instance) = registry.instantiate(key.trim(), InstantiateOptions::default()) else {
        return Vec::new();
    };
    instance.render(&options.mount, value_at(record, &options.mount), locale).secret_paths()
}

fn redact_record(record: &Value, secret_paths: &[FieldPath]) -> Value {
    redact_paths(&redact_json(record), secret_paths)
}

fn report_errors(errors: &ValidationErrors) -> anyhow::Error {
    for error in errors {
        eprintln!("{error}");
    }
    anyhow::anyhow!("{} validation error(s)", errors.len())
}

fn validate_record(registry: &ProviderRegistry, matches: &ArgMatches, kind: HostKind, locale: &LocaleContext) -> Result<()> {
    let record = read_record(matches)?;
    let options = HostSchemaOptions::for_host(kind);
    let key = record.get(&options.provider_field).and_then(Value::as_str);
    let composed = compose_schema(registry, &options, key, locale);
    match composed.validate(&record) {
        Ok(validated) => print_json(&redact_record(&validated, &secret_paths(registry, kind, &validated, locale))),
        Err(errors) => Err(report_errors(&errors)),
    }
}

/// Prints dispatched records, with secrets masked, instead of handing them to an automation engine.
struct StdoutSink<'a> {
    registry: &'a ProviderRegistry,
    locale: LocaleContext,
}

#[async_trait]
impl RecordSink for StdoutSink<'_> {
    async fn dispatch(&self, kind: HostKind, record: Value) -> anyhow::Result<()> {
        let secrets = secret_paths(self.registry, kind, &record, &self.locale);
        print_json(&json!({ "host": kind, "record": redact_record(&record, &secrets) }))
    }
}

async fn submit_record(registry: Arc<ProviderRegistry>, matches: &ArgMatches, kind: HostKind, locale: LocaleContext) -> Result<()> {
    let record = read_record(matches)?;
    let form = HostForm::open(kind, Arc::clone(&registry), record, locale)?;
    let sink = StdoutSink {
        registry: &registry,
        locale,
    };
    match form.submit(&sink).await {
        Ok(_) => Ok(()),
        Err(SubmitError::Invalid(errors)) => Err(report_errors(&errors)),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_locale_and_host() {
        let matches = build_cli()
            .try_get_matches_from(["certloom", "schema", "ssh", "--host", "deploy", "--locale", "zh"])
            .expect("valid arguments");
        assert_eq!(matches.get_one::<Locale>("locale"), Some(&Locale::ZhCn));
        let (_, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(host_kind(sub, &Settings::default()), HostKind::Deploy);
        assert_eq!(required_key(sub).unwrap(), "ssh");
    }

    #[test]
    fn rejects_unknown_host_kinds() {
        assert!(build_cli().try_get_matches_from(["certloom", "fields", "ssh", "--host", "server"]).is_err());
    }

    #[test]
    fn masks_rendered_secret_fields() {
        let registry = ProviderRegistry::with_builtin_providers();
        let record = json!({
            "providerKey": "ssh",
            "credentialRef": "cred_1",
            "providerConfig": { "host": "h.example.com", "authMethod": "key", "key": "-----BEGIN-----" }
        });
        let paths = secret_paths(&registry, HostKind::Deploy, &record, &LocaleContext::default());
        assert!(paths.contains(&FieldPath::parse("providerConfig.key")));
        let masked = redact_record(&record, &paths);
        assert_eq!(masked["providerConfig"]["key"], json!(certloom_util::redact::REDACTED));
        assert_eq!(masked["providerConfig"]["host"], json!("h.example.com"));
        assert_eq!(masked["credentialRef"], json!("cred_1"));
    }

    #[test]
    fn fields_accepts_a_usage_mode() {
        let matches = build_cli()
            .try_get_matches_from(["certloom", "fields", "webhook", "--usage", "notification"])
            .expect("valid arguments");
        let (_, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(sub.get_one::<ProviderUsage>("usage"), Some(&ProviderUsage::Notification));
    }

    #[test]
    fn reads_records_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, r#"{ "providerKey": "webhook" }"#).unwrap();
        assert_eq!(read_json(&path).unwrap(), json!({ "providerKey": "webhook" }));
        assert!(read_json(&dir.path().join("missing.json")).is_err());
    }
}
