//! Provider identity and host classification.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FieldPath;

/// Opaque, case-sensitive provider identifier persisted on stored records.
///
/// Keys are never normalized: `"SSH"` and `"ssh"` are different providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderKey(String);

impl ProviderKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProviderKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProviderKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What a provider can be used for. Drives picker filtering only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderUsage {
    Dns,
    Hosting,
    Ca,
    Notification,
    Deployment,
}

impl ProviderUsage {
    pub const ALL: [ProviderUsage; 5] = [
        ProviderUsage::Dns,
        ProviderUsage::Hosting,
        ProviderUsage::Ca,
        ProviderUsage::Notification,
        ProviderUsage::Deployment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderUsage::Dns => "dns",
            ProviderUsage::Hosting => "hosting",
            ProviderUsage::Ca => "ca",
            ProviderUsage::Notification => "notification",
            ProviderUsage::Deployment => "deployment",
        }
    }
}

impl fmt::Display for ProviderUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`ProviderUsage`] or [`HostKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
}

impl FromStr for ProviderUsage {
    type Err = ParseKindError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        ProviderUsage::ALL
            .into_iter()
            .find(|usage| usage.as_str().eq_ignore_ascii_case(text.trim()))
            .ok_or_else(|| ParseKindError {
                kind: "usage",
                value: text.to_string(),
            })
    }
}

/// The kind of record editor embedding a provider field-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostKind {
    /// Access credential editor. Config lives under `config`; the provider is
    /// locked once the record has been persisted.
    Access,
    /// Workflow deployment node editor. Config lives under `providerConfig`;
    /// the node references a stored credential via `credentialRef`.
    Deploy,
}

impl HostKind {
    /// Path at which provider configuration is mounted inside the record.
    pub fn mount_path(self) -> FieldPath {
        match self {
            HostKind::Access => FieldPath::parse("config"),
            HostKind::Deploy => FieldPath::parse("providerConfig"),
        }
    }

    /// Name of the host field holding the credential reference, if any.
    pub fn credential_field(self) -> Option<&'static str> {
        match self {
            HostKind::Access => None,
            HostKind::Deploy => Some("credentialRef"),
        }
    }

    /// Whether the provider may no longer be changed once the record exists in storage.
    pub fn locks_provider_when_persisted(self) -> bool {
        matches!(self, HostKind::Access)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HostKind::Access => "access",
            HostKind::Deploy => "deploy",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostKind {
    type Err = ParseKindError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "access" => Ok(HostKind::Access),
            "deploy" | "deployment" => Ok(HostKind::Deploy),
            _ => Err(ParseKindError {
                kind: "host",
                value: text.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_key_is_case_sensitive_and_transparent() {
        assert_ne!(ProviderKey::from("ssh"), ProviderKey::from("SSH"));
        let json = serde_json::to_string(&ProviderKey::from("aliyun-cdn")).unwrap();
        assert_eq!(json, "\"aliyun-cdn\"");
    }

    #[test]
    fn host_kinds_mount_at_distinct_paths() {
        assert_eq!(HostKind::Access.mount_path().to_string(), "config");
        assert_eq!(HostKind::Deploy.mount_path().to_string(), "providerConfig");
        assert_eq!(HostKind::Deploy.credential_field(), Some("credentialRef"));
        assert!(HostKind::Access.locks_provider_when_persisted());
        assert!(!HostKind::Deploy.locks_provider_when_persisted());
    }

    #[test]
    fn parses_usage_and_host_leniently() {
        assert_eq!("Notification".parse::<ProviderUsage>().unwrap(), ProviderUsage::Notification);
        assert_eq!(" deployment ".parse::<HostKind>().unwrap(), HostKind::Deploy);
        assert!("storage".parse::<ProviderUsage>().is_err());
    }
}
