use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language used for validation messages and field labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-CN")]
    ZhCn,
}

impl Locale {
    pub fn tag(self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::ZhCn => "zh-CN",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned for unsupported locale tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}'")]
pub struct UnsupportedLocale(pub String);

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    /// Accepts the language alone or with a region, using `-` or `_`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let normalized = text.trim().to_ascii_lowercase().replace('_', "-");
        let language = normalized.split('-').next().unwrap_or_default();
        match language {
            "en" => Ok(Locale::EnUs),
            "zh" => Ok(Locale::ZhCn),
            _ => Err(UnsupportedLocale(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_with_or_without_region() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("EN_us".parse::<Locale>().unwrap(), Locale::EnUs);
        assert_eq!("zh-CN".parse::<Locale>().unwrap(), Locale::ZhCn);
        assert!("fr".parse::<Locale>().is_err());
    }
}
