use std::fmt;
use std::str::FromStr;

/// Locale used by capabilities that have localized data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocaleKey {
    #[default]
    EnUs,
    PtBr,
}

impl LocaleKey {
    pub const ALL: &'static [LocaleKey] = &[LocaleKey::EnUs, LocaleKey::PtBr];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en_US" | "en" => Some(Self::EnUs),
            "pt_BR" | "pt" => Some(Self::PtBr),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en_US",
            Self::PtBr => "pt_BR",
        }
    }
}

impl FromStr for LocaleKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unsupported locale '{value}'"))
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
