use thiserror::Error;

/// Configuration errors detected before any record is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A table declares both a whole-record formatter and field formatters.
    #[error("table '{table}' declares both a record formatter and field formatters")]
    AmbiguousTableSpec { table: String },
    /// A formatter entry has a shape that cannot be used where it appears.
    #[error("invalid formatter for {location}: {message}")]
    InvalidFormatter { location: String, message: String },
    /// The configuration file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// Catch-all for structural problems in the file.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid_formatter(location: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidFormatter {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Parse(value.to_string())
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
