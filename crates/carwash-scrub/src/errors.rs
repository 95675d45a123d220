use thiserror::Error;

use carwash_core::ConfigError;
use carwash_store::StorageError;

use crate::formatter::FormatterShape;

/// Errors that stop a scrub run before any record is written.
#[derive(Debug, Error)]
pub enum ScrubError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("unresolvable formatter type '{name}' for a {shape} formatter")]
    UnresolvableType { name: String, shape: FormatterShape },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised while formatting a single value or record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    #[error("{generator}: {message}")]
    InvalidArgs { generator: String, message: String },
    #[error("formatter failed: {0}")]
    Failed(String),
}

impl FormatError {
    pub fn invalid_args(generator: impl Into<String>, message: impl Into<String>) -> Self {
        FormatError::InvalidArgs {
            generator: generator.into(),
            message: message.into(),
        }
    }

    /// Stable identifier used in scrub reports.
    pub fn code(&self) -> &'static str {
        match self {
            FormatError::UnknownGenerator(_) => "unknown_generator",
            FormatError::InvalidArgs { .. } => "invalid_generator_args",
            FormatError::Failed(_) => "formatter_failed",
        }
    }
}
