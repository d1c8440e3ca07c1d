//! Error types for configuration loading.
//!
//! Only fatal conditions are errors. Advisory conditions (unknown keys,
//! node names that DNS cannot serve) are collected as warnings instead.

use crate::config::Format;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while resolving, decoding or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configured path is missing or unreadable.
    #[error("cannot read config path {}: {source}", .path.display())]
    Resolution {
        /// The path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source's payload failed to parse or did not fit the schema.
    #[error("failed to parse {name} as {format}: {message}")]
    Decode {
        /// Name of the offending source.
        name: String,
        /// Format the source was decoded with.
        format: String,
        /// Decoder message.
        message: String,
    },

    /// An unknown configuration format was requested.
    #[error("unsupported config format {0:?}, must be \"hcl\" or \"json\"")]
    UnsupportedFormat(String),

    /// The merged configuration cannot be used to run the agent.
    #[error("{0}")]
    Validation(String),
}

impl ConfigError {
    pub fn resolution(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resolution {
            path: path.into(),
            source,
        }
    }

    pub fn decode(name: &str, format: Option<Format>, message: impl ToString) -> Self {
        Self::Decode {
            name: name.to_string(),
            format: format.map_or_else(|| "unknown".to_string(), |f| f.to_string()),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_names_path() {
        let err = ConfigError::resolution(
            "/etc/agent/missing.hcl",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.to_string().contains("/etc/agent/missing.hcl"));
    }

    #[test]
    fn test_decode_error_names_source_and_format() {
        let err = ConfigError::decode("overrides", Some(Format::Json), "expected value");
        let msg = err.to_string();
        assert!(msg.contains("overrides"));
        assert!(msg.contains("json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_validation_error_is_verbatim() {
        let err = ConfigError::validation("data_dir cannot be empty");
        assert_eq!(err.to_string(), "data_dir cannot be empty");
    }
}
