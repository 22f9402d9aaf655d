//! Error types for configuration parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating a participant
/// configuration document.
#[derive(Debug, Error)]
pub enum ConfigurationError {
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("YAML parse error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unsupported schema version {found}, expected {expected}")]
	UnsupportedSchemaVersion { found: u32, expected: u32 },

	#[error("missing required field: {0}")]
	MissingField(&'static str),

	#[error("invalid value for {field}: {reason}")]
	InvalidValue { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
