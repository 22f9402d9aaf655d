//! Ambient configuration layer: parses and validates the YAML/JSON
//! participant configuration document described by the middleware's
//! external interface.

mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{ConfigurationError, Result};

/// The schema version this build understands. Bumped whenever a breaking
/// change is made to the document shape.
pub const SCHEMA_VERSION: u32 = 1;

fn default_connect_attempts() -> u32 {
	5
}

fn default_tcp_no_delay() -> bool {
	true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiddlewareConfig {
	pub registry_uri: String,
	#[serde(default)]
	pub acceptor_uris: Vec<String>,
	#[serde(default = "default_connect_attempts")]
	pub connect_attempts: u32,
	#[serde(default = "default_tcp_no_delay")]
	pub tcp_no_delay: bool,
	#[serde(default)]
	pub enable_domain_sockets: bool,
}

impl Default for MiddlewareConfig {
	fn default() -> Self {
		MiddlewareConfig {
			registry_uri: String::new(),
			acceptor_uris: Vec::new(),
			connect_attempts: default_connect_attempts(),
			tcp_no_delay: default_tcp_no_delay(),
			enable_domain_sockets: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingSinkConfig {
	pub name: String,
	pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggingConfig {
	#[serde(default)]
	pub sinks: Vec<LoggingSinkConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSynchronizationConfig {
	/// Wall-clock seconds per unit of virtual time; zero disables pacing.
	#[serde(default)]
	pub animation_factor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentalConfig {
	#[serde(default)]
	pub time_synchronization: TimeSynchronizationConfig,
}

/// The full participant configuration document. Field names follow the
/// dotted external keys (`Middleware.RegistryUri`, ...) via nested structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParticipantConfiguration {
	pub schema_version: u32,
	pub participant_name: String,
	pub middleware: MiddlewareConfig,
	#[serde(default)]
	pub logging: LoggingConfig,
	#[serde(default)]
	pub experimental: ExperimentalConfig,
}

impl ParticipantConfiguration {
	pub fn validate(&self) -> Result<()> {
		if self.schema_version != SCHEMA_VERSION {
			return Err(ConfigurationError::UnsupportedSchemaVersion {
				found: self.schema_version,
				expected: SCHEMA_VERSION,
			});
		}
		if self.participant_name.is_empty() {
			return Err(ConfigurationError::MissingField("ParticipantName"));
		}
		if self.middleware.registry_uri.is_empty() {
			return Err(ConfigurationError::MissingField("Middleware.RegistryUri"));
		}
		if self.middleware.connect_attempts == 0 {
			return Err(ConfigurationError::InvalidValue {
				field: "Middleware.ConnectAttempts",
				reason: "must be at least 1".to_string(),
			});
		}
		if self.experimental.time_synchronization.animation_factor < 0.0 {
			return Err(ConfigurationError::InvalidValue {
				field: "Experimental.TimeSynchronization.AnimationFactor",
				reason: "must be non-negative".to_string(),
			});
		}
		Ok(())
	}

	pub fn from_yaml(input: &str) -> Result<Self> {
		let config: ParticipantConfiguration = serde_yaml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_json(input: &str) -> Result<Self> {
		let config: ParticipantConfiguration = serde_json::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path)
			.map_err(|error| ConfigurationError::Io { path: path.to_path_buf(), error })?;
		match path.extension().and_then(|ext| ext.to_str()) {
			Some("json") => Self::from_json(&contents),
			_ => Self::from_yaml(&contents),
		}
	}

	pub fn to_yaml(&self) -> Result<String> {
		Ok(serde_yaml::to_string(self)?)
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_yaml() -> &'static str {
		r#"
SchemaVersion: 1
ParticipantName: ECU1
Middleware:
  RegistryUri: "silkit://localhost:8500"
  AcceptorUris:
    - "tcp://0.0.0.0:0"
  ConnectAttempts: 3
  TcpNoDelay: true
  EnableDomainSockets: false
Logging:
  Sinks:
    - Name: stdout
      Level: info
Experimental:
  TimeSynchronization:
    AnimationFactor: 1.5
"#
	}

	#[test]
	fn parses_yaml_document() {
		let config = ParticipantConfiguration::from_yaml(sample_yaml()).unwrap();
		assert_eq!(config.participant_name, "ECU1");
		assert_eq!(config.middleware.connect_attempts, 3);
		assert_eq!(config.experimental.time_synchronization.animation_factor, 1.5);
		assert_eq!(config.logging.sinks.len(), 1);
	}

	#[test]
	fn missing_registry_uri_fails_validation() {
		let err = ParticipantConfiguration::from_yaml(
			"SchemaVersion: 1\nParticipantName: ECU1\nMiddleware:\n  RegistryUri: \"\"\n",
		)
		.unwrap_err();
		assert!(matches!(err, ConfigurationError::MissingField("Middleware.RegistryUri")));
	}

	#[test]
	fn rejects_unsupported_schema_version() {
		let err = ParticipantConfiguration::from_yaml(
			"SchemaVersion: 99\nParticipantName: ECU1\nMiddleware:\n  RegistryUri: \"tcp://x:1\"\n",
		)
		.unwrap_err();
		assert!(matches!(err, ConfigurationError::UnsupportedSchemaVersion { found: 99, .. }));
	}

	#[test]
	fn parse_of_serialize_round_trips() {
		let config = ParticipantConfiguration::from_yaml(sample_yaml()).unwrap();
		let reparsed = ParticipantConfiguration::from_yaml(&config.to_yaml().unwrap()).unwrap();
		assert_eq!(config, reparsed);
	}

	/// YAML -> internal -> JSON -> internal -> JSON must be idempotent.
	#[test]
	fn yaml_json_round_trip_is_idempotent() {
		let from_yaml = ParticipantConfiguration::from_yaml(sample_yaml()).unwrap();
		let json_once = from_yaml.to_json().unwrap();
		let from_json = ParticipantConfiguration::from_json(&json_once).unwrap();
		let json_twice = from_json.to_json().unwrap();
		assert_eq!(json_once, json_twice);
		assert_eq!(from_yaml, from_json);
	}

	#[test]
	fn from_path_dispatches_on_extension() {
		let dir = tempfile::tempdir().unwrap();
		let yaml_path = dir.path().join("config.yaml");
		std::fs::write(&yaml_path, sample_yaml()).unwrap();
		let config = ParticipantConfiguration::from_path(&yaml_path).unwrap();
		assert_eq!(config.participant_name, "ECU1");

		let json_path = dir.path().join("config.json");
		std::fs::write(&json_path, config.to_json().unwrap()).unwrap();
		let reloaded = ParticipantConfiguration::from_path(&json_path).unwrap();
		assert_eq!(reloaded, config);
	}
}
