use thiserror::Error;

/// Top-level error aggregating every layer's error taxonomy behind one type,
/// so callers of [`crate::Participant`] don't need to match on which crate
/// failed.
#[derive(Debug, Error)]
pub enum SynkitError {
	#[error(transparent)]
	Configuration(#[from] synkit_config::ConfigurationError),

	#[error(transparent)]
	Transport(#[from] synkit_transport::TransportError),

	#[error(transparent)]
	Protocol(#[from] synkit_wire::ProtocolError),

	#[error(transparent)]
	State(#[from] synkit_lifecycle::StateError),

	#[error(transparent)]
	Abort(#[from] synkit_timesync::AbortError),

	#[error("internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, SynkitError>;
