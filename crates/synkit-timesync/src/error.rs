use thiserror::Error;

/// Errors surfaced while a simulation step is suspended or torn down.
#[derive(Debug, Error)]
pub enum AbortError {
	#[error("simulation step aborted: {reason}")]
	Aborted { reason: String },
}
