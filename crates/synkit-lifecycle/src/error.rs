use thiserror::Error;

use synkit_wire::ParticipantState;

#[derive(Debug, Error)]
pub enum StateError {
	#[error("invalid lifecycle transition from {from:?} via {via}")]
	InvalidTransition { from: ParticipantState, via: &'static str },

	#[error("a handler for this hook is already registered")]
	HandlerAlreadyRegistered,

	#[error("{hook} handler panicked or returned an error: {reason}")]
	HandlerFailed { hook: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, StateError>;
