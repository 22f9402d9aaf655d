use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
	#[error("no peer registered for participant {0}")]
	UnknownPeer(String),

	#[error("no local handler registered for receiver index {0}")]
	UnknownReceiver(u16),

	#[error(transparent)]
	Transport(#[from] synkit_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, RouterError>;
