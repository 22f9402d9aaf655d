use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("unsupported acceptor uri scheme: {0}")]
	UnsupportedScheme(String),

	#[error("malformed acceptor uri: {0}")]
	MalformedUri(String),

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("peer connection closed")]
	Disconnected,

	#[error("peer unreachable after {attempts} attempts: {uri}")]
	Unreachable { uri: String, attempts: u32 },

	#[error(transparent)]
	Protocol(#[from] synkit_wire::ProtocolError),
}

#[derive(Debug, Error)]
#[error("timed out waiting for {what} after {elapsed_ms}ms")]
pub struct TimeoutError {
	pub what: &'static str,
	pub elapsed_ms: u64,
}

pub type Result<T> = std::result::Result<T, TransportError>;
