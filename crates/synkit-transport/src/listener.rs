use tokio::net::TcpStream;

use crate::backoff::ConnectBackoff;
use crate::connection::{PeerEvent, PeerHandle, spawn};
use crate::error::{Result, TransportError};
use crate::uri::PeerUri;

/// A bound acceptor, abstracting over TCP and Unix-domain-socket listeners.
pub enum PeerListener {
	Tcp(tokio::net::TcpListener),
	#[cfg(unix)]
	Local(tokio::net::UnixListener),
}

impl PeerListener {
	pub async fn bind(uri: &PeerUri) -> Result<Self> {
		match uri {
			PeerUri::Tcp { host, port } => {
				let listener = tokio::net::TcpListener::bind((host.as_str(), *port)).await?;
				Ok(PeerListener::Tcp(listener))
			}
			#[cfg(unix)]
			PeerUri::Local { path } => {
				let _ = std::fs::remove_file(path);
				let listener = tokio::net::UnixListener::bind(path)?;
				Ok(PeerListener::Local(listener))
			}
			#[cfg(not(unix))]
			PeerUri::Local { .. } => Err(TransportError::UnsupportedScheme("local".to_string())),
		}
	}

	/// Accepts one connection and spawns its reader/writer tasks.
	pub async fn accept(&self) -> Result<(PeerHandle, tokio::sync::mpsc::Receiver<PeerEvent>)> {
		match self {
			PeerListener::Tcp(listener) => {
				let (stream, _addr) = listener.accept().await?;
				stream.set_nodelay(true).ok();
				Ok(spawn(stream))
			}
			#[cfg(unix)]
			PeerListener::Local(listener) => {
				let (stream, _addr) = listener.accept().await?;
				Ok(spawn(stream))
			}
		}
	}
}

/// Dials a peer, retrying with [`ConnectBackoff`] until it succeeds or the
/// attempt budget is exhausted.
pub async fn connect_with_retry(
	uri: &PeerUri,
	backoff: ConnectBackoff,
) -> Result<(PeerHandle, tokio::sync::mpsc::Receiver<PeerEvent>)> {
	let mut attempt = 0u32;
	loop {
		attempt += 1;
		match try_connect(uri).await {
			Ok(pair) => return Ok(pair),
			Err(err) if attempt >= backoff.max_attempts() => {
				tracing::warn!(%uri, attempts = attempt, error = %err, "peer unreachable");
				return Err(TransportError::Unreachable { uri: uri.to_string(), attempts: attempt });
			}
			Err(err) => {
				tracing::debug!(%uri, attempt, error = %err, "connect attempt failed, retrying");
				tokio::time::sleep(backoff.delay_for(attempt)).await;
			}
		}
	}
}

async fn try_connect(uri: &PeerUri) -> Result<(PeerHandle, tokio::sync::mpsc::Receiver<PeerEvent>)> {
	match uri {
		PeerUri::Tcp { host, port } => {
			let stream = TcpStream::connect((host.as_str(), *port)).await?;
			stream.set_nodelay(true).ok();
			Ok(spawn(stream))
		}
		#[cfg(unix)]
		PeerUri::Local { path } => {
			let stream = tokio::net::UnixStream::connect(path).await?;
			Ok(spawn(stream))
		}
		#[cfg(not(unix))]
		PeerUri::Local { .. } => Err(TransportError::UnsupportedScheme("local".to_string())),
	}
}
