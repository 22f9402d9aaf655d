use std::path::PathBuf;

use crate::error::{Result, TransportError};

/// A parsed `AcceptorUris` entry: either a TCP socket or a Unix domain
/// socket path, matching the `tcp://` and `local://` schemes from the
/// registry URI scheme table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerUri {
	Tcp { host: String, port: u16 },
	Local { path: PathBuf },
}

impl PeerUri {
	pub fn parse(raw: &str) -> Result<Self> {
		let parsed = url::Url::parse(raw).map_err(|_| TransportError::MalformedUri(raw.to_string()))?;
		match parsed.scheme() {
			// `silkit://` is the registry's historical scheme name; it
			// addresses a host:port pair exactly like `tcp://`.
			"tcp" | "silkit" => {
				let host = parsed.host_str().ok_or_else(|| TransportError::MalformedUri(raw.to_string()))?.to_string();
				let port = parsed.port().ok_or_else(|| TransportError::MalformedUri(raw.to_string()))?;
				Ok(PeerUri::Tcp { host, port })
			}
			"local" => Ok(PeerUri::Local { path: PathBuf::from(parsed.path()) }),
			other => Err(TransportError::UnsupportedScheme(other.to_string())),
		}
	}

	/// True for `local://` — preferred over `tcp://` whenever both a local
	/// peer and a remote peer advertise one, per the co-located preference
	/// rule.
	pub fn is_local(&self) -> bool {
		matches!(self, PeerUri::Local { .. })
	}
}

impl std::fmt::Display for PeerUri {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PeerUri::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
			PeerUri::Local { path } => write!(f, "local://{}", path.display()),
		}
	}
}

/// Orders a peer's advertised acceptor URIs with local domain sockets first.
pub fn prefer_local(mut uris: Vec<PeerUri>) -> Vec<PeerUri> {
	uris.sort_by_key(|u| !u.is_local());
	uris
}
