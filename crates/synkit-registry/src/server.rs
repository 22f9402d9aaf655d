use synkit_transport::{PeerEvent, PeerListener, PeerUri};
use synkit_wire::{FrameKind, RegistryMessage, WireDecode, WireEncode};

use crate::handle::RegistryHandle;

/// Binds the registry's listening socket and serves connections until the
/// process is asked to stop.
///
/// Mirrors the original registry's single responsibility: own the accept
/// loop and the connected-participants table; it never participates in
/// lifecycle or time-sync traffic beyond relaying it for proxy-capable
/// peers.
pub async fn serve(uri: &PeerUri, registry: RegistryHandle) -> Result<(), synkit_transport::TransportError> {
	let listener = PeerListener::bind(uri).await?;
	tracing::info!(%uri, "registry listening");
	loop {
		let (peer, events) = listener.accept().await?;
		let registry = registry.clone();
		tokio::spawn(serve_connection(peer, events, registry));
	}
}

async fn serve_connection(
	peer: synkit_transport::PeerHandle,
	mut events: tokio::sync::mpsc::Receiver<PeerEvent>,
	registry: RegistryHandle,
) {
	let mut participant_name: Option<String> = None;

	while let Some(event) = events.recv().await {
		match event {
			PeerEvent::Frame(FrameKind::RegistryMessage, payload) => {
				let mut bytes = payload;
				let message = match RegistryMessage::decode(&mut bytes) {
					Ok(message) => message,
					Err(err) => {
						tracing::warn!(error = %err, "malformed registry message, dropping connection");
						break;
					}
				};
				match message {
					RegistryMessage::Announce(announcement) => {
						if let Err(err) = announcement.check_version_compatible() {
							tracing::warn!(error = %err, "rejecting participant with incompatible protocol version");
							break;
						}
						participant_name = Some(announcement.participant_name.clone());
						let known = registry.announce(announcement, peer.clone()).await;
						let reply = RegistryMessage::KnownParticipants(known);
						let mut buf = bytes::BytesMut::new();
						reply.encode(&mut buf);
						let _ = peer.send(FrameKind::RegistryMessage, buf.freeze()).await;
					}
					RegistryMessage::ShuttingDown => break,
					RegistryMessage::KnownParticipants(_) => {
						tracing::warn!("unexpected KnownParticipants from participant, ignoring");
					}
					RegistryMessage::Relay { to, kind, payload, hop_count, .. } => {
						// `from` is this connection's authenticated identity, not
						// whatever the client happened to put on the wire.
						if let Some(name) = &participant_name {
							registry.proxy_frame(name.clone(), to, kind, payload, hop_count).await;
						}
					}
				}
			}
			PeerEvent::Frame(kind, _) => {
				tracing::debug!(?kind, "ignoring frame kind the registry does not speak");
			}
			PeerEvent::Disconnected => break,
		}
	}

	if let Some(name) = participant_name {
		registry.disconnected(name).await;
	}
}
