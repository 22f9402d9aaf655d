use bytes::{Bytes, BytesMut};
use synkit_wire::{FrameKind, RegistryMessage, WireEncode, encode_frame, try_decode_frame};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Bound on a peer's outbound queue. A full queue makes the sender wait,
/// which is the deliberate backpressure point for the message router.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

const INBOUND_EVENT_CAPACITY: usize = 256;
const READ_CHUNK: usize = 16 * 1024;

/// Events surfaced by a peer connection's reader task.
#[derive(Debug)]
pub enum PeerEvent {
	Frame(FrameKind, Bytes),
	Disconnected,
}

#[derive(Debug)]
struct OutboundFrame {
	kind: FrameKind,
	payload: Bytes,
}

/// A handle to a live peer connection. Cloning is cheap; all clones share
/// the same outbound queue and reader.
#[derive(Clone)]
pub struct PeerHandle {
	tx: mpsc::Sender<OutboundFrame>,
}

impl std::fmt::Debug for PeerHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PeerHandle").finish_non_exhaustive()
	}
}

impl PeerHandle {
	/// Enqueues a frame for the writer task. Waits if the peer's outbound
	/// queue is full — this is how a slow peer applies backpressure to
	/// everything sending to it, including the time-sync barrier.
	pub async fn send(&self, kind: FrameKind, payload: Bytes) -> Result<(), TransportError> {
		self.tx.send(OutboundFrame { kind, payload }).await.map_err(|_| TransportError::Disconnected)
	}
}

/// Wraps `upstream` so that frames sent through the returned handle are
/// addressed to `to` via a `RegistryMessage::Relay` envelope riding on
/// `upstream`, rather than being written to it directly.
///
/// Used for peers reached through the registry's proxy fallback: several
/// proxied peers can share one physical connection to the registry, so each
/// gets its own wrapping handle that tags outbound frames with its name
/// before they go out over the shared connection.
pub fn relay_via(upstream: PeerHandle, from: String, to: String) -> PeerHandle {
	let (tx, mut rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_QUEUE_CAPACITY);
	tokio::spawn(async move {
		while let Some(frame) = rx.recv().await {
			let relay =
				RegistryMessage::Relay { from: from.clone(), to: to.clone(), kind: frame.kind, payload: frame.payload, hop_count: 0 };
			let mut buf = BytesMut::new();
			relay.encode(&mut buf);
			if upstream.send(FrameKind::RegistryMessage, buf.freeze()).await.is_err() {
				return;
			}
		}
	});
	PeerHandle { tx }
}

/// Spawns the reader and writer tasks for one peer connection and returns a
/// handle plus the inbound event stream.
pub fn spawn<S>(stream: S) -> (PeerHandle, mpsc::Receiver<PeerEvent>)
where
	S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
	let (read_half, write_half) = tokio::io::split(stream);
	let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
	let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_EVENT_CAPACITY);

	tokio::spawn(reader_loop(read_half, inbound_tx));
	tokio::spawn(writer_loop(write_half, outbound_rx));

	(PeerHandle { tx: outbound_tx }, inbound_rx)
}

async fn reader_loop<R: AsyncRead + Unpin>(mut reader: R, events: mpsc::Sender<PeerEvent>) {
	let mut buf = BytesMut::with_capacity(READ_CHUNK);
	loop {
		match reader.read_buf(&mut buf).await {
			Ok(0) => {
				let _ = events.send(PeerEvent::Disconnected).await;
				return;
			}
			Ok(_) => {}
			Err(err) => {
				tracing::warn!(error = %err, "peer read failed");
				let _ = events.send(PeerEvent::Disconnected).await;
				return;
			}
		}

		loop {
			match try_decode_frame(&mut buf) {
				Ok(Some((kind, payload))) => {
					if events.send(PeerEvent::Frame(kind, payload)).await.is_err() {
						return;
					}
				}
				Ok(None) => break,
				Err(err) => {
					tracing::warn!(error = %err, "dropping malformed frame, closing connection");
					let _ = events.send(PeerEvent::Disconnected).await;
					return;
				}
			}
		}
	}
}

async fn writer_loop<W: AsyncWrite + Unpin>(mut writer: W, mut outbound: mpsc::Receiver<OutboundFrame>) {
	while let Some(frame) = outbound.recv().await {
		let encoded = encode_frame(frame.kind, &frame.payload);
		if let Err(err) = writer.write_all(&encoded).await {
			tracing::warn!(error = %err, "peer write failed, closing connection");
			return;
		}
		if let Err(err) = writer.flush().await {
			tracing::warn!(error = %err, "peer flush failed, closing connection");
			return;
		}
	}
}

#[cfg(test)]
mod tests {
	use synkit_wire::WireDecode;
	use tokio::io::duplex;

	use super::*;

	#[tokio::test]
	async fn send_and_receive_roundtrip() {
		let (client, server) = duplex(4096);
		let (client_handle, _client_events) = spawn(client);
		let (_server_handle, mut server_events) = spawn(server);

		client_handle.send(FrameKind::Discovery, Bytes::from_static(b"hi")).await.unwrap();

		match server_events.recv().await.unwrap() {
			PeerEvent::Frame(kind, payload) => {
				assert_eq!(kind, FrameKind::Discovery);
				assert_eq!(&payload[..], b"hi");
			}
			other => panic!("unexpected event: {other:?}"),
		}
	}

	#[tokio::test]
	async fn disconnect_is_reported_on_drop() {
		let (client, server) = duplex(4096);
		let (client_handle, _client_events) = spawn(client);
		let (_server_handle, mut server_events) = spawn(server);

		drop(client_handle);

		let event = server_events.recv().await.unwrap();
		assert!(matches!(event, PeerEvent::Disconnected));
	}

	#[tokio::test]
	async fn relay_via_wraps_frames_as_a_registry_relay_envelope() {
		let (client, server) = duplex(4096);
		let (upstream, _upstream_events) = spawn(client);
		let (_server_handle, mut server_events) = spawn(server);

		let relay_handle = relay_via(upstream, "A".to_string(), "B".to_string());
		relay_handle.send(FrameKind::SimMessage, Bytes::from_static(b"payload")).await.unwrap();

		match server_events.recv().await.unwrap() {
			PeerEvent::Frame(FrameKind::RegistryMessage, payload) => {
				let message = RegistryMessage::decode(&mut payload.clone()).unwrap();
				assert_eq!(
					message,
					RegistryMessage::Relay {
						from: "A".to_string(),
						to: "B".to_string(),
						kind: FrameKind::SimMessage,
						payload: Bytes::from_static(b"payload"),
						hop_count: 0,
					}
				);
			}
			other => panic!("unexpected event: {other:?}"),
		}
	}
}
