use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

use synkit_transport::PeerHandle;
use synkit_wire::{FrameKind, SimMessage, WireEncode};

use crate::commands::{ConnectionDirection, RouterCmd};
use crate::handle::RouterHandle;
use crate::handler::{Envelope, MessageHandler};

/// Command queue depth. Kept modest: a full queue here is itself a form of
/// backpressure on whatever is calling the router.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Owns the router's routing tables and serializes all sends and dispatches
/// through a single loop, which is what gives the router its FIFO ordering
/// guarantee per sender per network.
pub struct RouterService {
	rx: mpsc::Receiver<RouterCmd>,
	local_participant_name: String,
	peers: HashMap<String, PeerHandle>,
	handlers: HashMap<u16, Arc<dyn MessageHandler>>,
}

impl RouterService {
	pub fn spawn(local_participant_name: impl Into<String>) -> RouterHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let service = RouterService {
			rx,
			local_participant_name: local_participant_name.into(),
			peers: HashMap::new(),
			handlers: HashMap::new(),
		};
		tokio::spawn(service.run());
		RouterHandle::new(tx)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd).await;
		}
	}

	async fn handle_command(&mut self, cmd: RouterCmd) {
		match cmd {
			RouterCmd::RegisterPeer { participant_name, handle, direction } => {
				self.register_peer(participant_name, handle, direction);
			}
			RouterCmd::UnregisterPeer { participant_name } => {
				self.peers.remove(&participant_name);
			}
			RouterCmd::RegisterHandler { receiver_index, handler } => {
				self.handlers.insert(receiver_index, handler);
			}
			RouterCmd::Send { target_participant, receiver_index, message_type, payload } => {
				self.send_to_peer(&target_participant, receiver_index, message_type, payload).await;
			}
			RouterCmd::Dispatch { sender_participant, receiver_index, message_type, payload } => {
				self.dispatch_local(sender_participant, receiver_index, message_type, payload).await;
			}
			RouterCmd::SendRaw { target_participant, kind, payload } => {
				let Some(peer) = self.peers.get(&target_participant) else {
					tracing::warn!(target = %target_participant, "dropping raw send: no peer registered");
					return;
				};
				if let Err(err) = peer.send(kind, payload).await {
					tracing::warn!(target = %target_participant, error = %err, "failed to deliver raw frame, dropping");
				}
			}
		}
	}

	/// The connection direction this participant should keep for `peer_name`
	/// when both ends race to connect: the lexicographically smaller name
	/// keeps the connection it dialed, the larger name keeps the one it
	/// accepted, so both ends land on the same physical connection.
	fn preferred_direction(&self, peer_name: &str) -> ConnectionDirection {
		if self.local_participant_name.as_str() < peer_name { ConnectionDirection::Dialed } else { ConnectionDirection::Accepted }
	}

	fn register_peer(&mut self, participant_name: String, handle: PeerHandle, direction: ConnectionDirection) {
		if self.peers.contains_key(&participant_name) && direction != self.preferred_direction(&participant_name) {
			tracing::debug!(
				peer = %participant_name,
				?direction,
				"dropping non-preferred duplicate connection per lexicographic tie-break",
			);
			return;
		}
		self.peers.insert(participant_name, handle);
	}

	async fn send_to_peer(&mut self, target: &str, receiver_index: u16, message_type: u8, payload: Bytes) {
		let Some(peer) = self.peers.get(target) else {
			tracing::warn!(target, "dropping send: no peer registered");
			return;
		};
		let message = SimMessage { receiver_index, message_type, payload };
		let mut buf = BytesMut::new();
		message.encode(&mut buf);
		// Blocks here if the target's outbound queue is full: deliberate
		// backpressure, propagated all the way up to whoever called
		// RouterHandle::send, including the time-sync barrier.
		if let Err(err) = peer.send(FrameKind::SimMessage, buf.freeze()).await {
			tracing::warn!(target, error = %err, "failed to deliver to peer, dropping");
		}
	}

	async fn dispatch_local(&self, sender: String, receiver_index: u16, message_type: u8, payload: Bytes) {
		let Some(handler) = self.handlers.get(&receiver_index) else {
			tracing::debug!(receiver_index, "no local handler registered, dropping inbound message");
			return;
		};
		let envelope = Envelope { sender_participant: sender, receiver_index, message_type, payload };
		handler.handle(envelope).await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use tokio::io::duplex;
	use tokio::sync::mpsc as tmpsc;

	use synkit_wire::WireDecode;

	use super::*;

	struct RecordingHandler {
		seen: tmpsc::Sender<Envelope>,
	}

	#[async_trait::async_trait]
	impl MessageHandler for RecordingHandler {
		async fn handle(&self, envelope: Envelope) {
			let _ = self.seen.send(envelope).await;
		}
	}

	#[tokio::test]
	async fn dispatch_delivers_to_registered_handler() {
		let router = RouterService::spawn("Local");
		let (seen_tx, mut seen_rx) = tmpsc::channel(4);
		router.register_handler(7, Arc::new(RecordingHandler { seen: seen_tx })).await;

		router.dispatch_inbound("ECU1".into(), 7, 1, Bytes::from_static(b"frame")).await;

		let envelope = seen_rx.recv().await.unwrap();
		assert_eq!(envelope.sender_participant, "ECU1");
		assert_eq!(&envelope.payload[..], b"frame");
	}

	#[tokio::test]
	async fn dispatch_with_no_handler_does_not_panic() {
		let router = RouterService::spawn("Local");
		router.dispatch_inbound("ECU1".into(), 99, 1, Bytes::from_static(b"x")).await;
	}

	#[tokio::test]
	async fn send_preserves_fifo_order_per_sender() {
		let router = RouterService::spawn("Local");
		let (client, server) = duplex(1 << 16);
		let (peer_handle, mut peer_events) = synkit_transport::spawn(server);
		let _ = client;
		router.register_peer("Target".into(), peer_handle, ConnectionDirection::Dialed).await;

		for i in 0..5u8 {
			router.send("Target".into(), 1, i, Bytes::from_static(b"x")).await;
		}

		let order = Arc::new(Mutex::new(Vec::new()));
		for _ in 0..5 {
			if let Some(synkit_transport::PeerEvent::Frame(_, payload)) = peer_events.recv().await {
				let mut bytes = payload;
				let msg = SimMessage::decode(&mut bytes).unwrap();
				order.lock().unwrap().push(msg.message_type);
			}
		}
		assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn send_raw_delivers_arbitrary_frame_kind_to_named_peer() {
		let router = RouterService::spawn("Local");
		let (client, server) = duplex(1 << 16);
		let (peer_handle, mut peer_events) = synkit_transport::spawn(server);
		let _ = client;
		router.register_peer("Target".into(), peer_handle, ConnectionDirection::Dialed).await;

		router.send_raw("Target".into(), FrameKind::Lifecycle, Bytes::from_static(b"status")).await;

		match peer_events.recv().await {
			Some(synkit_transport::PeerEvent::Frame(kind, payload)) => {
				assert_eq!(kind, FrameKind::Lifecycle);
				assert_eq!(&payload[..], b"status");
			}
			other => panic!("expected a lifecycle frame, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn send_raw_to_unregistered_peer_is_dropped_not_panicking() {
		let router = RouterService::spawn("Local");
		router.send_raw("Nobody".into(), FrameKind::Discovery, Bytes::from_static(b"x")).await;
	}

	#[tokio::test]
	async fn lexicographically_smaller_name_keeps_its_dialed_connection() {
		// "Alice" < "Bob": Alice's router should keep the connection it
		// dialed to Bob even if an accepted connection from Bob registers
		// afterwards.
		let router = RouterService::spawn("Alice");

		let (dialed_client, dialed_server) = duplex(1 << 16);
		let (dialed_handle, mut dialed_events) = synkit_transport::spawn(dialed_server);
		let _ = dialed_client;
		router.register_peer("Bob".into(), dialed_handle, ConnectionDirection::Dialed).await;

		let (accepted_client, accepted_server) = duplex(1 << 16);
		let (accepted_handle, mut accepted_events) = synkit_transport::spawn(accepted_server);
		let _ = accepted_client;
		router.register_peer("Bob".into(), accepted_handle, ConnectionDirection::Accepted).await;

		router.send("Bob".into(), 1, 0, Bytes::from_static(b"x")).await;
		assert!(dialed_events.recv().await.is_some(), "the dialed connection should still carry traffic");
		assert!(
			tokio::time::timeout(std::time::Duration::from_millis(50), accepted_events.recv()).await.is_err(),
			"the accepted connection should have been dropped in favor of the dialed one"
		);
	}

	#[tokio::test]
	async fn lexicographically_larger_name_keeps_its_accepted_connection() {
		// "Bob" > "Alice": Bob's router should keep the connection it
		// accepted from Alice even if it later dials out to her too.
		let router = RouterService::spawn("Bob");

		let (accepted_client, accepted_server) = duplex(1 << 16);
		let (accepted_handle, mut accepted_events) = synkit_transport::spawn(accepted_server);
		let _ = accepted_client;
		router.register_peer("Alice".into(), accepted_handle, ConnectionDirection::Accepted).await;

		let (dialed_client, dialed_server) = duplex(1 << 16);
		let (dialed_handle, mut dialed_events) = synkit_transport::spawn(dialed_server);
		let _ = dialed_client;
		router.register_peer("Alice".into(), dialed_handle, ConnectionDirection::Dialed).await;

		router.send("Alice".into(), 1, 0, Bytes::from_static(b"x")).await;
		assert!(accepted_events.recv().await.is_some(), "the accepted connection should still carry traffic");
		assert!(
			tokio::time::timeout(std::time::Duration::from_millis(50), dialed_events.recv()).await.is_err(),
			"the dialed connection should have been dropped in favor of the accepted one"
		);
	}
}
