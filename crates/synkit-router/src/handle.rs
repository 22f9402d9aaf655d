use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use synkit_transport::PeerHandle;
use synkit_wire::FrameKind;

use crate::commands::{ConnectionDirection, RouterCmd};
use crate::handler::MessageHandler;

/// A cheaply cloneable handle to the router actor.
#[derive(Clone)]
pub struct RouterHandle {
	tx: mpsc::Sender<RouterCmd>,
}

impl RouterHandle {
	pub(crate) fn new(tx: mpsc::Sender<RouterCmd>) -> Self {
		Self { tx }
	}

	/// Registers a peer connection. If a connection for `participant_name`
	/// is already registered, `direction` is tie-broken against the local
	/// participant's own name: at most one live connection per (local,
	/// remote) pair survives, chosen by lexicographic comparison so both
	/// ends independently converge on the same connection.
	pub async fn register_peer(&self, participant_name: String, handle: PeerHandle, direction: ConnectionDirection) {
		let _ = self.tx.send(RouterCmd::RegisterPeer { participant_name, handle, direction }).await;
	}

	pub async fn unregister_peer(&self, participant_name: String) {
		let _ = self.tx.send(RouterCmd::UnregisterPeer { participant_name }).await;
	}

	pub async fn register_handler(&self, receiver_index: u16, handler: Arc<dyn MessageHandler>) {
		let _ = self.tx.send(RouterCmd::RegisterHandler { receiver_index, handler }).await;
	}

	/// Enqueues an outbound send. Resolves once the router has accepted the
	/// command; the router itself may still block on the target's
	/// outbound queue before the bytes actually leave — that backpressure
	/// is by design.
	pub async fn send(&self, target_participant: String, receiver_index: u16, message_type: u8, payload: Bytes) {
		let _ = self.tx.send(RouterCmd::Send { target_participant, receiver_index, message_type, payload }).await;
	}

	pub async fn dispatch_inbound(
		&self,
		sender_participant: String,
		receiver_index: u16,
		message_type: u8,
		payload: Bytes,
	) {
		let _ = self.tx.send(RouterCmd::Dispatch { sender_participant, receiver_index, message_type, payload }).await;
	}

	/// Sends a pre-framed payload of an arbitrary kind directly to a named
	/// peer. Used for lifecycle and discovery control-plane traffic, which
	/// isn't addressed by receiver index the way `SimMessage` is.
	pub async fn send_raw(&self, target_participant: String, kind: FrameKind, payload: Bytes) {
		let _ = self.tx.send(RouterCmd::SendRaw { target_participant, kind, payload }).await;
	}
}
