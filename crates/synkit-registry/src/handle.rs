use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use synkit_transport::PeerHandle;
use synkit_wire::{Announcement, FrameKind};

use crate::commands::RegistryCmd;

/// A cheaply cloneable handle to the registry actor.
#[derive(Clone)]
pub struct RegistryHandle {
	tx: mpsc::Sender<RegistryCmd>,
}

impl RegistryHandle {
	pub(crate) fn new(tx: mpsc::Sender<RegistryCmd>) -> Self {
		Self { tx }
	}

	/// Registers a newly announced participant and returns the set of
	/// participants already known to the registry.
	pub async fn announce(&self, announcement: Announcement, handle: PeerHandle) -> Vec<Announcement> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(RegistryCmd::Announce { announcement, handle, reply }).await.is_err() {
			return Vec::new();
		}
		rx.await.unwrap_or_default()
	}

	pub async fn disconnected(&self, participant_name: String) {
		let _ = self.tx.send(RegistryCmd::Disconnected { participant_name }).await;
	}

	/// Waits until all currently-connected participants have disconnected,
	/// after having had at least one connect.
	pub async fn wait_all_participants_down(&self) {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(RegistryCmd::WaitAllParticipantsDown { reply }).await.is_err() {
			return;
		}
		let _ = rx.await;
	}

	pub async fn connected_names(&self) -> Vec<String> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(RegistryCmd::ConnectedNames { reply }).await.is_err() {
			return Vec::new();
		}
		rx.await.unwrap_or_default()
	}

	/// Relays `payload` from `from` to `to` specifically. Fire-and-forget;
	/// use direct peer connections when possible instead of leaning on this
	/// fallback.
	pub async fn proxy_frame(&self, from: String, to: String, kind: FrameKind, payload: Bytes, hop_count: u8) {
		let _ = self.tx.send(RegistryCmd::ProxyFrame { from, to, kind, payload, hop_count }).await;
	}
}
