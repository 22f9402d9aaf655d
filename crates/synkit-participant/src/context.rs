use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use bytes::{Bytes, BytesMut};

use synkit_discovery::DiscoveryHandle;
use synkit_lifecycle::LifecycleHandle;
use synkit_monitor::MonitorHandle;
use synkit_router::RouterHandle;
use synkit_timesync::TimeSyncHandle;
use synkit_wire::{FrameKind, LifecycleMessage, ParticipantDiscoveryEvent, WireEncode};

/// State shared by a participant's peer-link tasks and the handles it hands
/// out to callers. The lifecycle and time-sync services are created lazily
/// (`create_lifecycle_service`/`create_time_sync_service`), so they live
/// behind a [`OnceLock`]: a peer-link task that observes a `NextSimTask`
/// before time-sync is created for this participant simply has nowhere to
/// deliver it yet, and drops it.
pub(crate) struct ParticipantContext {
	pub(crate) name: String,
	pub(crate) router: RouterHandle,
	pub(crate) discovery: DiscoveryHandle,
	pub(crate) monitor: MonitorHandle,
	pub(crate) lifecycle: OnceLock<Arc<LifecycleHandle>>,
	pub(crate) time_sync: OnceLock<TimeSyncHandle>,
	peers: Mutex<HashSet<String>>,
	/// Every other participant already announced to the registry when this
	/// one joined: the workflow's required set, as far as this facade can
	/// observe it. Set once, right after the registry announce completes.
	required_peers: OnceLock<Vec<String>>,
}

impl ParticipantContext {
	pub(crate) fn new(name: String, router: RouterHandle, discovery: DiscoveryHandle, monitor: MonitorHandle) -> Self {
		Self {
			name,
			router,
			discovery,
			monitor,
			lifecycle: OnceLock::new(),
			time_sync: OnceLock::new(),
			peers: Mutex::new(HashSet::new()),
			required_peers: OnceLock::new(),
		}
	}

	pub(crate) fn set_required_peers(&self, names: Vec<String>) {
		let _ = self.required_peers.set(names);
	}

	pub(crate) fn required_peers(&self) -> Vec<String> {
		self.required_peers.get().cloned().unwrap_or_default()
	}

	pub(crate) fn add_peer(&self, participant_name: String) {
		self.peers.lock().unwrap().insert(participant_name);
	}

	pub(crate) fn remove_peer(&self, participant_name: &str) {
		self.peers.lock().unwrap().remove(participant_name);
	}

	pub(crate) fn known_peers(&self) -> Vec<String> {
		self.peers.lock().unwrap().iter().cloned().collect()
	}

	/// Broadcasts a pre-framed `FrameKind::Lifecycle` payload to every peer
	/// currently known to this participant.
	pub(crate) async fn broadcast_lifecycle(&self, message: &LifecycleMessage) {
		let mut buf = BytesMut::new();
		message.encode(&mut buf);
		let payload = buf.freeze();
		self.broadcast_raw(FrameKind::Lifecycle, payload).await;
	}

	pub(crate) async fn broadcast_discovery(&self, event: &ParticipantDiscoveryEvent) {
		let mut buf = BytesMut::new();
		event.encode(&mut buf);
		let payload = buf.freeze();
		self.broadcast_raw(FrameKind::Discovery, payload).await;
	}

	async fn broadcast_raw(&self, kind: FrameKind, payload: Bytes) {
		for peer in self.known_peers() {
			self.router.send_raw(peer, kind, payload.clone()).await;
		}
	}
}
