use bytes::Bytes;
use tokio::sync::oneshot;

use synkit_transport::PeerHandle;
use synkit_wire::{Announcement, FrameKind};

/// Commands for the registry service actor.
#[derive(Debug)]
pub enum RegistryCmd {
	/// A participant announced itself on a freshly accepted connection.
	///
	/// Replies with the participants already known to the registry, which
	/// the caller forwards back as `KnownParticipants` so the newcomer can
	/// dial them directly.
	Announce {
		announcement: Announcement,
		handle: PeerHandle,
		reply: oneshot::Sender<Vec<Announcement>>,
	},
	/// A connection was lost or closed cleanly.
	Disconnected { participant_name: String },
	/// Resolves once every currently-connected participant has disconnected,
	/// after at least one had connected.
	WaitAllParticipantsDown { reply: oneshot::Sender<()> },
	/// Snapshot of currently connected participant names, for tests and
	/// diagnostics.
	ConnectedNames { reply: oneshot::Sender<Vec<String>> },
	/// Fallback proxying: relay a frame from `from` to `to` specifically,
	/// for a pair of participants that cannot dial each other directly.
	/// `hop_count` is the value carried by the inbound `Relay` message;
	/// the registry increments it before forwarding.
	ProxyFrame { from: String, to: String, kind: FrameKind, payload: Bytes, hop_count: u8 },
}
