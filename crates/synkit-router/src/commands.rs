use std::sync::Arc;

use bytes::Bytes;
use synkit_transport::PeerHandle;
use synkit_wire::FrameKind;

use crate::handler::MessageHandler;

/// Which side initiated a peer connection. Used to break ties when both
/// ends of a (local, remote) pair establish a connection at the same time:
/// exactly one survives, chosen by lexicographic comparison of participant
/// names so both ends agree on the same connection without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
	/// This participant dialed the peer.
	Dialed,
	/// This participant accepted an inbound connection from the peer.
	Accepted,
}

/// Commands for the router service actor.
pub enum RouterCmd {
	/// Registers the outbound transport handle for a participant's peer
	/// connection, keyed by that participant's name.
	RegisterPeer { participant_name: String, handle: PeerHandle, direction: ConnectionDirection },
	/// Drops a peer, e.g. after it disconnects.
	UnregisterPeer { participant_name: String },
	/// Registers a local handler for a receiver index. `LIFECYCLE_RECEIVER_INDEX`
	/// is reserved for the lifecycle service itself.
	RegisterHandler { receiver_index: u16, handler: Arc<dyn MessageHandler> },
	/// Sends a message to a named participant's peer connection.
	Send { target_participant: String, receiver_index: u16, message_type: u8, payload: Bytes },
	/// Delivers an inbound `SimMessage` received from a peer to the locally
	/// registered handler for its receiver index, or to the lifecycle
	/// handler if `receiver_index` is the reserved lifecycle index.
	Dispatch { sender_participant: String, receiver_index: u16, message_type: u8, payload: Bytes },
	/// Sends a pre-framed payload of an arbitrary `FrameKind` directly to a
	/// named peer, bypassing the `SimMessage` envelope. Used for
	/// control-plane traffic (lifecycle, discovery) that isn't addressed by
	/// receiver index.
	SendRaw { target_participant: String, kind: FrameKind, payload: Bytes },
}

impl std::fmt::Debug for RouterCmd {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RouterCmd::RegisterPeer { participant_name, direction, .. } => f
				.debug_struct("RegisterPeer")
				.field("participant_name", participant_name)
				.field("direction", direction)
				.finish(),
			RouterCmd::UnregisterPeer { participant_name } => {
				f.debug_struct("UnregisterPeer").field("participant_name", participant_name).finish()
			}
			RouterCmd::RegisterHandler { receiver_index, .. } => {
				f.debug_struct("RegisterHandler").field("receiver_index", receiver_index).finish()
			}
			RouterCmd::Send { target_participant, receiver_index, .. } => f
				.debug_struct("Send")
				.field("target_participant", target_participant)
				.field("receiver_index", receiver_index)
				.finish(),
			RouterCmd::Dispatch { sender_participant, receiver_index, .. } => f
				.debug_struct("Dispatch")
				.field("sender_participant", sender_participant)
				.field("receiver_index", receiver_index)
				.finish(),
			RouterCmd::SendRaw { target_participant, kind, .. } => f
				.debug_struct("SendRaw")
				.field("target_participant", target_participant)
				.field("kind", kind)
				.finish(),
		}
	}
}
