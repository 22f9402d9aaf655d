use tokio::sync::{oneshot, watch};

use synkit_wire::ServiceDescriptor;

/// Commands for the discovery service actor.
#[derive(Debug)]
pub enum DiscoveryCmd {
	/// Publish or update a descriptor. Republishing the same
	/// `(participant_name, service_name)` pair updates it in place,
	/// preserving its position among the publishing peer's own services.
	Publish { descriptor: ServiceDescriptor },
	/// Withdraw every descriptor published by a participant, called when
	/// its connection is lost.
	WithdrawParticipant { participant_name: String },
	/// Subscribe to the live descriptor set. The returned watch channel
	/// already holds the current snapshot, giving a late joiner the
	/// history-1 replay it needs without an extra round trip.
	Subscribe { reply: oneshot::Sender<watch::Receiver<Vec<ServiceDescriptor>>> },
}
