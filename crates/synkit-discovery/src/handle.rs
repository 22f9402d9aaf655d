use tokio::sync::{mpsc, oneshot, watch};

use synkit_wire::ServiceDescriptor;

use crate::commands::DiscoveryCmd;
use crate::matching::DescriptorQuery;

/// A cheaply cloneable handle to the discovery actor.
#[derive(Clone)]
pub struct DiscoveryHandle {
	tx: mpsc::Sender<DiscoveryCmd>,
}

impl DiscoveryHandle {
	pub(crate) fn new(tx: mpsc::Sender<DiscoveryCmd>) -> Self {
		Self { tx }
	}

	pub async fn publish(&self, descriptor: ServiceDescriptor) {
		let _ = self.tx.send(DiscoveryCmd::Publish { descriptor }).await;
	}

	pub async fn withdraw_participant(&self, participant_name: String) {
		let _ = self.tx.send(DiscoveryCmd::WithdrawParticipant { participant_name }).await;
	}

	/// Subscribes to the descriptor set. The returned receiver's current
	/// value is the full snapshot known at subscribe time; call
	/// `changed().await` to wait for updates.
	///
	/// Returns a receiver over an empty, static snapshot if the service has
	/// already shut down.
	pub async fn subscribe(&self) -> watch::Receiver<Vec<ServiceDescriptor>> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(DiscoveryCmd::Subscribe { reply }).await.is_err() {
			return watch::channel(Vec::new()).1;
		}
		rx.await.unwrap_or_else(|_| watch::channel(Vec::new()).1)
	}

	/// Returns the current snapshot of descriptors matching `query`. Built on
	/// `subscribe` rather than a dedicated round trip: the watch channel's
	/// current value already holds the live snapshot.
	pub async fn resolve(&self, query: &DescriptorQuery) -> Vec<ServiceDescriptor> {
		let rx = self.subscribe().await;
		rx.borrow().iter().filter(|descriptor| query.matches(descriptor)).cloned().collect()
	}
}
