use tokio::sync::{mpsc, watch};

use synkit_wire::ServiceDescriptor;

use crate::commands::DiscoveryCmd;
use crate::handle::DiscoveryHandle;

const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Owns the live set of published [`ServiceDescriptor`]s and fans out
/// updates through a `watch` channel, which naturally gives late
/// subscribers the history-1 replay they need.
pub struct DiscoveryService {
	rx: mpsc::Receiver<DiscoveryCmd>,
	descriptors: Vec<ServiceDescriptor>,
	publish: watch::Sender<Vec<ServiceDescriptor>>,
}

impl DiscoveryService {
	pub fn spawn() -> DiscoveryHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let (publish, _subscribe) = watch::channel(Vec::new());
		let service = DiscoveryService { rx, descriptors: Vec::new(), publish };
		tokio::spawn(service.run());
		DiscoveryHandle::new(tx)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd);
		}
	}

	fn handle_command(&mut self, cmd: DiscoveryCmd) {
		match cmd {
			DiscoveryCmd::Publish { descriptor } => {
				if let Some(existing) = self.descriptors.iter_mut().find(|d| {
					d.participant_name == descriptor.participant_name && d.service_name == descriptor.service_name
				}) {
					*existing = descriptor;
				} else {
					tracing::debug!(
						participant = %descriptor.participant_name,
						service = %descriptor.service_name,
						"service descriptor published",
					);
					self.descriptors.push(descriptor);
				}
				self.publish.send_replace(self.descriptors.clone());
			}
			DiscoveryCmd::WithdrawParticipant { participant_name } => {
				self.descriptors.retain(|d| d.participant_name != participant_name);
				self.publish.send_replace(self.descriptors.clone());
			}
			DiscoveryCmd::Subscribe { reply } => {
				let _ = reply.send(self.publish.subscribe());
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use indexmap::IndexMap;

	use super::*;

	fn descriptor(participant: &str, service: &str) -> ServiceDescriptor {
		ServiceDescriptor {
			network_name: "PowertrainCAN1".into(),
			media_type: "CAN".into(),
			supplemental_labels: IndexMap::new(),
			participant_name: participant.into(),
			service_name: service.into(),
		}
	}

	#[tokio::test]
	async fn late_subscriber_sees_current_snapshot_immediately() {
		let discovery = DiscoveryService::spawn();
		discovery.publish(descriptor("ECU1", "Can1")).await;

		let rx = discovery.subscribe().await;
		assert_eq!(rx.borrow().len(), 1);
	}

	#[tokio::test]
	async fn subscriber_observes_subsequent_publishes() {
		let discovery = DiscoveryService::spawn();
		let mut rx = discovery.subscribe().await;

		discovery.publish(descriptor("ECU1", "Can1")).await;
		rx.changed().await.unwrap();
		assert_eq!(rx.borrow().len(), 1);
	}

	#[tokio::test]
	async fn republishing_same_service_updates_in_place() {
		let discovery = DiscoveryService::spawn();
		discovery.publish(descriptor("ECU1", "Can1")).await;
		discovery.publish(descriptor("ECU1", "Can1")).await;

		let rx = discovery.subscribe().await;
		assert_eq!(rx.borrow().len(), 1);
	}

	#[tokio::test]
	async fn withdraw_participant_removes_its_descriptors() {
		let discovery = DiscoveryService::spawn();
		discovery.publish(descriptor("ECU1", "Can1")).await;
		discovery.publish(descriptor("ECU2", "Can2")).await;

		discovery.withdraw_participant("ECU1".to_string()).await;

		let rx = discovery.subscribe().await;
		let remaining = rx.borrow();
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].participant_name, "ECU2");
	}
}
