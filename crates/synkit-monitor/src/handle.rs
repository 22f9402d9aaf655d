use tokio::sync::{mpsc, oneshot, watch};

use synkit_wire::{ParticipantState, ParticipantStatus};

use crate::commands::MonitorCmd;

/// A cheaply cloneable handle to the system monitor actor.
#[derive(Clone)]
pub struct MonitorHandle {
	tx: mpsc::Sender<MonitorCmd>,
}

impl MonitorHandle {
	pub(crate) fn new(tx: mpsc::Sender<MonitorCmd>) -> Self {
		Self { tx }
	}

	pub async fn report_status(&self, status: ParticipantStatus) {
		let _ = self.tx.send(MonitorCmd::ReportStatus(status)).await;
	}

	pub async fn forget(&self, participant_name: String) {
		let _ = self.tx.send(MonitorCmd::Forget { participant_name }).await;
	}

	pub async fn set_required_participants(&self, names: Vec<String>) {
		let _ = self.tx.send(MonitorCmd::SetRequiredParticipants(names)).await;
	}

	pub async fn subscribe_system_state(&self) -> watch::Receiver<ParticipantState> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(MonitorCmd::SubscribeSystemState { reply }).await.is_err() {
			return watch::channel(ParticipantState::Invalid).1;
		}
		rx.await.unwrap_or_else(|_| watch::channel(ParticipantState::Invalid).1)
	}

	pub async fn snapshot(&self) -> Vec<ParticipantStatus> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(MonitorCmd::Snapshot { reply }).await.is_err() {
			return Vec::new();
		}
		rx.await.unwrap_or_default()
	}
}
