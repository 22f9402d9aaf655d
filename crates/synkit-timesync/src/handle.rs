use tokio::sync::{mpsc, oneshot, watch};

use synkit_wire::NextSimTask;

use crate::commands::TimeSyncCmd;
use crate::step::StepHandler;
use crate::types::AdvanceMode;

/// A cheaply cloneable handle to a participant's time-sync barrier actor.
#[derive(Clone)]
pub struct TimeSyncHandle {
	tx: mpsc::Sender<TimeSyncCmd>,
}

impl TimeSyncHandle {
	pub(crate) fn new(tx: mpsc::Sender<TimeSyncCmd>) -> Self {
		Self { tx }
	}

	pub async fn set_step_handler(&self, handler: StepHandler) {
		let _ = self.tx.send(TimeSyncCmd::SetStepHandler(handler)).await;
	}

	/// Takes effect from the step after the one currently in flight.
	pub async fn set_step_duration(&self, duration: i64) {
		let _ = self.tx.send(TimeSyncCmd::SetStepDuration(duration)).await;
	}

	pub async fn set_advance_mode(&self, mode: AdvanceMode) {
		let _ = self.tx.send(TimeSyncCmd::SetAdvanceMode(mode)).await;
	}

	pub async fn set_animation_factor(&self, factor: f64) {
		let _ = self.tx.send(TimeSyncCmd::SetAnimationFactor(factor)).await;
	}

	pub async fn set_required_peers(&self, peers: Vec<String>) {
		let _ = self.tx.send(TimeSyncCmd::SetRequiredPeers(peers)).await;
	}

	pub async fn start(&self) {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(TimeSyncCmd::Start { reply }).await.is_err() {
			return;
		}
		let _ = rx.await;
	}

	pub async fn receive_peer_task(&self, peer: String, task: NextSimTask) {
		let _ = self.tx.send(TimeSyncCmd::ReceivePeerTask { peer, task }).await;
	}

	pub async fn complete_simulation_step(&self) {
		let _ = self.tx.send(TimeSyncCmd::CompleteSimulationStep).await;
	}

	pub async fn abort(&self) {
		let _ = self.tx.send(TimeSyncCmd::Abort).await;
	}

	pub async fn subscribe_now(&self) -> watch::Receiver<i64> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(TimeSyncCmd::SubscribeNow { reply }).await.is_err() {
			return watch::channel(0).1;
		}
		rx.await.unwrap_or_else(|_| watch::channel(0).1)
	}

	/// Subscribes to this participant's own outbound `NextSimTask` stream,
	/// for whatever transport layer forwards it on to peers.
	pub async fn subscribe_outbound(&self) -> watch::Receiver<Option<NextSimTask>> {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(TimeSyncCmd::SubscribeOutbound { reply }).await.is_err() {
			return watch::channel(None).1;
		}
		rx.await.unwrap_or_else(|_| watch::channel(None).1)
	}
}
