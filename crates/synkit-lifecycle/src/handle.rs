use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use synkit_wire::{ParticipantState, ParticipantStatus, SystemCommand};

use crate::commands::LifecycleCmd;
use crate::handlers::{AbortHook, Hook};

/// A cheaply cloneable handle to a participant's lifecycle actor.
#[derive(Clone)]
pub struct LifecycleHandle {
	tx: mpsc::Sender<LifecycleCmd>,
}

impl LifecycleHandle {
	pub(crate) fn new(tx: mpsc::Sender<LifecycleCmd>) -> Self {
		Self { tx }
	}

	pub async fn set_communication_ready_handler(&self, handler: Hook) {
		let _ = self.tx.send(LifecycleCmd::SetCommunicationReadyHandler(handler)).await;
	}

	pub async fn set_starting_handler(&self, handler: Hook) {
		let _ = self.tx.send(LifecycleCmd::SetStartingHandler(handler)).await;
	}

	pub async fn set_stop_handler(&self, handler: Hook) {
		let _ = self.tx.send(LifecycleCmd::SetStopHandler(handler)).await;
	}

	pub async fn set_shutdown_handler(&self, handler: Hook) {
		let _ = self.tx.send(LifecycleCmd::SetShutdownHandler(handler)).await;
	}

	pub async fn set_abort_handler(&self, handler: AbortHook) {
		let _ = self.tx.send(LifecycleCmd::SetAbortHandler(handler)).await;
	}

	/// Starts the lifecycle immediately in the background and returns a
	/// handle to its eventual terminal state, mirroring the "returns a
	/// future that resolves to the final state" contract of
	/// `StartLifecycle`.
	pub fn start_lifecycle(&self) -> JoinHandle<ParticipantState> {
		let tx = self.tx.clone();
		tokio::spawn(async move {
			let (reply, rx) = oneshot::channel();
			if tx.send(LifecycleCmd::StartLifecycle { reply }).await.is_err() {
				return ParticipantState::Error;
			}
			rx.await.unwrap_or(ParticipantState::Error)
		})
	}

	pub async fn send_system_command(&self, command: SystemCommand) {
		let _ = self.tx.send(LifecycleCmd::ReceiveSystemCommand(command)).await;
	}

	pub async fn pause(&self, reason: String) {
		let _ = self.tx.send(LifecycleCmd::Pause { reason }).await;
	}

	pub async fn resume(&self) {
		let _ = self.tx.send(LifecycleCmd::Continue).await;
	}

	pub async fn stop(&self, reason: String) {
		let _ = self.tx.send(LifecycleCmd::Stop { reason }).await;
	}

	pub async fn report_error(&self, reason: String) {
		let _ = self.tx.send(LifecycleCmd::ReportError { reason }).await;
	}

	pub async fn subscribe_status(&self) -> watch::Receiver<ParticipantStatus> {
		let (reply, rx) = oneshot::channel();
		let _ = self.tx.send(LifecycleCmd::SubscribeStatus { reply }).await;
		rx.await.unwrap_or_else(|_| {
			let (_tx, rx) = watch::channel(ParticipantStatus {
				participant_name: String::new(),
				state: ParticipantState::Error,
				enter_reason: "lifecycle service unavailable".to_string(),
				enter_time: 0,
				refresh_time: 0,
			});
			rx
		})
	}
}
