use std::collections::HashMap;

use tokio::sync::{mpsc, watch};

use synkit_wire::{ParticipantState, ParticipantStatus};

use crate::commands::MonitorCmd;
use crate::handle::MonitorHandle;
use crate::lattice::system_state;

const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Observes `ParticipantStatus` reports and republishes the overall system
/// state. Never issues a `SystemCommand` itself — that is the system
/// controller's job, wherever it lives; the monitor only watches.
pub struct MonitorService {
	rx: mpsc::Receiver<MonitorCmd>,
	required: Vec<String>,
	statuses: HashMap<String, ParticipantStatus>,
	system_state_tx: watch::Sender<ParticipantState>,
}

impl MonitorService {
	pub fn spawn() -> MonitorHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let (system_state_tx, _rx) = watch::channel(ParticipantState::Invalid);
		let service =
			MonitorService { rx, required: Vec::new(), statuses: HashMap::new(), system_state_tx };
		tokio::spawn(service.run());
		MonitorHandle::new(tx)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd);
		}
	}

	fn handle_command(&mut self, cmd: MonitorCmd) {
		match cmd {
			MonitorCmd::ReportStatus(status) => {
				self.statuses.insert(status.participant_name.clone(), status);
				self.recompute();
			}
			MonitorCmd::Forget { participant_name } => {
				self.statuses.remove(&participant_name);
				self.recompute();
			}
			MonitorCmd::SetRequiredParticipants(names) => {
				self.required = names;
				self.recompute();
			}
			MonitorCmd::SubscribeSystemState { reply } => {
				let _ = reply.send(self.system_state_tx.subscribe());
			}
			MonitorCmd::Snapshot { reply } => {
				let _ = reply.send(self.statuses.values().cloned().collect());
			}
		}
	}

	fn recompute(&mut self) {
		let relevant: Vec<ParticipantState> = if self.required.is_empty() {
			self.statuses.values().map(|s| s.state).collect()
		} else {
			// A required participant that hasn't reported yet counts as
			// `Invalid` — it drags the system-wide minimum down exactly as
			// if it had reported that state itself.
			self.required
				.iter()
				.map(|name| self.statuses.get(name).map(|s| s.state).unwrap_or(ParticipantState::Invalid))
				.collect()
		};
		let new_state = system_state(relevant);
		tracing::debug!(?new_state, "system state recomputed");
		self.system_state_tx.send_replace(new_state);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status(name: &str, state: ParticipantState) -> ParticipantStatus {
		ParticipantStatus {
			participant_name: name.to_string(),
			state,
			enter_reason: String::new(),
			enter_time: 0,
			refresh_time: 0,
		}
	}

	#[tokio::test]
	async fn system_state_is_minimum_of_required_participants() {
		let monitor = MonitorService::spawn();
		monitor.set_required_participants(vec!["A".into(), "B".into()]).await;

		let mut system = monitor.subscribe_system_state().await;
		monitor.report_status(status("A", ParticipantState::Running)).await;
		system.changed().await.unwrap();
		assert_eq!(*system.borrow(), ParticipantState::Invalid); // B not reported yet

		monitor.report_status(status("B", ParticipantState::ReadyToRun)).await;
		system.changed().await.unwrap();
		assert_eq!(*system.borrow(), ParticipantState::ReadyToRun);
	}

	#[tokio::test]
	async fn unreported_required_participant_holds_system_at_invalid() {
		let monitor = MonitorService::spawn();
		monitor.set_required_participants(vec!["A".into(), "B".into()]).await;
		monitor.report_status(status("A", ParticipantState::Running)).await;

		let system = monitor.subscribe_system_state().await;
		assert_eq!(*system.borrow(), ParticipantState::Invalid);
	}

	#[tokio::test]
	async fn one_participant_erroring_drags_system_to_error() {
		let monitor = MonitorService::spawn();
		monitor.set_required_participants(vec!["A".into(), "B".into()]).await;
		monitor.report_status(status("A", ParticipantState::Running)).await;

		let mut system = monitor.subscribe_system_state().await;
		monitor.report_status(status("B", ParticipantState::Error)).await;
		system.changed().await.unwrap();
		assert_eq!(*system.borrow(), ParticipantState::Error);
	}
}
