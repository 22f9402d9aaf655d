use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};

use synkit_wire::{ParticipantState, ParticipantStatus, SystemCommand, SystemCommandKind};

use crate::commands::LifecycleCmd;
use crate::handle::LifecycleHandle;
use crate::handlers::HandlerSet;
use crate::types::{LifecycleConfiguration, OperationMode};

const COMMAND_QUEUE_CAPACITY: usize = 64;

fn is_terminal(state: ParticipantState) -> bool {
	matches!(state, ParticipantState::Shutdown | ParticipantState::Error | ParticipantState::Aborted)
}

/// Drives one participant through the lifecycle state machine. Grounded on
/// the same single-loop actor shape used throughout the fabric: every
/// transition happens on this task, so there is never a concurrent-mutation
/// hazard between e.g. a `Stop` and an `AbortSimulation` arriving at once.
pub struct LifecycleService {
	rx: mpsc::Receiver<LifecycleCmd>,
	participant_name: String,
	config: LifecycleConfiguration,
	state: ParticipantState,
	handlers: HandlerSet,
	status_tx: watch::Sender<ParticipantStatus>,
	start_reply: Option<oneshot::Sender<ParticipantState>>,
	clock: Instant,
	/// The workflow's required peer set. In Coordinated mode,
	/// `CommunicationInitializing` cannot fire until every name here is
	/// also in `connected_participants`.
	required_participants: Vec<String>,
	connected_participants: HashSet<String>,
}

impl LifecycleService {
	/// `required_participants` and `connected_participants` together gate
	/// the automatic `ServicesCreated -> CommunicationInitializing`
	/// transition for Coordinated participants: it fires only once every
	/// required name is already connected. Autonomous participants are
	/// never gated by peer connectivity.
	pub fn spawn(
		participant_name: String,
		config: LifecycleConfiguration,
		required_participants: Vec<String>,
		connected_participants: Vec<String>,
	) -> LifecycleHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let initial = ParticipantStatus {
			participant_name: participant_name.clone(),
			state: ParticipantState::Invalid,
			enter_reason: String::new(),
			enter_time: 0,
			refresh_time: 0,
		};
		let (status_tx, _status_rx) = watch::channel(initial);
		let service = LifecycleService {
			rx,
			participant_name,
			config,
			state: ParticipantState::Invalid,
			handlers: HandlerSet::default(),
			status_tx,
			start_reply: None,
			clock: Instant::now(),
			required_participants,
			connected_participants: connected_participants.into_iter().collect(),
		};
		tokio::spawn(service.run());
		LifecycleHandle::new(tx)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd).await;
			if is_terminal(self.state) {
				if let Some(reply) = self.start_reply.take() {
					let _ = reply.send(self.state);
				}
				break;
			}
		}
	}

	async fn handle_command(&mut self, cmd: LifecycleCmd) {
		match cmd {
			LifecycleCmd::SetCommunicationReadyHandler(h) => self.handlers.communication_ready = Some(h),
			LifecycleCmd::SetStartingHandler(h) => self.handlers.starting = Some(h),
			LifecycleCmd::SetStopHandler(h) => self.handlers.stop = Some(h),
			LifecycleCmd::SetShutdownHandler(h) => self.handlers.shutdown = Some(h),
			LifecycleCmd::SetAbortHandler(h) => self.handlers.abort = Some(h),
			LifecycleCmd::StartLifecycle { reply } => {
				self.start_reply = Some(reply);
				self.begin().await;
			}
			LifecycleCmd::ReceiveSystemCommand(cmd) => self.on_system_command(cmd).await,
			LifecycleCmd::Pause { reason } => self.pause(reason).await,
			LifecycleCmd::Continue => self.resume().await,
			LifecycleCmd::Stop { reason } => self.stop(reason).await,
			LifecycleCmd::ReportError { reason } => self.transition(ParticipantState::Error, reason),
			LifecycleCmd::SubscribeStatus { reply } => {
				let _ = reply.send(self.status_tx.subscribe());
			}
		}
	}

	async fn begin(&mut self) {
		if self.state != ParticipantState::Invalid {
			tracing::warn!(state = ?self.state, "StartLifecycle called outside Invalid state, ignoring");
			return;
		}
		self.transition(ParticipantState::ServicesCreated, "services created");

		let autonomous = self.config.operation_mode == OperationMode::Autonomous;
		let missing: Vec<&String> =
			self.required_participants.iter().filter(|name| !self.connected_participants.contains(*name)).collect();
		if !autonomous && !missing.is_empty() {
			tracing::warn!(
				participant = %self.participant_name,
				missing = ?missing,
				"required peers not yet connected, staying at ServicesCreated",
			);
			return;
		}

		self.transition(ParticipantState::CommunicationInitializing, "initializing communication");
		if let Some(h) = self.handlers.communication_ready.clone() {
			h().await;
		}
		self.transition(ParticipantState::CommunicationInitialized, "communication initialized");
		self.transition(ParticipantState::ReadyToRun, "ready to run");

		if autonomous {
			self.run_starting().await;
		}
	}

	async fn run_starting(&mut self) {
		if self.state != ParticipantState::ReadyToRun {
			tracing::warn!(state = ?self.state, "starting requested outside ReadyToRun, ignoring");
			return;
		}
		if let Some(h) = self.handlers.starting.clone() {
			h().await;
		}
		self.transition(ParticipantState::Running, "running");
	}

	async fn on_system_command(&mut self, cmd: SystemCommand) {
		match cmd.kind {
			SystemCommandKind::Run => {
				if self.config.operation_mode == OperationMode::Coordinated {
					self.run_starting().await;
				} else {
					tracing::warn!("Run command ignored in Autonomous mode");
				}
			}
			SystemCommandKind::Stop => self.stop("system controller requested stop".to_string()).await,
			SystemCommandKind::Shutdown => self.shutdown().await,
			SystemCommandKind::AbortSimulation => self.abort("system controller requested abort".to_string()).await,
			SystemCommandKind::Invalid => {}
		}
	}

	async fn pause(&mut self, reason: String) {
		if self.state != ParticipantState::Running {
			tracing::warn!(state = ?self.state, "Pause requested outside Running, ignoring");
			return;
		}
		self.transition(ParticipantState::Paused, reason);
	}

	async fn resume(&mut self) {
		if self.state != ParticipantState::Paused {
			tracing::warn!(state = ?self.state, "Continue requested outside Paused, ignoring");
			return;
		}
		self.transition(ParticipantState::Running, "resumed");
	}

	async fn stop(&mut self, reason: String) {
		if !matches!(self.state, ParticipantState::Running | ParticipantState::Paused | ParticipantState::ReadyToRun) {
			tracing::warn!(state = ?self.state, "Stop requested from a state that cannot stop, ignoring");
			return;
		}
		self.transition(ParticipantState::Stopping, reason.clone());
		if let Some(h) = self.handlers.stop.clone() {
			h().await;
		}
		self.transition(ParticipantState::Stopped, reason);
	}

	async fn shutdown(&mut self) {
		if is_terminal(self.state) {
			return;
		}
		self.transition(ParticipantState::ShuttingDown, "shutting down");
		if let Some(h) = self.handlers.shutdown.clone() {
			h().await;
		}
		self.transition(ParticipantState::Shutdown, "shutdown complete");
	}

	async fn abort(&mut self, reason: String) {
		if is_terminal(self.state) {
			return;
		}
		self.transition(ParticipantState::Aborting, reason.clone());
		if let Some(h) = self.handlers.abort.clone() {
			h(reason.clone()).await;
		}
		self.transition(ParticipantState::Aborted, reason);
	}

	fn transition(&mut self, state: ParticipantState, reason: impl Into<String>) {
		let now = self.clock.elapsed().as_nanos() as i64;
		let reason = reason.into();
		tracing::info!(participant = %self.participant_name, from = ?self.state, to = ?state, %reason, "lifecycle transition");
		self.state = state;
		let status = ParticipantStatus {
			participant_name: self.participant_name.clone(),
			state,
			enter_reason: reason,
			enter_time: now,
			refresh_time: now,
		};
		self.status_tx.send_replace(status);
	}
}
