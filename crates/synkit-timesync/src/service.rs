use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use synkit_wire::NextSimTask;

use crate::commands::TimeSyncCmd;
use crate::handle::TimeSyncHandle;
use crate::step::StepHandler;
use crate::types::{AdvanceMode, TimeSyncConfig};

const COMMAND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, PartialEq, Eq)]
enum Phase {
	Idle,
	/// Our own `NextSimTask` for this round has been emitted; waiting on
	/// the required peers to emit theirs.
	WaitingForPeers,
	/// All required peers have reported; the step handler is running in
	/// the background and we're waiting for `CompleteSimulationStep`.
	StepInProgress,
	Aborted,
}

/// Drives one participant's side of the virtual-time barrier. Every other
/// time-synchronized participant runs the identical state machine; the
/// barrier itself has no central coordinator, only peer-to-peer
/// `NextSimTask` exchange.
pub struct TimeSyncService {
	rx: mpsc::Receiver<TimeSyncCmd>,
	handle: TimeSyncHandle,
	step_duration: i64,
	next_step_duration: Option<i64>,
	advance_mode: AdvanceMode,
	animation_factor: f64,
	required_peers: Vec<String>,
	received: HashMap<String, NextSimTask>,
	now: i64,
	phase: Phase,
	step_handler: Option<StepHandler>,
	now_tx: watch::Sender<i64>,
	outbound_tx: watch::Sender<Option<NextSimTask>>,
}

impl TimeSyncService {
	pub fn spawn(config: TimeSyncConfig) -> TimeSyncHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let handle = TimeSyncHandle::new(tx);
		let (now_tx, _) = watch::channel(0);
		let (outbound_tx, _) = watch::channel(None);
		let service = TimeSyncService {
			rx,
			handle: handle.clone(),
			step_duration: config.step_duration,
			next_step_duration: None,
			advance_mode: config.advance_mode,
			animation_factor: config.animation_factor,
			required_peers: Vec::new(),
			received: HashMap::new(),
			now: 0,
			phase: Phase::Idle,
			step_handler: None,
			now_tx,
			outbound_tx,
		};
		tokio::spawn(service.run());
		handle
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd);
		}
	}

	fn handle_command(&mut self, cmd: TimeSyncCmd) {
		match cmd {
			TimeSyncCmd::SetStepHandler(h) => self.step_handler = Some(h),
			TimeSyncCmd::SetStepDuration(d) => self.next_step_duration = Some(d),
			TimeSyncCmd::SetAdvanceMode(m) => self.advance_mode = m,
			TimeSyncCmd::SetAnimationFactor(f) => self.animation_factor = f,
			TimeSyncCmd::SetRequiredPeers(p) => self.required_peers = p,
			TimeSyncCmd::Start { reply } => {
				if self.phase == Phase::Idle {
					self.emit_own_task();
					self.try_advance();
				}
				let _ = reply.send(());
			}
			TimeSyncCmd::ReceivePeerTask { peer, task } => {
				self.received.insert(peer, task);
				self.try_advance();
			}
			TimeSyncCmd::CompleteSimulationStep => {
				if self.phase == Phase::StepInProgress {
					self.phase = Phase::WaitingForPeers;
					self.emit_own_task();
					self.try_advance();
				}
			}
			TimeSyncCmd::Abort => {
				self.phase = Phase::Aborted;
				tracing::debug!("time-sync barrier aborted");
			}
			TimeSyncCmd::SubscribeNow { reply } => {
				let _ = reply.send(self.now_tx.subscribe());
			}
			TimeSyncCmd::SubscribeOutbound { reply } => {
				let _ = reply.send(self.outbound_tx.subscribe());
			}
		}
	}

	fn emit_own_task(&mut self) {
		let task = NextSimTask { time_point: self.now + self.step_duration, duration: self.step_duration };
		self.outbound_tx.send_replace(Some(task));
		self.phase = Phase::WaitingForPeers;
	}

	fn own_task(&self) -> NextSimTask {
		self.outbound_tx.borrow().expect("own task emitted before waiting for peers")
	}

	fn try_advance(&mut self) {
		if self.phase != Phase::WaitingForPeers {
			return;
		}
		if !self.required_peers.iter().all(|p| self.received.contains_key(p)) {
			return;
		}

		let own = self.own_task();
		let new_now = match self.advance_mode {
			AdvanceMode::ByMinimalDuration => self
				.required_peers
				.iter()
				.filter_map(|p| self.received.get(p))
				.map(|t| t.time_point)
				.chain(std::iter::once(own.time_point))
				.min()
				.unwrap_or(own.time_point),
			AdvanceMode::ByOwnDuration => own.time_point,
		};

		let effective_duration = self.next_step_duration.take().unwrap_or(self.step_duration);
		let old_now = self.now;
		self.now = new_now;
		self.step_duration = effective_duration;
		self.now_tx.send_replace(new_now);
		self.received.clear();
		self.phase = Phase::StepInProgress;

		let wall_delay = if self.animation_factor > 0.0 {
			let virtual_delta = (new_now - old_now).max(0) as f64;
			Some(Duration::from_secs_f64(self.animation_factor * virtual_delta))
		} else {
			None
		};

		let Some(handler) = self.step_handler.clone() else {
			// No handler registered: complete the step immediately so the
			// barrier doesn't stall forever.
			self.phase = Phase::WaitingForPeers;
			self.emit_own_task();
			return;
		};
		let handle = self.handle.clone();
		tokio::spawn(async move {
			if let Some(delay) = wall_delay {
				tokio::time::sleep(delay).await;
			}
			// The handler covers the interval [old_now, old_now + duration);
			// `new_now` becomes `self.now` for the round after this one, not
			// the time this invocation reports itself as running at.
			handler(old_now, effective_duration, handle).await;
		});
	}
}
