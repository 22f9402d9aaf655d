use tokio::sync::{oneshot, watch};

use synkit_wire::{ParticipantState, SystemCommand};

use crate::handlers::{AbortHook, Hook};

/// Commands for the lifecycle service actor.
pub enum LifecycleCmd {
	SetCommunicationReadyHandler(Hook),
	SetStartingHandler(Hook),
	SetStopHandler(Hook),
	SetShutdownHandler(Hook),
	SetAbortHandler(AbortHook),
	/// Begins the lifecycle: `ServicesCreated -> CommunicationInitializing
	/// -> ... `. Replies once a terminal state (`Shutdown`, `Error`, or
	/// `Aborted`) is reached.
	StartLifecycle { reply: oneshot::Sender<ParticipantState> },
	/// A command arriving from the system controller (Coordinated mode) or
	/// self-issued (Autonomous mode, or a Coordinated participant stopping
	/// itself).
	ReceiveSystemCommand(SystemCommand),
	/// Moves `Running -> Paused`.
	Pause { reason: String },
	/// Moves `Paused -> Running`.
	Continue,
	/// Requests the participant's own lifecycle stop with a reason,
	/// regardless of operation mode.
	Stop { reason: String },
	/// Reports an unrecoverable error from outside a handler (e.g. a
	/// protocol violation detected by another layer), forcing `Error`.
	ReportError { reason: String },
	/// Subscribes to this participant's own `ParticipantStatus` stream.
	SubscribeStatus { reply: oneshot::Sender<watch::Receiver<synkit_wire::ParticipantStatus>> },
}

impl std::fmt::Debug for LifecycleCmd {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LifecycleCmd::SetCommunicationReadyHandler(_) => write!(f, "SetCommunicationReadyHandler"),
			LifecycleCmd::SetStartingHandler(_) => write!(f, "SetStartingHandler"),
			LifecycleCmd::SetStopHandler(_) => write!(f, "SetStopHandler"),
			LifecycleCmd::SetShutdownHandler(_) => write!(f, "SetShutdownHandler"),
			LifecycleCmd::SetAbortHandler(_) => write!(f, "SetAbortHandler"),
			LifecycleCmd::StartLifecycle { .. } => write!(f, "StartLifecycle"),
			LifecycleCmd::ReceiveSystemCommand(cmd) => f.debug_tuple("ReceiveSystemCommand").field(&cmd.kind).finish(),
			LifecycleCmd::Pause { reason } => f.debug_struct("Pause").field("reason", reason).finish(),
			LifecycleCmd::Continue => write!(f, "Continue"),
			LifecycleCmd::Stop { reason } => f.debug_struct("Stop").field("reason", reason).finish(),
			LifecycleCmd::ReportError { reason } => f.debug_struct("ReportError").field("reason", reason).finish(),
			LifecycleCmd::SubscribeStatus { .. } => write!(f, "SubscribeStatus"),
		}
	}
}
