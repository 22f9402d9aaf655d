use tokio::sync::{oneshot, watch};

use synkit_wire::NextSimTask;

use crate::step::StepHandler;
use crate::types::AdvanceMode;

pub enum TimeSyncCmd {
	SetStepHandler(StepHandler),
	SetStepDuration(i64),
	SetAdvanceMode(AdvanceMode),
	SetAnimationFactor(f64),
	SetRequiredPeers(Vec<String>),
	/// Kicks off the first step. Resolves once the barrier has emitted its
	/// first `NextSimTask`.
	Start { reply: oneshot::Sender<()> },
	/// An inbound `NextSimTask` observed from a required peer.
	ReceivePeerTask { peer: String, task: NextSimTask },
	/// Signals that the in-flight step handler is done.
	CompleteSimulationStep,
	/// Cancels any in-flight step and stops participating in the barrier.
	/// Implicitly invoked when the lifecycle leaves `Running`.
	Abort,
	SubscribeNow { reply: oneshot::Sender<watch::Receiver<i64>> },
	SubscribeOutbound { reply: oneshot::Sender<watch::Receiver<Option<NextSimTask>>> },
}

impl std::fmt::Debug for TimeSyncCmd {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TimeSyncCmd::SetStepHandler(_) => f.write_str("SetStepHandler(..)"),
			TimeSyncCmd::SetStepDuration(d) => f.debug_tuple("SetStepDuration").field(d).finish(),
			TimeSyncCmd::SetAdvanceMode(m) => f.debug_tuple("SetAdvanceMode").field(m).finish(),
			TimeSyncCmd::SetAnimationFactor(a) => {
				f.debug_tuple("SetAnimationFactor").field(a).finish()
			}
			TimeSyncCmd::SetRequiredPeers(p) => f.debug_tuple("SetRequiredPeers").field(p).finish(),
			TimeSyncCmd::Start { .. } => f.write_str("Start"),
			TimeSyncCmd::ReceivePeerTask { peer, task } => {
				f.debug_struct("ReceivePeerTask").field("peer", peer).field("task", task).finish()
			}
			TimeSyncCmd::CompleteSimulationStep => f.write_str("CompleteSimulationStep"),
			TimeSyncCmd::Abort => f.write_str("Abort"),
			TimeSyncCmd::SubscribeNow { .. } => f.write_str("SubscribeNow"),
			TimeSyncCmd::SubscribeOutbound { .. } => f.write_str("SubscribeOutbound"),
		}
	}
}
