use tokio::sync::{oneshot, watch};

use synkit_wire::{ParticipantState, ParticipantStatus};

#[derive(Debug)]
pub enum MonitorCmd {
	/// Records a participant's latest status report.
	ReportStatus(ParticipantStatus),
	/// Drops a participant from the required set, e.g. after it fully
	/// disconnects. Past reports are not otherwise aged out.
	Forget { participant_name: String },
	/// Fixes the set of participants the overall system state is computed
	/// over, per the workflow configuration.
	SetRequiredParticipants(Vec<String>),
	SubscribeSystemState { reply: oneshot::Sender<watch::Receiver<ParticipantState>> },
	Snapshot { reply: oneshot::Sender<Vec<ParticipantStatus>> },
}
