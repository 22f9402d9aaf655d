/// How the barrier derives the next virtual-time point from the
/// `NextSimTask` values it has collected from required peers this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceMode {
	/// All peers tick together at the slowest required peer's rate.
	ByMinimalDuration,
	/// Advances by this participant's own step size regardless of slower
	/// peers, for heterogeneous step sizes.
	ByOwnDuration,
}

/// Static configuration a time-sync service is created with; `step_duration`
/// may later be changed in flight via `SetStepDuration`.
#[derive(Debug, Clone)]
pub struct TimeSyncConfig {
	pub step_duration: i64,
	pub advance_mode: AdvanceMode,
	/// Wall-clock seconds per unit of virtual time. Zero disables pacing.
	pub animation_factor: f64,
}

impl TimeSyncConfig {
	pub fn new(step_duration: i64, advance_mode: AdvanceMode) -> Self {
		Self { step_duration, advance_mode, animation_factor: 0.0 }
	}
}
