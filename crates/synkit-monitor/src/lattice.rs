use synkit_wire::ParticipantState;

/// Reduces a set of participant states to the overall system state.
///
/// Ordinarily the system state is the lattice minimum — the
/// least-progressed state among the required participants, since the
/// system as a whole can't be said to have reached `Running` until
/// everyone has. `Error` and `Aborting`/`Aborted` break that rule: any one
/// participant in those states drags the whole system there immediately,
/// `Error` taking precedence over an abort in progress.
pub fn system_state(states: impl IntoIterator<Item = ParticipantState>) -> ParticipantState {
	let mut saw_aborted = false;
	let mut saw_aborting = false;
	let mut rest = Vec::new();

	for state in states {
		match state {
			ParticipantState::Error => return ParticipantState::Error,
			ParticipantState::Aborted => saw_aborted = true,
			ParticipantState::Aborting => saw_aborting = true,
			other => rest.push(other),
		}
	}

	if saw_aborted {
		return ParticipantState::Aborted;
	}
	if saw_aborting {
		return ParticipantState::Aborting;
	}

	rest.into_iter().min_by_key(|s| *s as u8).unwrap_or(ParticipantState::Invalid)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ParticipantState::*;

	#[test]
	fn empty_set_is_invalid() {
		assert_eq!(system_state([]), Invalid);
	}

	#[test]
	fn takes_minimum_progression_normally() {
		assert_eq!(system_state([Running, ReadyToRun, Running]), ReadyToRun);
	}

	#[test]
	fn error_takes_precedence_over_everything() {
		assert_eq!(system_state([Running, Running, Error]), Error);
	}

	#[test]
	fn aborted_takes_precedence_over_running_participants() {
		assert_eq!(system_state([Running, Aborted]), Aborted);
	}

	#[test]
	fn error_takes_precedence_over_abort() {
		assert_eq!(system_state([Aborting, Error]), Error);
	}

	#[test]
	fn all_shutdown_is_shutdown() {
		assert_eq!(system_state([Shutdown, Shutdown]), Shutdown);
	}
}
