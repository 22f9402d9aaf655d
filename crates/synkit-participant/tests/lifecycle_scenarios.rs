//! In-process lifecycle and barrier scenarios composing the lifecycle and
//! time-sync crates directly, without any real peer transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use synkit_lifecycle::{LifecycleConfiguration, LifecycleService, ParticipantState, SystemCommand, SystemCommandKind};
use synkit_timesync::{AdvanceMode, TimeSyncConfig, TimeSyncHandle, TimeSyncService, step_handler};

const ONE_MS: i64 = 1_000_000;
const FIVE_MS: i64 = 5_000_000;

async fn wait_until(observed: &Arc<Mutex<Vec<i64>>>, count: usize) {
	tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			if observed.lock().unwrap().len() >= count {
				return;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("observed step count did not reach target in time");
}

fn forward_outbound_to(name: &'static str, from: TimeSyncHandle, to: TimeSyncHandle) {
	tokio::spawn(async move {
		let mut outbound = from.subscribe_outbound().await;
		loop {
			if let Some(task) = *outbound.borrow() {
				to.receive_peer_task(name.to_string(), task).await;
			}
			if outbound.changed().await.is_err() {
				return;
			}
		}
	});
}

#[tokio::test]
async fn two_participant_time_sync_advances_in_lockstep() {
	let p1 = TimeSyncService::spawn(TimeSyncConfig::new(ONE_MS, AdvanceMode::ByMinimalDuration));
	let p2 = TimeSyncService::spawn(TimeSyncConfig::new(ONE_MS, AdvanceMode::ByMinimalDuration));
	p1.set_required_peers(vec!["P2".to_string()]).await;
	p2.set_required_peers(vec!["P1".to_string()]).await;
	forward_outbound_to("P1", p1.clone(), p2.clone());
	forward_outbound_to("P2", p2.clone(), p1.clone());

	let observed_p1 = Arc::new(Mutex::new(Vec::new()));
	let observed_p2 = Arc::new(Mutex::new(Vec::new()));
	for (handle, observed) in [(&p1, &observed_p1), (&p2, &observed_p2)] {
		let observed = observed.clone();
		handle
			.set_step_handler(step_handler(move |now, _duration, ts| {
				let observed = observed.clone();
				async move {
					observed.lock().unwrap().push(now);
					ts.complete_simulation_step().await;
				}
			}))
			.await;
	}

	let mut now1 = p1.subscribe_now().await;
	p1.start().await;
	p2.start().await;

	while *now1.borrow() < 1000 * ONE_MS {
		now1.changed().await.unwrap();
	}
	wait_until(&observed_p1, 1000).await;
	wait_until(&observed_p2, 1000).await;

	let o1 = observed_p1.lock().unwrap();
	let o2 = observed_p2.lock().unwrap();
	assert_eq!(o1.len(), 1000);
	assert_eq!(o2.len(), 1000);
	assert_eq!(o1[0], 0, "first observed now must be the step's start time, not its end");
	assert_eq!(o2[0], 0);
	for i in 1..1000 {
		assert_eq!(o1[i] - o1[i - 1], ONE_MS);
		assert_eq!(o2[i] - o2[i - 1], ONE_MS);
	}
	assert_eq!(*now1.borrow(), 1_000_000_000);
}

#[tokio::test]
async fn abort_from_running_invokes_abort_handler_once_on_each_participant() {
	let names = ["ECU1", "ECU2"];
	let mut handles = Vec::new();
	let mut abort_counts = Vec::new();
	let mut starts = Vec::new();

	for name in names {
		let handle = LifecycleService::spawn(name.to_string(), LifecycleConfiguration::coordinated(false), Vec::new(), Vec::new());
		let mut status = handle.subscribe_status().await;

		let count = Arc::new(AtomicUsize::new(0));
		{
			let count = count.clone();
			handle
				.set_abort_handler(synkit_lifecycle::abort_hook(move |_reason| {
					let count = count.clone();
					async move {
						count.fetch_add(1, Ordering::SeqCst);
					}
				}))
				.await;
		}

		let start = handle.start_lifecycle();
		loop {
			status.changed().await.unwrap();
			if status.borrow().state == ParticipantState::ReadyToRun {
				break;
			}
		}
		handle.send_system_command(SystemCommand { kind: SystemCommandKind::Run }).await;
		loop {
			status.changed().await.unwrap();
			if status.borrow().state == ParticipantState::Running {
				break;
			}
		}
		// Confirm the state immediately prior to abort is Running, matching
		// the "invoked with the prior state" expectation externally.
		assert_eq!(status.borrow().state, ParticipantState::Running);

		handles.push((handle, status));
		abort_counts.push(count);
		starts.push(start);
	}

	for (handle, _) in &handles {
		handle.send_system_command(SystemCommand { kind: SystemCommandKind::AbortSimulation }).await;
	}

	for (start, count) in starts.into_iter().zip(abort_counts.into_iter()) {
		assert_eq!(start.await.unwrap(), ParticipantState::Aborted);
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}
}

#[tokio::test]
async fn pause_suspends_invocations_until_continue_resumes_at_the_next_step() {
	let lifecycle = LifecycleService::spawn("ECU1".to_string(), LifecycleConfiguration::coordinated(true), Vec::new(), Vec::new());
	let time_sync = TimeSyncService::spawn(TimeSyncConfig::new(FIVE_MS, AdvanceMode::ByOwnDuration));

	let status_log = Arc::new(Mutex::new(Vec::new()));
	{
		let status_log = status_log.clone();
		let mut status = lifecycle.subscribe_status().await;
		tokio::spawn(async move {
			loop {
				if status.changed().await.is_err() {
					return;
				}
				status_log.lock().unwrap().push((status.borrow().state, status.borrow().enter_reason.clone()));
			}
		});
	}

	let mut status = lifecycle.subscribe_status().await;
	let start = lifecycle.start_lifecycle();
	loop {
		status.changed().await.unwrap();
		if status.borrow().state == ParticipantState::ReadyToRun {
			break;
		}
	}
	lifecycle.send_system_command(SystemCommand { kind: SystemCommandKind::Run }).await;
	loop {
		status.changed().await.unwrap();
		if status.borrow().state == ParticipantState::Running {
			break;
		}
	}

	let observed = Arc::new(Mutex::new(Vec::new()));
	{
		let observed = observed.clone();
		let lifecycle = lifecycle.clone();
		time_sync
			.set_step_handler(step_handler(move |now, _duration, ts| {
				let observed = observed.clone();
				let lifecycle = lifecycle.clone();
				async move {
					observed.lock().unwrap().push(now);
					if now == 20 * 1_000_000 {
						lifecycle.pause("manual".to_string()).await;
						tokio::time::sleep(Duration::from_millis(150)).await;
						lifecycle.resume().await;
					}
					ts.complete_simulation_step().await;
				}
			}))
			.await;
	}

	time_sync.start().await;

	wait_until(&observed, 6).await;

	lifecycle.send_system_command(SystemCommand { kind: SystemCommandKind::Shutdown }).await;
	assert_eq!(start.await.unwrap(), ParticipantState::Shutdown);

	let observed = observed.lock().unwrap();
	assert_eq!(observed[4], 20 * 1_000_000);
	assert_eq!(observed[5], 25 * 1_000_000, "next invocation after continue must land on the following step");

	let log = status_log.lock().unwrap();
	let paused_index = log.iter().position(|(state, _)| *state == ParticipantState::Paused).unwrap();
	let running_after = log[paused_index + 1..].iter().find(|(state, _)| *state == ParticipantState::Running);
	assert!(running_after.is_some(), "status sequence must show Running again after Paused");
	assert_eq!(log[paused_index].1, "manual");
}
