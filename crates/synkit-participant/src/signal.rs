use std::sync::{Arc, Mutex, OnceLock, Weak};

use synkit_lifecycle::LifecycleHandle;
use synkit_wire::{SystemCommand, SystemCommandKind};

/// Process-wide registry of lifecycle handles that should receive
/// `AbortSimulation` on SIGINT/SIGTERM. Entries are weak, so a participant
/// that has dropped its `Arc<LifecycleHandle>` is implicitly unregistered
/// the next time the signal fires rather than needing an explicit
/// unregister call.
static HANDLERS: OnceLock<Mutex<Vec<Weak<LifecycleHandle>>>> = OnceLock::new();
static SIGNAL_TASK_STARTED: OnceLock<()> = OnceLock::new();

/// Registers `lifecycle` to receive `AbortSimulation` when the process
/// receives SIGINT or SIGTERM, and starts the process-wide signal listener
/// the first time this is called.
pub(crate) fn register_for_shutdown_signals(lifecycle: &Arc<LifecycleHandle>) {
	let handlers = HANDLERS.get_or_init(|| Mutex::new(Vec::new()));
	handlers.lock().unwrap().push(Arc::downgrade(lifecycle));

	if SIGNAL_TASK_STARTED.set(()).is_ok() {
		tokio::spawn(listen());
	}
}

async fn listen() {
	let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
		Ok(stream) => Some(stream),
		Err(err) => {
			tracing::warn!(error = %err, "failed to install SIGTERM handler");
			None
		}
	};

	loop {
		let fired = match &mut sigterm {
			Some(stream) => {
				tokio::select! {
					_ = tokio::signal::ctrl_c() => "SIGINT",
					_ = stream.recv() => "SIGTERM",
				}
			}
			None => {
				let _ = tokio::signal::ctrl_c().await;
				"SIGINT"
			}
		};
		tracing::info!(signal = fired, "abort signal received, broadcasting AbortSimulation");
		broadcast_abort().await;
	}
}

async fn broadcast_abort() {
	let Some(handlers) = HANDLERS.get() else { return };
	let live: Vec<Arc<LifecycleHandle>> = {
		let mut guard = handlers.lock().unwrap();
		guard.retain(|w| w.strong_count() > 0);
		guard.iter().filter_map(Weak::upgrade).collect()
	};
	for lifecycle in live {
		lifecycle.send_system_command(SystemCommand { kind: SystemCommandKind::AbortSimulation }).await;
	}
}
