//! Coordinated lifecycle demo: the participant waits for a system
//! controller (or any peer sending `SystemCommandKind::RunSimulation`) to
//! start and stop the simulation instead of driving itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use synkit_config::ParticipantConfiguration;
use synkit_participant::{LifecycleConfiguration, Participant, hook};
use tokio::sync::oneshot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "coordinated")]
#[command(about = "Coordinated lifecycle demo participant")]
struct Args {
	/// Name this participant announces itself under.
	participant_name: String,
}

fn sample_config(participant_name: &str) -> ParticipantConfiguration {
	let json = format!(
		r#"{{"SchemaVersion":1,"ParticipantName":"{participant_name}","Middleware":{{"RegistryUri":"silkit://localhost:8500"}},"Logging":{{"Sinks":[{{"Name":"stdout","Level":"Info"}}]}}}}"#
	);
	ParticipantConfiguration::from_json(&json).expect("sample configuration is well-formed")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

	let config = sample_config(&args.participant_name);
	let participant = Participant::new(args.participant_name.clone(), config).await?;

	let lifecycle = participant.create_lifecycle_service(LifecycleConfiguration::coordinated(false));

	let (start_tx, start_rx) = oneshot::channel();
	let start_tx = std::sync::Mutex::new(Some(start_tx));
	lifecycle
		.set_starting_handler(hook(move || {
			let sender = start_tx.lock().unwrap().take();
			async move {
				if let Some(sender) = sender {
					let _ = sender.send(());
				}
			}
		}))
		.await;

	let worker_done = Arc::new(AtomicBool::new(false));
	let worker = {
		let worker_done = worker_done.clone();
		tokio::spawn(async move {
			if start_rx.await.is_err() {
				return;
			}
			while !worker_done.load(Ordering::Relaxed) {
				tokio::time::sleep(Duration::from_secs(1)).await;
				info!("Simulation running. Stop via the system controller.");
			}
		})
	};

	info!("Start the participant lifecycle and wait for a system controller to start the simulation.");
	let final_state = participant.start_lifecycle().await?;
	info!(?final_state, "lifecycle finished");

	worker_done.store(true, Ordering::Relaxed);
	worker.await?;
	Ok(())
}
