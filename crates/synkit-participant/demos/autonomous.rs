//! Autonomous lifecycle demo: the participant drives its own lifecycle
//! independent of any system controller, and stops itself after a fixed
//! countdown.

use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use synkit_config::ParticipantConfiguration;
use synkit_participant::{LifecycleConfiguration, Participant, hook};
use tokio::sync::oneshot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "autonomous")]
#[command(about = "Autonomous lifecycle demo participant")]
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

	let lifecycle = participant.create_lifecycle_service(LifecycleConfiguration::autonomous(false));

	// The worker task is unleashed once the starting handler fires.
	let (start_tx, start_rx) = oneshot::channel();
	let start_tx = Mutex::new(Some(start_tx));
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

	let worker = {
		let stop_lifecycle = lifecycle.clone();
		tokio::spawn(async move {
			if start_rx.await.is_err() {
				return;
			}
			for remaining in (1..=10).rev() {
				tokio::time::sleep(Duration::from_secs(1)).await;
				info!("Simulation stop in {remaining}");
			}
			info!("Stopping just me.");
			stop_lifecycle.stop("Stopping just me".to_string()).await;
		})
	};

	info!("Start the participant lifecycle.");
	let final_state = participant.start_lifecycle().await?;
	info!(?final_state, "lifecycle finished");

	worker.await?;
	Ok(())
}
