//! Registry server binary.
//!
//! Binds a listening socket and serves registry traffic until every
//! participant that ever connected has disconnected again.

use std::path::PathBuf;

use clap::Parser;
use synkit_config::ParticipantConfiguration;
use synkit_registry::{RegistryService, serve};
use synkit_transport::PeerUri;
use tracing::info;

/// Registry command line arguments.
#[derive(Parser, Debug)]
#[command(name = "synkit-registry")]
#[command(about = "Synkit participant registry and discovery bootstrap")]
struct Args {
	/// Path to a participant configuration document; only `Middleware.RegistryUri` is used.
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Registry listen URI, overrides the configuration file if given.
	#[arg(short, long, value_name = "URI")]
	uri: Option<String>,

	/// Verbose logging.
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.init();

	let uri_string = match (&args.uri, &args.config) {
		(Some(uri), _) => uri.clone(),
		(None, Some(path)) => ParticipantConfiguration::from_path(path)?.middleware.registry_uri,
		(None, None) => "tcp://0.0.0.0:8500".to_string(),
	};
	let uri = PeerUri::parse(&uri_string)?;

	let registry = RegistryService::spawn();
	let accept_loop = {
		let registry = registry.clone();
		let uri = uri.clone();
		tokio::spawn(async move { serve(&uri, registry).await })
	};

	info!(%uri, "synkit-registry started");
	registry.wait_all_participants_down().await;
	info!("all participants disconnected, shutting down");
	accept_loop.abort();

	Ok(())
}
