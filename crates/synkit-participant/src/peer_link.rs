use std::sync::Arc;

use tokio::sync::mpsc;

use synkit_router::ConnectionDirection;
use synkit_transport::{PeerEvent, PeerHandle};
use synkit_wire::{FrameKind, LifecycleMessage, ParticipantDiscoveryEvent, RegistryMessage, SimMessage, WireDecode};

use crate::context::ParticipantContext;

/// Registers a directly-dialed or accepted peer connection and spawns the
/// task that drains its inbound events for the lifetime of the connection.
pub(crate) fn spawn(
	ctx: Arc<ParticipantContext>,
	peer_name: String,
	handle: PeerHandle,
	events: mpsc::Receiver<PeerEvent>,
	direction: ConnectionDirection,
) {
	ctx.add_peer(peer_name.clone());
	tokio::spawn(run(ctx, peer_name, handle, events, direction));
}

async fn run(
	ctx: Arc<ParticipantContext>,
	peer_name: String,
	handle: PeerHandle,
	mut events: mpsc::Receiver<PeerEvent>,
	direction: ConnectionDirection,
) {
	ctx.router.register_peer(peer_name.clone(), handle, direction).await;

	while let Some(event) = events.recv().await {
		match event {
			PeerEvent::Frame(FrameKind::RegistryMessage, payload) => {
				let mut bytes = payload;
				match RegistryMessage::decode(&mut bytes) {
					Ok(RegistryMessage::Relay { from, kind, payload, hop_count, .. }) => {
						tracing::debug!(peer = %peer_name, %from, hop_count, "dispatching frame relayed through registry");
						dispatch_frame(&ctx, from, kind, payload).await;
					}
					Ok(other) => {
						tracing::debug!(peer = %peer_name, ?other, "ignoring unexpected registry message on peer link");
					}
					Err(err) => {
						tracing::warn!(peer = %peer_name, error = %err, "dropping malformed registry message");
					}
				}
			}
			PeerEvent::Frame(kind, payload) => {
				dispatch_frame(&ctx, peer_name.clone(), kind, payload).await;
			}
			PeerEvent::Disconnected => break,
		}
	}

	tracing::info!(peer = %peer_name, "peer link closed");
	ctx.router.unregister_peer(peer_name.clone()).await;
	ctx.discovery.withdraw_participant(peer_name.clone()).await;
	ctx.monitor.forget(peer_name.clone()).await;
	ctx.remove_peer(&peer_name);
}

/// Handles one inbound frame attributed to `sender_name`, shared by frames
/// arriving directly on a peer link and frames unwrapped from a registry
/// `Relay` envelope.
async fn dispatch_frame(ctx: &Arc<ParticipantContext>, sender_name: String, kind: FrameKind, payload: bytes::Bytes) {
	match kind {
		FrameKind::SimMessage => {
			let mut bytes = payload;
			match SimMessage::decode(&mut bytes) {
				Ok(message) => {
					ctx.router.dispatch_inbound(sender_name, message.receiver_index, message.message_type, message.payload).await;
				}
				Err(err) => {
					tracing::warn!(peer = %sender_name, error = %err, "dropping malformed SimMessage frame");
				}
			}
		}
		FrameKind::Lifecycle => {
			let mut bytes = payload;
			match LifecycleMessage::decode(&mut bytes) {
				Ok(message) => handle_lifecycle_message(ctx, &sender_name, message).await,
				Err(err) => {
					tracing::warn!(peer = %sender_name, error = %err, "dropping malformed lifecycle frame");
				}
			}
		}
		FrameKind::Discovery => {
			let mut bytes = payload;
			match ParticipantDiscoveryEvent::decode(&mut bytes) {
				Ok(event) => {
					for descriptor in event.descriptors {
						ctx.discovery.publish(descriptor).await;
					}
				}
				Err(err) => {
					tracing::warn!(peer = %sender_name, error = %err, "dropping malformed discovery frame");
				}
			}
		}
		other => {
			tracing::debug!(peer = %sender_name, kind = ?other, "ignoring unexpected frame kind on peer link");
		}
	}
}

async fn handle_lifecycle_message(ctx: &ParticipantContext, peer_name: &str, message: LifecycleMessage) {
	match message {
		LifecycleMessage::Command(command) => {
			if let Some(lifecycle) = ctx.lifecycle.get() {
				lifecycle.send_system_command(command).await;
			}
		}
		LifecycleMessage::Status(status) => {
			ctx.monitor.report_status(status).await;
		}
		LifecycleMessage::Workflow(workflow) => {
			ctx.monitor.set_required_participants(workflow.required_participant_names.clone()).await;
			if let Some(time_sync) = ctx.time_sync.get() {
				let peers: Vec<String> =
					workflow.required_participant_names.into_iter().filter(|name| name != &ctx.name).collect();
				time_sync.set_required_peers(peers).await;
			}
		}
		LifecycleMessage::NextSimTask(task) => {
			if let Some(time_sync) = ctx.time_sync.get() {
				time_sync.receive_peer_task(peer_name.to_string(), task).await;
			}
		}
	}
}
