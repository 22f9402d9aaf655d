use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use synkit_transport::PeerHandle;
use synkit_wire::{Announcement, FrameKind, RegistryMessage, WireEncode};

use crate::commands::RegistryCmd;
use crate::handle::RegistryHandle;

const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Capability string advertised by participants that cannot dial each other
/// directly and rely on the registry to relay frames between them.
pub const PROXY_MESSAGE_CAPABILITY: &str = "proxy-message";

struct ConnectedParticipant {
	announcement: Announcement,
	handle: PeerHandle,
}

impl ConnectedParticipant {
	fn supports_proxy(&self) -> bool {
		self.announcement.has_capability(PROXY_MESSAGE_CAPABILITY)
	}
}

/// Owns the set of connected participants. One instance per registry
/// process; the accept loop in [`crate::server`] is the only producer of
/// commands.
pub struct RegistryService {
	rx: mpsc::Receiver<RegistryCmd>,
	participants: HashMap<String, ConnectedParticipant>,
	all_down_waiters: Vec<oneshot::Sender<()>>,
	next_participant_id: u64,
}

impl RegistryService {
	/// Spawns the service and returns a handle to it.
	pub fn spawn() -> RegistryHandle {
		let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
		let service = RegistryService {
			rx,
			participants: HashMap::new(),
			all_down_waiters: Vec::new(),
			next_participant_id: 1,
		};
		tokio::spawn(service.run());
		RegistryHandle::new(tx)
	}

	async fn run(mut self) {
		while let Some(cmd) = self.rx.recv().await {
			self.handle_command(cmd);
		}
	}

	fn handle_command(&mut self, cmd: RegistryCmd) {
		match cmd {
			RegistryCmd::Announce { mut announcement, handle, reply } => {
				if announcement.participant_id == 0 {
					announcement.participant_id = self.next_participant_id;
					self.next_participant_id += 1;
				}
				let known: Vec<Announcement> = self.participants.values().map(|p| p.announcement.clone()).collect();
				tracing::info!(
					participant = %announcement.participant_name,
					known_count = known.len(),
					"participant announced",
				);
				self.participants.insert(
					announcement.participant_name.clone(),
					ConnectedParticipant { announcement, handle },
				);
				let _ = reply.send(known);
			}
			RegistryCmd::Disconnected { participant_name } => {
				if self.participants.remove(&participant_name).is_some() {
					tracing::info!(participant = %participant_name, "participant disconnected");
				}
				if self.participants.is_empty() {
					for waiter in self.all_down_waiters.drain(..) {
						let _ = waiter.send(());
					}
				}
			}
			RegistryCmd::WaitAllParticipantsDown { reply } => {
				if self.participants.is_empty() {
					let _ = reply.send(());
				} else {
					self.all_down_waiters.push(reply);
				}
			}
			RegistryCmd::ConnectedNames { reply } => {
				let _ = reply.send(self.participants.keys().cloned().collect());
			}
			RegistryCmd::ProxyFrame { from, to, kind, payload, hop_count } => {
				let Some(sender) = self.participants.get(&from) else { return };
				if !sender.supports_proxy() {
					tracing::warn!(participant = %from, "proxy frame from participant without proxy-message capability");
					return;
				}
				let Some(target) = self.participants.get(&to) else {
					tracing::warn!(participant = %to, "proxy frame addressed to unknown participant, dropping");
					return;
				};
				if !target.supports_proxy() {
					tracing::warn!(participant = %to, "proxy frame addressed to participant without proxy-message capability");
					return;
				}
				let target_handle = target.handle.clone();
				let relay = RegistryMessage::Relay { from, to, kind, payload, hop_count: hop_count.saturating_add(1) };
				let mut buf = bytes::BytesMut::new();
				relay.encode(&mut buf);
				let encoded = buf.freeze();
				tokio::spawn(async move {
					let _ = target_handle.send(FrameKind::RegistryMessage, encoded).await;
				});
			}
		}
	}
}
