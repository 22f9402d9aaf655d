use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::sync::mpsc;

use synkit_config::ParticipantConfiguration;
use synkit_discovery::DiscoveryService;
use synkit_lifecycle::{LifecycleConfiguration, LifecycleHandle, LifecycleService};
use synkit_monitor::{MonitorHandle, MonitorService};
use synkit_router::{ConnectionDirection, RouterHandle, RouterService};
use synkit_timesync::{TimeSyncConfig, TimeSyncHandle, TimeSyncService};
use synkit_transport::{ConnectBackoff, PeerEvent, PeerHandle, PeerListener, PeerUri, connect_with_retry, prefer_local};
use synkit_wire::{Announcement, FrameKind, RegistryMessage, WireDecode, WireEncode, PROTOCOL_VERSION};

use crate::context::ParticipantContext;
use crate::controller::{CanFrame, Controller, EthernetFrame, PubSubSample, RpcCall, RpcReply};
use crate::error::{Result, SynkitError};
use crate::peer_link;

/// Capability this facade always advertises: any participant it connects to
/// may relay frames for it through the registry when a direct connection
/// can't be established. The nominal peer name used for the shared
/// connection to the registry itself; frames relayed *through* it for a
/// specific peer are unwrapped from their `RegistryMessage::Relay` envelope
/// and attributed to that peer's real name, never to this sentinel.
const PROXY_MESSAGE_CAPABILITY: &str = "proxy-message";
const REGISTRY_LINK_NAME: &str = "__registry_proxy__";

/// A joined participant: its router, discovery, and monitor services, plus
/// lazily created lifecycle and time-sync services and controller
/// factories. The single composition root for layers L0-L7.
pub struct Participant {
	ctx: Arc<ParticipantContext>,
}

impl Participant {
	/// Connects to the registry named in `config`, exchanges announcements
	/// with every already-known participant, and starts listening on the
	/// participant's own acceptor URIs (if any) for peers that join later.
	pub async fn new(name: impl Into<String>, config: ParticipantConfiguration) -> Result<Self> {
		config.validate()?;
		let name = name.into();

		let router = RouterService::spawn(name.clone());
		let discovery = DiscoveryService::spawn();
		let monitor = MonitorService::spawn();
		let ctx = Arc::new(ParticipantContext::new(name.clone(), router, discovery, monitor));

		let registry_uri = PeerUri::parse(&config.middleware.registry_uri)?;
		let backoff = ConnectBackoff::new(Duration::from_millis(100), Duration::from_secs(5), config.middleware.connect_attempts);
		let (registry_handle, mut registry_events) = connect_with_retry(&registry_uri, backoff).await?;

		let announcement = Announcement {
			participant_name: name.clone(),
			participant_id: 0,
			protocol_major: PROTOCOL_VERSION.0,
			protocol_minor: PROTOCOL_VERSION.1,
			capabilities: vec![PROXY_MESSAGE_CAPABILITY.to_string()],
			acceptor_uris: config.middleware.acceptor_uris.clone(),
		};

		let known = announce_to_registry(&registry_handle, &mut registry_events, announcement.clone()).await?;

		// The set of peers already announced to the registry when this
		// participant joined is the workflow's required set, as far as this
		// facade can observe it: it gates the automatic ServicesCreated ->
		// CommunicationInitializing transition for coordinated lifecycles.
		ctx.set_required_peers(known.iter().filter(|peer| peer.participant_name != name).map(|peer| peer.participant_name.clone()).collect());

		// Frames relayed through the registry for any proxied peer arrive
		// here wrapped in RegistryMessage::Relay and get unwrapped and
		// attributed to their real sender; see dispatch_frame in peer_link.
		peer_link::spawn(
			ctx.clone(),
			REGISTRY_LINK_NAME.to_string(),
			registry_handle.clone(),
			registry_events,
			ConnectionDirection::Dialed,
		);

		if !config.middleware.acceptor_uris.is_empty() {
			spawn_acceptors(ctx.clone(), &config.middleware.acceptor_uris, announcement.clone());
		}

		for peer in known {
			if peer.participant_name == name {
				continue;
			}
			connect_to_known_peer(ctx.clone(), peer, announcement.clone(), registry_handle.clone(), config.middleware.connect_attempts)
				.await;
		}

		Ok(Participant { ctx })
	}

	pub fn participant_name(&self) -> &str {
		&self.ctx.name
	}

	pub fn router(&self) -> RouterHandle {
		self.ctx.router.clone()
	}

	pub fn monitor(&self) -> MonitorHandle {
		self.ctx.monitor.clone()
	}

	pub fn discovery(&self) -> synkit_discovery::DiscoveryHandle {
		self.ctx.discovery.clone()
	}

	/// Publishes a service descriptor locally and broadcasts it to every
	/// peer currently known to this participant, so their own discovery
	/// services observe it too.
	pub async fn publish_service(&self, descriptor: synkit_wire::ServiceDescriptor) {
		self.ctx.discovery.publish(descriptor.clone()).await;
		self.ctx
			.broadcast_discovery(&synkit_wire::ParticipantDiscoveryEvent { descriptors: vec![descriptor] })
			.await;
	}

	/// Creates this participant's lifecycle service. May only be called
	/// once; a second call replaces nothing and is a logic error in the
	/// caller, so it returns the already-installed handle instead of
	/// spawning a duplicate service.
	pub fn create_lifecycle_service(&self, config: LifecycleConfiguration) -> LifecycleHandle {
		if let Some(existing) = self.ctx.lifecycle.get() {
			return (**existing).clone();
		}
		let lifecycle = Arc::new(LifecycleService::spawn(self.ctx.name.clone(), config, self.ctx.required_peers(), self.ctx.known_peers()));
		spawn_status_broadcaster(self.ctx.clone(), (*lifecycle).clone());
		crate::signal::register_for_shutdown_signals(&lifecycle);
		let _ = self.ctx.lifecycle.set(lifecycle.clone());
		(*lifecycle).clone()
	}

	/// Creates this participant's time-sync barrier. Only meaningful once a
	/// time-synchronized lifecycle has been created; SPEC_FULL §4.8.
	pub fn create_time_sync_service(&self, config: TimeSyncConfig) -> TimeSyncHandle {
		if let Some(existing) = self.ctx.time_sync.get() {
			return existing.clone();
		}
		let time_sync = TimeSyncService::spawn(config);
		spawn_task_broadcaster(self.ctx.clone(), time_sync.clone());
		let _ = self.ctx.time_sync.set(time_sync.clone());
		time_sync
	}

	pub async fn create_can_controller(
		&self,
		network_name: impl Into<String>,
		message_type: u8,
	) -> (Controller<CanFrame>, mpsc::Receiver<(String, CanFrame)>) {
		self.create_controller(network_name, "CAN", message_type).await
	}

	pub async fn create_ethernet_controller(
		&self,
		network_name: impl Into<String>,
		message_type: u8,
	) -> (Controller<EthernetFrame>, mpsc::Receiver<(String, EthernetFrame)>) {
		self.create_controller(network_name, "Ethernet", message_type).await
	}

	pub async fn create_pub_sub_controller(
		&self,
		network_name: impl Into<String>,
		message_type: u8,
	) -> (Controller<PubSubSample>, mpsc::Receiver<(String, PubSubSample)>) {
		self.create_controller(network_name, "PubSub", message_type).await
	}

	pub async fn create_rpc_client(
		&self,
		network_name: impl Into<String>,
		message_type: u8,
	) -> (Controller<RpcCall>, mpsc::Receiver<(String, RpcCall)>) {
		self.create_controller(network_name, "Rpc", message_type).await
	}

	pub async fn create_rpc_server(
		&self,
		network_name: impl Into<String>,
		message_type: u8,
	) -> (Controller<RpcReply>, mpsc::Receiver<(String, RpcReply)>) {
		self.create_controller(network_name, "Rpc", message_type).await
	}

	/// Creates a controller bound to `network_name`/`media_type` and
	/// publishes its service descriptor so peers' discovery services can
	/// resolve it as a broadcast target.
	async fn create_controller<T>(
		&self,
		network_name: impl Into<String>,
		media_type: &str,
		message_type: u8,
	) -> (Controller<T>, mpsc::Receiver<(String, T)>)
	where
		T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + 'static,
	{
		let network_name = network_name.into();
		let (controller, rx) = Controller::create(
			self.ctx.router.clone(),
			self.ctx.discovery.clone(),
			self.ctx.name.clone(),
			message_type,
			network_name.clone(),
			media_type.to_string(),
		)
		.await;
		self.publish_service(synkit_wire::ServiceDescriptor {
			network_name,
			media_type: media_type.to_string(),
			supplemental_labels: Default::default(),
			participant_name: self.ctx.name.clone(),
			service_name: format!("{}/{}", self.ctx.name, controller.receiver_index()),
		})
		.await;
		(controller, rx)
	}

	/// Starts this participant's lifecycle, returning a future that
	/// resolves to its terminal state. Panics if `create_lifecycle_service`
	/// hasn't been called yet — mirrors `StartLifecycle`'s documented
	/// precondition that a lifecycle must exist first.
	pub fn start_lifecycle(&self) -> tokio::task::JoinHandle<synkit_wire::ParticipantState> {
		let lifecycle = self.ctx.lifecycle.get().expect("create_lifecycle_service must be called before start_lifecycle").clone();
		lifecycle.start_lifecycle()
	}
}

async fn announce_to_registry(
	registry: &PeerHandle,
	events: &mut mpsc::Receiver<PeerEvent>,
	announcement: Announcement,
) -> Result<Vec<Announcement>> {
	let mut buf = BytesMut::new();
	RegistryMessage::Announce(announcement).encode(&mut buf);
	registry.send(FrameKind::RegistryMessage, buf.freeze()).await?;

	loop {
		match events.recv().await {
			Some(PeerEvent::Frame(FrameKind::RegistryMessage, payload)) => {
				let mut bytes = payload;
				return match RegistryMessage::decode(&mut bytes)? {
					RegistryMessage::KnownParticipants(known) => Ok(known),
					other => {
						tracing::warn!(?other, "unexpected registry reply to announce, treating as empty");
						Ok(Vec::new())
					}
				};
			}
			Some(PeerEvent::Disconnected) => {
				return Err(SynkitError::Internal("registry closed the connection before replying to Announce".to_string()));
			}
			Some(_) => continue,
			None => {
				return Err(SynkitError::Internal("registry connection ended before replying to Announce".to_string()));
			}
		}
	}
}

fn spawn_acceptors(ctx: Arc<ParticipantContext>, acceptor_uris: &[String], announcement: Announcement) {
	for raw_uri in acceptor_uris {
		let uri = match PeerUri::parse(raw_uri) {
			Ok(uri) => uri,
			Err(err) => {
				tracing::warn!(uri = %raw_uri, error = %err, "skipping unparseable acceptor uri");
				continue;
			}
		};
		let ctx = ctx.clone();
		let announcement = announcement.clone();
		tokio::spawn(async move {
			let listener = match PeerListener::bind(&uri).await {
				Ok(listener) => listener,
				Err(err) => {
					tracing::warn!(%uri, error = %err, "failed to bind acceptor uri");
					return;
				}
			};
			tracing::info!(%uri, "participant listening for direct peer connections");
			loop {
				match listener.accept().await {
					Ok((handle, mut events)) => {
						let ctx = ctx.clone();
						let announcement = announcement.clone();
						tokio::spawn(async move {
							if let Some(peer_name) = complete_inbound_handshake(&handle, &mut events, &announcement).await {
								peer_link::spawn(ctx, peer_name, handle, events, ConnectionDirection::Accepted);
							}
						});
					}
					Err(err) => {
						tracing::warn!(%uri, error = %err, "acceptor loop stopped");
						return;
					}
				}
			}
		});
	}
}

/// Exchanges `FrameKind::Announcement` with a freshly accepted connection
/// and returns the peer's declared name once its first frame arrives.
async fn complete_inbound_handshake(
	handle: &PeerHandle,
	events: &mut mpsc::Receiver<PeerEvent>,
	our_announcement: &Announcement,
) -> Option<String> {
	let mut buf = BytesMut::new();
	our_announcement.encode(&mut buf);
	if handle.send(FrameKind::Announcement, buf.freeze()).await.is_err() {
		return None;
	}
	loop {
		match events.recv().await? {
			PeerEvent::Frame(FrameKind::Announcement, payload) => {
				let mut bytes = payload;
				return match Announcement::decode(&mut bytes) {
					Ok(peer_announcement) => {
						if let Err(err) = peer_announcement.check_version_compatible() {
							tracing::warn!(error = %err, "rejecting peer with incompatible protocol version");
							return None;
						}
						Some(peer_announcement.participant_name)
					}
					Err(err) => {
						tracing::warn!(error = %err, "rejecting peer with malformed announcement");
						None
					}
				};
			}
			PeerEvent::Disconnected => return None,
			_ => continue,
		}
	}
}

async fn connect_to_known_peer(
	ctx: Arc<ParticipantContext>,
	peer: Announcement,
	our_announcement: Announcement,
	registry_handle: PeerHandle,
	connect_attempts: u32,
) {
	let uris: Vec<PeerUri> = peer.acceptor_uris.iter().filter_map(|raw| PeerUri::parse(raw).ok()).collect();
	let ordered = prefer_local(uris);
	let backoff = ConnectBackoff::new(Duration::from_millis(100), Duration::from_secs(5), connect_attempts);

	for uri in &ordered {
		match connect_with_retry(uri, backoff).await {
			Ok((handle, mut events)) => {
				if let Some(name) = complete_inbound_handshake(&handle, &mut events, &our_announcement).await {
					peer_link::spawn(ctx, name, handle, events, ConnectionDirection::Dialed);
					return;
				}
			}
			Err(err) => {
				tracing::debug!(%uri, peer = %peer.participant_name, error = %err, "direct dial failed, trying next uri");
			}
		}
	}

	tracing::warn!(
		peer = %peer.participant_name,
		"could not dial peer directly, falling back to registry proxy relay",
	);
	let relay_handle = synkit_transport::relay_via(registry_handle, ctx.name.clone(), peer.participant_name.clone());
	ctx.router.register_peer(peer.participant_name.clone(), relay_handle, ConnectionDirection::Dialed).await;
	ctx.add_peer(peer.participant_name);
}

fn spawn_status_broadcaster(ctx: Arc<ParticipantContext>, lifecycle: LifecycleHandle) {
	tokio::spawn(async move {
		let mut status_rx = lifecycle.subscribe_status().await;
		loop {
			let status = status_rx.borrow().clone();
			ctx.monitor.report_status(status.clone()).await;
			ctx.broadcast_lifecycle(&synkit_wire::LifecycleMessage::Status(status)).await;
			if status_rx.changed().await.is_err() {
				return;
			}
		}
	});
}

fn spawn_task_broadcaster(ctx: Arc<ParticipantContext>, time_sync: TimeSyncHandle) {
	tokio::spawn(async move {
		let mut outbound_rx = time_sync.subscribe_outbound().await;
		loop {
			if let Some(task) = *outbound_rx.borrow() {
				ctx.broadcast_lifecycle(&synkit_wire::LifecycleMessage::NextSimTask(task)).await;
			}
			if outbound_rx.changed().await.is_err() {
				return;
			}
		}
	});
}
