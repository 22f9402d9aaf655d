use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;

use crate::error::{ProtocolError, Result};
use crate::primitive::{WireDecode, WireEncode};

/// The protocol version spoken by this build. A peer whose major version
/// differs is rejected outright; a differing minor version is accepted.
pub const PROTOCOL_VERSION: (u16, u16) = (1, 0);

fn version_compatible(peer: (u16, u16), ours: (u16, u16)) -> bool {
	peer.0 == ours.0
}

/// A participant's position in the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParticipantState {
	Invalid = 0,
	ServicesCreated = 1,
	CommunicationInitializing = 2,
	CommunicationInitialized = 3,
	ReadyToRun = 4,
	Running = 5,
	Paused = 6,
	Stopping = 7,
	Stopped = 8,
	ShuttingDown = 9,
	Shutdown = 10,
	Error = 11,
	Aborting = 12,
	Aborted = 13,
}

impl ParticipantState {
	fn from_u8(value: u8) -> Result<Self> {
		use ParticipantState::*;
		Ok(match value {
			0 => Invalid,
			1 => ServicesCreated,
			2 => CommunicationInitializing,
			3 => CommunicationInitialized,
			4 => ReadyToRun,
			5 => Running,
			6 => Paused,
			7 => Stopping,
			8 => Stopped,
			9 => ShuttingDown,
			10 => Shutdown,
			11 => Error,
			12 => Aborting,
			13 => Aborted,
			other => {
				return Err(ProtocolError::InvalidDiscriminant {
					ty: "ParticipantState",
					value: other as u32,
				});
			}
		})
	}
}

impl WireEncode for ParticipantState {
	fn encode(&self, buf: &mut BytesMut) {
		(*self as u8).encode(buf);
	}
}

impl WireDecode for ParticipantState {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		ParticipantState::from_u8(u8::decode(buf)?)
	}
}

/// The system-controller command kinds that drive a Coordinated lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemCommandKind {
	Invalid = 0,
	Run = 1,
	Stop = 2,
	Shutdown = 3,
	AbortSimulation = 4,
}

impl SystemCommandKind {
	fn from_u8(value: u8) -> Result<Self> {
		use SystemCommandKind::*;
		Ok(match value {
			0 => Invalid,
			1 => Run,
			2 => Stop,
			3 => Shutdown,
			4 => AbortSimulation,
			other => {
				return Err(ProtocolError::InvalidDiscriminant {
					ty: "SystemCommandKind",
					value: other as u32,
				});
			}
		})
	}
}

impl WireEncode for SystemCommandKind {
	fn encode(&self, buf: &mut BytesMut) {
		(*self as u8).encode(buf);
	}
}

impl WireDecode for SystemCommandKind {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		SystemCommandKind::from_u8(u8::decode(buf)?)
	}
}

/// A command broadcast by the system controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCommand {
	pub kind: SystemCommandKind,
}

impl WireEncode for SystemCommand {
	fn encode(&self, buf: &mut BytesMut) {
		self.kind.encode(buf);
	}
}

impl WireDecode for SystemCommand {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(SystemCommand { kind: SystemCommandKind::decode(buf)? })
	}
}

/// The status report a participant publishes whenever it changes state.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantStatus {
	pub participant_name: String,
	pub state: ParticipantState,
	pub enter_reason: String,
	/// Nanoseconds since the participant's lifecycle began.
	pub enter_time: i64,
	pub refresh_time: i64,
}

impl WireEncode for ParticipantStatus {
	fn encode(&self, buf: &mut BytesMut) {
		self.participant_name.encode(buf);
		self.state.encode(buf);
		self.enter_reason.encode(buf);
		self.enter_time.encode(buf);
		self.refresh_time.encode(buf);
	}
}

impl WireDecode for ParticipantStatus {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(ParticipantStatus {
			participant_name: String::decode(buf)?,
			state: ParticipantState::decode(buf)?,
			enter_reason: String::decode(buf)?,
			enter_time: i64::decode(buf)?,
			refresh_time: i64::decode(buf)?,
		})
	}
}

/// The set of participant names that must join before the simulation can run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkflowConfiguration {
	pub required_participant_names: Vec<String>,
}

impl WireEncode for WorkflowConfiguration {
	fn encode(&self, buf: &mut BytesMut) {
		self.required_participant_names.encode(buf);
	}
}

impl WireDecode for WorkflowConfiguration {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(WorkflowConfiguration { required_participant_names: Vec::<String>::decode(buf)? })
	}
}

/// One tick of the virtual-time barrier: "run until `time_point +
/// duration`", both in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextSimTask {
	pub time_point: i64,
	pub duration: i64,
}

impl WireEncode for NextSimTask {
	fn encode(&self, buf: &mut BytesMut) {
		self.time_point.encode(buf);
		self.duration.encode(buf);
	}
}

impl WireDecode for NextSimTask {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(NextSimTask { time_point: i64::decode(buf)?, duration: i64::decode(buf)? })
	}
}

/// Advertises a controller/endpoint a participant is willing to route
/// messages for. Matching is `network_name` + `media_type` + the
/// `supplemental_labels` the consumer asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
	pub network_name: String,
	pub media_type: String,
	pub supplemental_labels: IndexMap<String, String>,
	pub participant_name: String,
	pub service_name: String,
}

impl WireEncode for ServiceDescriptor {
	fn encode(&self, buf: &mut BytesMut) {
		self.network_name.encode(buf);
		self.media_type.encode(buf);
		self.supplemental_labels.encode(buf);
		self.participant_name.encode(buf);
		self.service_name.encode(buf);
	}
}

impl WireDecode for ServiceDescriptor {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(ServiceDescriptor {
			network_name: String::decode(buf)?,
			media_type: String::decode(buf)?,
			supplemental_labels: IndexMap::decode(buf)?,
			participant_name: String::decode(buf)?,
			service_name: String::decode(buf)?,
		})
	}
}

/// Sent by discovery to announce or replay a batch of descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDiscoveryEvent {
	pub descriptors: Vec<ServiceDescriptor>,
}

impl WireEncode for ParticipantDiscoveryEvent {
	fn encode(&self, buf: &mut BytesMut) {
		self.descriptors.encode(buf);
	}
}

impl WireDecode for ParticipantDiscoveryEvent {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(ParticipantDiscoveryEvent { descriptors: Vec::<ServiceDescriptor>::decode(buf)? })
	}
}

/// First message sent on a freshly opened peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
	pub participant_name: String,
	pub participant_id: u64,
	pub protocol_major: u16,
	pub protocol_minor: u16,
	pub capabilities: Vec<String>,
	pub acceptor_uris: Vec<String>,
}

impl Announcement {
	/// Validates the peer's declared version against ours, per the wire
	/// protocol's major-version compatibility rule.
	pub fn check_version_compatible(&self) -> Result<()> {
		let peer = (self.protocol_major, self.protocol_minor);
		if version_compatible(peer, PROTOCOL_VERSION) {
			Ok(())
		} else {
			Err(ProtocolError::VersionMismatch {
				peer_major: peer.0,
				peer_minor: peer.1,
				our_major: PROTOCOL_VERSION.0,
				our_minor: PROTOCOL_VERSION.1,
			})
		}
	}

	pub fn has_capability(&self, name: &str) -> bool {
		self.capabilities.iter().any(|c| c == name)
	}
}

impl WireEncode for Announcement {
	fn encode(&self, buf: &mut BytesMut) {
		self.participant_name.encode(buf);
		self.participant_id.encode(buf);
		self.protocol_major.encode(buf);
		self.protocol_minor.encode(buf);
		self.capabilities.encode(buf);
		self.acceptor_uris.encode(buf);
	}
}

impl WireDecode for Announcement {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(Announcement {
			participant_name: String::decode(buf)?,
			participant_id: u64::decode(buf)?,
			protocol_major: u16::decode(buf)?,
			protocol_minor: u16::decode(buf)?,
			capabilities: Vec::<String>::decode(buf)?,
			acceptor_uris: Vec::<String>::decode(buf)?,
		})
	}
}

/// A data-plane envelope routed by receiver index within a network.
///
/// `message_type` distinguishes bus-specific payload shapes (CAN frame,
/// Ethernet frame, pub/sub sample, RPC call/reply, ...); the payload bytes
/// themselves are opaque to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimMessage {
	pub receiver_index: u16,
	pub message_type: u8,
	pub payload: Bytes,
}

impl WireEncode for SimMessage {
	fn encode(&self, buf: &mut BytesMut) {
		self.receiver_index.encode(buf);
		self.message_type.encode(buf);
		self.payload.encode(buf);
	}
}

impl WireDecode for SimMessage {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(SimMessage {
			receiver_index: u16::decode(buf)?,
			message_type: u8::decode(buf)?,
			payload: Bytes::decode(buf)?,
		})
	}
}

/// Registry control-plane messages exchanged between a participant and the
/// registry process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryMessage {
	/// Sent by a newly connecting participant.
	Announce(Announcement),
	/// Registry's reply: the set of already-known participants.
	KnownParticipants(Vec<Announcement>),
	/// Sent by a peer before it closes its connection cleanly.
	ShuttingDown,
	/// A frame relayed through the registry for a participant pair that
	/// could not dial each other directly. Sent by the originating
	/// participant with `hop_count` 0; the registry forwards it to `to`'s
	/// connection with `hop_count` incremented, so the receiving end can
	/// tell a direct frame from a proxied one and attribute it to `from`
	/// rather than the registry connection itself.
	Relay { from: String, to: String, kind: crate::FrameKind, payload: Bytes, hop_count: u8 },
}

impl WireEncode for RegistryMessage {
	fn encode(&self, buf: &mut BytesMut) {
		match self {
			RegistryMessage::Announce(a) => {
				0u8.encode(buf);
				a.encode(buf);
			}
			RegistryMessage::KnownParticipants(known) => {
				1u8.encode(buf);
				known.encode(buf);
			}
			RegistryMessage::ShuttingDown => {
				2u8.encode(buf);
			}
			RegistryMessage::Relay { from, to, kind, payload, hop_count } => {
				3u8.encode(buf);
				from.encode(buf);
				to.encode(buf);
				kind.encode(buf);
				payload.encode(buf);
				hop_count.encode(buf);
			}
		}
	}
}

impl WireDecode for RegistryMessage {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(match u8::decode(buf)? {
			0 => RegistryMessage::Announce(Announcement::decode(buf)?),
			1 => RegistryMessage::KnownParticipants(Vec::<Announcement>::decode(buf)?),
			2 => RegistryMessage::ShuttingDown,
			3 => RegistryMessage::Relay {
				from: String::decode(buf)?,
				to: String::decode(buf)?,
				kind: crate::FrameKind::decode(buf)?,
				payload: Bytes::decode(buf)?,
				hop_count: u8::decode(buf)?,
			},
			other => {
				return Err(ProtocolError::InvalidDiscriminant { ty: "RegistryMessage", value: other as u32 });
			}
		})
	}
}

/// Lifecycle control-plane messages: system commands out, status reports in,
/// plus the workflow configuration and time-sync barrier traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleMessage {
	Command(SystemCommand),
	Status(ParticipantStatus),
	Workflow(WorkflowConfiguration),
	NextSimTask(NextSimTask),
}

impl WireEncode for LifecycleMessage {
	fn encode(&self, buf: &mut BytesMut) {
		match self {
			LifecycleMessage::Command(c) => {
				0u8.encode(buf);
				c.encode(buf);
			}
			LifecycleMessage::Status(s) => {
				1u8.encode(buf);
				s.encode(buf);
			}
			LifecycleMessage::Workflow(w) => {
				2u8.encode(buf);
				w.encode(buf);
			}
			LifecycleMessage::NextSimTask(t) => {
				3u8.encode(buf);
				t.encode(buf);
			}
		}
	}
}

impl WireDecode for LifecycleMessage {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(match u8::decode(buf)? {
			0 => LifecycleMessage::Command(SystemCommand::decode(buf)?),
			1 => LifecycleMessage::Status(ParticipantStatus::decode(buf)?),
			2 => LifecycleMessage::Workflow(WorkflowConfiguration::decode(buf)?),
			3 => LifecycleMessage::NextSimTask(NextSimTask::decode(buf)?),
			other => {
				return Err(ProtocolError::InvalidDiscriminant { ty: "LifecycleMessage", value: other as u32 });
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip<T: WireEncode + WireDecode + PartialEq + std::fmt::Debug>(value: T) {
		let mut buf = BytesMut::new();
		value.encode(&mut buf);
		let mut frozen = buf.freeze();
		assert_eq!(value, T::decode(&mut frozen).unwrap());
		assert!(frozen.is_empty());
	}

	#[test]
	fn next_sim_task_roundtrip() {
		roundtrip(NextSimTask { time_point: 1_000_000, duration: 500_000 });
	}

	#[test]
	fn participant_status_roundtrip() {
		roundtrip(ParticipantStatus {
			participant_name: "ECU1".into(),
			state: ParticipantState::Running,
			enter_reason: "transitioned to Running".into(),
			enter_time: 42,
			refresh_time: 43,
		});
	}

	#[test]
	fn service_descriptor_roundtrip_preserves_label_order() {
		let mut labels = IndexMap::new();
		labels.insert("direction".to_string(), "rx".to_string());
		labels.insert("media".to_string(), "CAN".to_string());
		roundtrip(ServiceDescriptor {
			network_name: "PowertrainCAN1".into(),
			media_type: "CAN".into(),
			supplemental_labels: labels,
			participant_name: "ECU1".into(),
			service_name: "CanController1".into(),
		});
	}

	#[test]
	fn announcement_rejects_major_version_mismatch() {
		let ann = Announcement {
			participant_name: "ECU1".into(),
			participant_id: 1,
			protocol_major: PROTOCOL_VERSION.0 + 1,
			protocol_minor: 0,
			capabilities: vec![],
			acceptor_uris: vec![],
		};
		assert!(matches!(ann.check_version_compatible(), Err(ProtocolError::VersionMismatch { .. })));
	}

	#[test]
	fn announcement_accepts_minor_version_skew() {
		let ann = Announcement {
			participant_name: "ECU1".into(),
			participant_id: 1,
			protocol_major: PROTOCOL_VERSION.0,
			protocol_minor: PROTOCOL_VERSION.1 + 7,
			capabilities: vec![],
			acceptor_uris: vec![],
		};
		assert!(ann.check_version_compatible().is_ok());
	}

	#[test]
	fn sim_message_roundtrip() {
		roundtrip(SimMessage { receiver_index: 3, message_type: 9, payload: Bytes::from_static(b"frame-bytes") });
	}

	#[test]
	fn lifecycle_message_variants_roundtrip() {
		roundtrip(LifecycleMessage::Command(SystemCommand { kind: SystemCommandKind::Run }));
		roundtrip(LifecycleMessage::NextSimTask(NextSimTask { time_point: 0, duration: 1_000 }));
	}
}
