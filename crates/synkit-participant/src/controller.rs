use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use synkit_discovery::{DescriptorQuery, DiscoveryHandle};
use synkit_router::{Envelope, MessageHandler, RouterHandle};

/// Source of fresh router receiver indices. `0` is reserved for the
/// lifecycle control plane (`synkit_router::LIFECYCLE_RECEIVER_INDEX`).
static NEXT_RECEIVER_INDEX: AtomicU16 = AtomicU16::new(1);

fn next_receiver_index() -> u16 {
	NEXT_RECEIVER_INDEX.fetch_add(1, Ordering::Relaxed)
}

/// A bus-specific controller/endpoint bound to one router receiver index.
///
/// Generic over the serializable payload type: bus-specific wire formats
/// (CAN arbitration, Ethernet framing, LIN state machines) beyond plain
/// serialization are out of scope, so every controller flavor is this same
/// type parameterized over a small payload struct.
pub struct Controller<T> {
	router: RouterHandle,
	discovery: DiscoveryHandle,
	participant_name: String,
	receiver_index: u16,
	message_type: u8,
	network_name: String,
	media_type: String,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Controller<T> {
	fn clone(&self) -> Self {
		Controller {
			router: self.router.clone(),
			discovery: self.discovery.clone(),
			participant_name: self.participant_name.clone(),
			receiver_index: self.receiver_index,
			message_type: self.message_type,
			network_name: self.network_name.clone(),
			media_type: self.media_type.clone(),
			_marker: PhantomData,
		}
	}
}

impl<T> Controller<T>
where
	T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
	/// Registers a fresh controller with the router and returns it together
	/// with the channel its inbound messages are delivered on, tagged with
	/// the sending participant's name. `network_name`/`media_type` identify
	/// this controller's service descriptor, so `broadcast` can resolve
	/// subscribers through discovery instead of requiring an explicit
	/// target list.
	pub(crate) async fn create(
		router: RouterHandle,
		discovery: DiscoveryHandle,
		participant_name: String,
		message_type: u8,
		network_name: impl Into<String>,
		media_type: impl Into<String>,
	) -> (Self, mpsc::Receiver<(String, T)>) {
		let receiver_index = next_receiver_index();
		let (tx, rx) = mpsc::channel(256);
		router.register_handler(receiver_index, Arc::new(ControllerHandler::<T> { tx, _marker: PhantomData })).await;
		(
			Controller {
				router,
				discovery,
				participant_name,
				receiver_index,
				message_type,
				network_name: network_name.into(),
				media_type: media_type.into(),
				_marker: PhantomData,
			},
			rx,
		)
	}

	pub fn receiver_index(&self) -> u16 {
		self.receiver_index
	}

	pub fn participant_name(&self) -> &str {
		&self.participant_name
	}

	/// Serializes and sends `value` to `target_participant`'s controller at
	/// the same receiver index.
	pub async fn send(&self, target_participant: impl Into<String>, value: &T) -> serde_json::Result<()> {
		let payload = serde_json::to_vec(value)?;
		self.router
			.send(target_participant.into(), self.receiver_index, self.message_type, Bytes::from(payload))
			.await;
		Ok(())
	}

	/// Sends `value` to every peer currently known to host a subscriber on
	/// this controller's network/media — resolved through discovery rather
	/// than an explicit target list. This participant's own descriptors are
	/// excluded.
	pub async fn broadcast(&self, value: &T) -> serde_json::Result<()> {
		let query = DescriptorQuery {
			network_name: self.network_name.clone(),
			media_type: self.media_type.clone(),
			required_labels: Vec::new(),
		};
		let descriptors = self.discovery.resolve(&query).await;
		let mut targets = HashSet::new();
		for descriptor in descriptors {
			if descriptor.participant_name != self.participant_name {
				targets.insert(descriptor.participant_name);
			}
		}
		let payload = serde_json::to_vec(value)?;
		for target in targets {
			self.router.send(target, self.receiver_index, self.message_type, Bytes::from(payload.clone())).await;
		}
		Ok(())
	}
}

struct ControllerHandler<T> {
	tx: mpsc::Sender<(String, T)>,
	_marker: PhantomData<fn() -> T>,
}

#[async_trait::async_trait]
impl<T> MessageHandler for ControllerHandler<T>
where
	T: DeserializeOwned + Send + Sync + 'static,
{
	async fn handle(&self, envelope: Envelope) {
		match serde_json::from_slice::<T>(&envelope.payload) {
			Ok(value) => {
				let _ = self.tx.send((envelope.sender_participant, value)).await;
			}
			Err(err) => {
				tracing::warn!(error = %err, "dropping undecodable controller payload");
			}
		}
	}
}

/// A CAN frame, timestamped at the virtual time of the step it was sent in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanFrame {
	pub can_id: u32,
	pub payload: Vec<u8>,
	pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthernetFrame {
	pub destination_mac: [u8; 6],
	pub payload: Vec<u8>,
	pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubSubSample {
	pub payload: Vec<u8>,
	pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
	pub call_id: u64,
	pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
	pub call_id: u64,
	pub payload: Vec<u8>,
}
