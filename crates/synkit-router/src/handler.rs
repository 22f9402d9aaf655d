use bytes::Bytes;

/// A data-plane message delivered to a local controller/endpoint.
#[derive(Debug, Clone)]
pub struct Envelope {
	pub sender_participant: String,
	pub receiver_index: u16,
	pub message_type: u8,
	pub payload: Bytes,
}

/// Implemented by bus-specific controllers and endpoints (CAN, Ethernet,
/// pub/sub, RPC) to receive envelopes addressed to their receiver index.
///
/// The router stays agnostic of what `payload` means; it only routes by
/// `receiver_index`. This is the capability-trait seam named for the
/// polymorphism redesign: a tagged enum for the wire form, a trait object
/// for the local dispatch target.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
	async fn handle(&self, envelope: Envelope);
}

/// Reserved receiver index for lifecycle control-plane traffic
/// (`SystemCommand`, `ParticipantStatus`, `WorkflowConfiguration`,
/// `NextSimTask`), which is always delivered to the owning participant
/// regardless of how it is otherwise addressed.
pub const LIFECYCLE_RECEIVER_INDEX: u16 = 0;
