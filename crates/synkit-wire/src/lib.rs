//! Wire framing and message types shared by every synkit layer.
//!
//! Layer L0: a length-prefixed frame header plus typed encode/decode for the
//! control-plane and data-plane message kinds exchanged between peers.

mod error;
mod frame;
mod message;
mod primitive;

pub use error::{ProtocolError, Result};
pub use frame::{FrameKind, MAX_FRAME_SIZE, encode_frame, try_decode_frame};
pub use message::{
	Announcement, LifecycleMessage, NextSimTask, ParticipantDiscoveryEvent, ParticipantState,
	ParticipantStatus, RegistryMessage, ServiceDescriptor, SimMessage, SystemCommand,
	SystemCommandKind, WorkflowConfiguration, PROTOCOL_VERSION,
};
pub use primitive::{WireDecode, WireEncode};
