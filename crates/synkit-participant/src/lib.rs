//! Layer L8: the participant facade — composes the wire codec, transport,
//! registry client, discovery, router, lifecycle, and time-sync layers
//! behind a single [`Participant`] type.

mod context;
mod controller;
mod error;
mod participant;
mod peer_link;
mod signal;

pub use controller::{CanFrame, Controller, EthernetFrame, PubSubSample, RpcCall, RpcReply};
pub use error::{Result, SynkitError};
pub use participant::Participant;

pub use synkit_config::{
	ExperimentalConfig, LoggingConfig, LoggingSinkConfig, MiddlewareConfig, ParticipantConfiguration,
	TimeSynchronizationConfig,
};
pub use synkit_discovery::{DescriptorQuery, DiscoveryHandle};
pub use synkit_lifecycle::{LifecycleConfiguration, LifecycleHandle, OperationMode, abort_hook, hook};
pub use synkit_monitor::MonitorHandle;
pub use synkit_router::RouterHandle;
pub use synkit_timesync::{AdvanceMode, TimeSyncConfig, TimeSyncHandle};
pub use synkit_wire::{ParticipantState, ParticipantStatus, ServiceDescriptor, SystemCommand, SystemCommandKind};
