//! Layer L5: the per-participant lifecycle state machine.

mod commands;
mod error;
mod handle;
mod handlers;
mod service;
mod types;

pub use commands::LifecycleCmd;
pub use error::{Result, StateError};
pub use handle::LifecycleHandle;
pub use handlers::{AbortHook, HandlerSet, Hook, HookFuture, abort_hook, hook};
pub use service::LifecycleService;
pub use types::{LifecycleConfiguration, OperationMode};

pub use synkit_wire::{ParticipantState, ParticipantStatus, SystemCommand, SystemCommandKind};
