//! Layer L7: the virtual-time synchronization barrier. Each time-synced
//! participant runs one of these; there is no central coordinator, only
//! peer-to-peer `NextSimTask` exchange relayed by the message router.

mod commands;
mod error;
mod handle;
mod service;
mod step;
mod types;

pub use error::AbortError;
pub use handle::TimeSyncHandle;
pub use service::TimeSyncService;
pub use step::{StepFuture, StepHandler, step_handler};
pub use types::{AdvanceMode, TimeSyncConfig};

pub use synkit_wire::NextSimTask;
