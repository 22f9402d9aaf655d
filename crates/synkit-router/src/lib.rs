//! Layer L4: the message router — outbound send, inbound dispatch by
//! receiver index, and the FIFO-per-sender ordering guarantee.

mod commands;
mod error;
mod handle;
mod handler;
mod service;

pub use commands::ConnectionDirection;
pub use error::{Result, RouterError};
pub use handle::RouterHandle;
pub use handler::{Envelope, LIFECYCLE_RECEIVER_INDEX, MessageHandler};
pub use service::RouterService;
