//! Layer L1: peer connections over TCP or Unix-domain sockets.
//!
//! One reader task and one writer task per connection, a bounded outbound
//! queue per peer, and connect-retry with a capped exponential backoff.

mod backoff;
mod connection;
mod error;
mod listener;
mod uri;

pub use backoff::ConnectBackoff;
pub use connection::{OUTBOUND_QUEUE_CAPACITY, PeerEvent, PeerHandle, relay_via, spawn};
pub use error::{Result, TimeoutError, TransportError};
pub use listener::{PeerListener, connect_with_retry};
pub use uri::{PeerUri, prefer_local};
