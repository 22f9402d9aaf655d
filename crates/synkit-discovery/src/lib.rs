//! Layer L3: service discovery — descriptor publication, matching, and
//! history-1 replay to late joiners.

mod commands;
mod handle;
mod matching;
mod service;

pub use commands::DiscoveryCmd;
pub use handle::DiscoveryHandle;
pub use matching::DescriptorQuery;
pub use service::DiscoveryService;
