//! Live swarm bookkeeping.

mod live;
mod registry;

pub use live::{extract_live_data, LiveData, LiveFile};
pub use registry::{KeyGuard, SwarmRegistry};
