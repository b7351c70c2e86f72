//! Offline mutation queue and connectivity-driven replay.

mod connectivity;
mod queue;

pub use connectivity::ConnectivityMonitor;
pub use queue::{DrainOutcome, DrainReport, SyncQueue};
