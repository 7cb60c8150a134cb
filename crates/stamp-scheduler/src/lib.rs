//! The interval scheduler (spec.md §4.D): the transactional "seal next
//! interval" tick, its submission-store and broadcast-sink collaborators,
//! and the main tree's leaf oracle.

mod broadcast;
mod error;
mod main_tree;
mod scheduler;
mod store;

pub use broadcast::{BroadcastSink, HeadWaiter, InMemoryBroadcastSink, DEFAULT_HEAD_QUEUE_DEPTH};
pub use error::SchedulerError;
pub use main_tree::{MainTreeOracle, StagedLeaf};
pub use scheduler::IntervalScheduler;
pub use store::{InMemoryStore, SubmissionStore};

/// Microsecond-precision RFC 3339 timestamp in UTC, matching the textual
/// timestamps carried in submission and interval records (spec.md §3).
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
