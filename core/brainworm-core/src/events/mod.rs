//! Event capture: the SQLite append log, the pre→post timing checkpoint,
//! and tool-success determination.

pub mod outcome;
pub mod store;
pub mod timing;

pub use outcome::tool_succeeded;
pub use store::{canonical_json, next_timestamp_ns, EventStore, LoggedEvent};
pub use timing::TimingCheckpoint;
