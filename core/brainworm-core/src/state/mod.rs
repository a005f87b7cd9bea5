//! Unified session state: the single JSON document recording DAIC mode,
//! the active task, and session↔correlation identity.
//!
//! Writers go through [`StateStore`], which serializes mutations with an
//! exclusive file lock and atomic replacement. Readers take snapshots
//! without locking and may observe a stale-but-consistent image.

mod store;
mod types;

pub use store::StateStore;
pub use types::{DaicMode, Developer, UnifiedState};
