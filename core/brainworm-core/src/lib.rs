//! brainworm-core: workflow enforcement and event capture for an
//! interactive coding assistant.
//!
//! # Architecture
//!
//! Every hook invocation is a short-lived single-threaded process. There is
//! no daemon and no shared address space; coordination happens through the
//! filesystem and SQLite:
//!
//! ```text
//! host → brainworm-hook → handlers → { StateStore, CorrelationManager,
//!                                      EventStore, Flags, TaskManager }
//!                                         │
//!                             <project>/.brainworm/{state,events,tasks}
//! ```
//!
//! Ownership is strict: unified state is written only through
//! [`state::StateStore`], the correlation map only through
//! [`correlation::CorrelationManager`], event rows only through
//! [`events::EventStore`]. Coordination flags have a single creator and a
//! single consumer. Collaborators are constructed per invocation and passed
//! down; nothing is a process-global.

pub mod config;
pub mod correlation;
pub mod daic;
pub mod error;
pub mod events;
pub mod flags;
pub mod lock;
pub mod paths;
pub mod scaffold;
pub mod state;
pub mod tasks;

pub use error::{BrainwormError, Result};
pub use paths::ProjectPaths;
