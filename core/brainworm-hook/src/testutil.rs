//! Shared fixtures for handler unit tests.

use std::path::Path;

use brainworm_core::config::Config;
use brainworm_core::correlation::CorrelationManager;
use brainworm_core::events::EventStore;
use brainworm_core::flags::Flags;
use brainworm_core::state::StateStore;
use brainworm_core::ProjectPaths;
use brainworm_protocol::{HookEventName, HookInput};

use crate::dispatch::HookContext;

/// Builds a full capability set rooted in a temp directory.
pub fn context_at(root: &Path) -> HookContext {
    let paths = ProjectPaths::at_root(root);
    HookContext {
        state: StateStore::new(paths.unified_state_file()),
        correlation: CorrelationManager::new(paths.correlation_file()),
        events: EventStore::open(&paths.events_db()).unwrap(),
        flags: Flags::new(paths.flags_dir()),
        config: Config::default(),
        paths,
    }
}

/// A minimal input for the given event; callers fill in what they need.
pub fn input(event: HookEventName, session_id: &str) -> HookInput {
    HookInput {
        session_id: Some(session_id.to_string()),
        cwd: None,
        hook_event_name: event,
        tool_name: None,
        tool_input: None,
        tool_response: None,
        user_message: None,
        permission_mode: None,
        source: None,
        stop_hook_active: None,
        trigger: None,
        custom_instructions: None,
        execution_id: None,
        agent_name: None,
        message: None,
        transcript: None,
        transcript_path: None,
    }
}
