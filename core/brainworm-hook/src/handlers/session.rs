//! `session_start` and `session_end`.

use brainworm_core::scaffold;
use brainworm_core::Result;
use brainworm_protocol::{HookInput, HookOutput};
use serde_json::json;

use crate::dispatch::{HandlerResult, HookContext};

/// Scaffolds the project tree (idempotent), binds the session into unified
/// state, and refreshes the session→correlation link for an active task.
pub fn session_start(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let report = scaffold::ensure_project(&ctx.paths)?;

    let state = match input.session_id.as_deref() {
        Some(session_id) => ctx.state.mutate(|state| {
            state.session_id = Some(session_id.to_string());
            Ok(())
        })?,
        None => ctx.state.get_state()?,
    };

    // A task outlives its sessions: re-link the new session to the active
    // task's correlation id so its events land on the same timeline.
    if let (Some(session_id), Some(correlation_id)) =
        (input.session_id.as_deref(), state.correlation_id.as_deref())
    {
        ctx.correlation.store(session_id, correlation_id)?;
    }

    tracing::info!(
        session = input.session_id.as_deref().unwrap_or("-"),
        scaffolded = report.did_anything(),
        "session started"
    );

    Ok(HandlerResult::new(
        HookOutput::Ack,
        json!({
            "source": input.source,
            "daic_mode": state.daic_mode.as_str(),
            "current_task": state.current_task,
            "scaffold": report,
        }),
    ))
}

pub fn session_end(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let state = ctx.state.get_state()?;

    tracing::info!(
        session = input.session_id.as_deref().unwrap_or("-"),
        "session ended"
    );

    Ok(HandlerResult::new(
        HookOutput::Ack,
        json!({
            "daic_mode": state.daic_mode.as_str(),
            "current_task": state.current_task,
        }),
    ))
}
