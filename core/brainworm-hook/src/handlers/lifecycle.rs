//! `stop`, `subagent_stop`, `pre_compact`, `notification`.

use brainworm_core::flags::TRIGGER_PHRASE_DETECTED;
use brainworm_core::tasks::TaskManager;
use brainworm_core::Result;
use brainworm_protocol::{HookInput, HookOutput};
use serde_json::json;

use crate::dispatch::{HandlerResult, HookContext};

/// Shared by `stop` and `subagent_stop`: record the event and get out of
/// the way. A `stop_hook_active` input means we are already inside a stop
/// chain; acknowledging without side effects is what breaks the recursion.
pub fn stop(ctx: &HookContext, input: &HookInput, which: &str) -> Result<HandlerResult> {
    let recursive = input.stop_hook_active.unwrap_or(false);
    if recursive {
        tracing::debug!(hook = which, "stop hook re-entered; acknowledging without action");
    }

    let state = ctx.state.get_state()?;

    // The trigger-phrase flag only needs to survive the prompt that raised
    // it; the turn ending is its consume point.
    let trigger_flag_consumed = if recursive {
        false
    } else {
        ctx.flags.consume(TRIGGER_PHRASE_DETECTED)
    };

    Ok(HandlerResult::new(
        HookOutput::Ack,
        json!({
            "stop_hook_active": recursive,
            "daic_mode": state.daic_mode.as_str(),
            "trigger_flag_consumed": trigger_flag_consumed,
        }),
    ))
}

/// Persists continuity hints into the active task's file so the context
/// survives transcript compaction.
pub fn pre_compact(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let trigger = input.trigger.as_deref().unwrap_or("auto");

    let manager = TaskManager::new(&ctx.paths, &ctx.config, &ctx.state, &ctx.correlation);
    let persisted = manager.record_continuity(trigger, input.custom_instructions.as_deref())?;

    Ok(HandlerResult::new(
        HookOutput::Ack,
        json!({
            "trigger": trigger,
            "continuity_persisted": persisted,
        }),
    ))
}

/// Log-only: notifications carry no state.
pub fn notification(_ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    Ok(HandlerResult::new(
        HookOutput::Ack,
        json!({
            "message": input.message,
        }),
    ))
}
