//! `pre_tool_use` and `post_tool_use`: the gating decision and the timing
//! join across the two process invocations.

use brainworm_core::events::{timing, tool_succeeded, TimingCheckpoint};
use brainworm_core::flags::IN_SUBAGENT_CONTEXT;
use brainworm_core::Result;
use brainworm_protocol::{HookInput, HookOutput, Permission};
use serde_json::{json, Value};

use crate::dispatch::{HandlerResult, HookContext};

pub fn pre_tool_use(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let tool_name = input.tool_name.as_deref().unwrap_or_default();
    let state = ctx.state.get_state()?;

    // Checkpoint first: even a denied tool attempt gets its timing slot, and
    // a stale checkpoint from an aborted execution is overwritten here.
    if let Some(session_id) = input.session_id.as_deref() {
        let checkpoint = TimingCheckpoint::now(tool_name, state.correlation_id.as_deref());
        timing::write(&ctx.paths.state_dir(), session_id, &checkpoint)?;
    }

    let decision = ctx.state.should_block_tool(
        &ctx.config,
        ctx.flags.exists(IN_SUBAGENT_CONTEXT),
        tool_name,
        input.tool_input.as_ref(),
    )?;

    if decision.is_deny() {
        tracing::info!(
            tool = tool_name,
            mode = state.daic_mode.as_str(),
            "tool blocked by DAIC"
        );
    }

    let event_data = json!({
        "tool_name": tool_name,
        "daic_mode": state.daic_mode.as_str(),
        "permission": match decision.permission {
            Permission::Allow => "allow",
            Permission::Deny => "deny",
        },
        "reason": decision.user_message.clone(),
    });

    Ok(HandlerResult::new(
        HookOutput::Decision(decision),
        event_data,
    ))
}

pub fn post_tool_use(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let tool_name = input.tool_name.as_deref().unwrap_or_default();

    let checkpoint = input
        .session_id
        .as_deref()
        .and_then(|session_id| timing::consume(&ctx.paths.state_dir(), session_id));

    // A post without its pre is possible (pre skipped, host restarted). The
    // explicit marker keeps that distinguishable from a join bug downstream.
    let (timing_payload, duration_ms) = match &checkpoint {
        Some(checkpoint) => {
            let elapsed = checkpoint.elapsed_ms();
            (
                json!({ "execution_duration_ms": elapsed }),
                Some(elapsed),
            )
        }
        None => (Value::Null, None),
    };

    let success = tool_succeeded(input.tool_response.as_ref());

    // A finished subagent execution releases its full-tool-access window.
    let consumed_subagent_flag = ctx.flags.consume(IN_SUBAGENT_CONTEXT);

    let mut event_data = json!({
        "tool_name": tool_name,
        "success": success,
        "timing": timing_payload,
    });
    if checkpoint.is_none() {
        event_data["timing_checkpoint"] = json!("missing");
    }
    if consumed_subagent_flag {
        event_data["subagent_context_released"] = json!(true);
    }

    let mut result = HandlerResult::new(HookOutput::Ack, event_data);
    result.duration_ms = duration_ms;
    Ok(result)
}
