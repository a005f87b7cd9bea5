//! One handler per hook event, routed through a dispatch table.
//!
//! Handlers are thin orchestrations over the capability set in
//! [`HookContext`]: they read state, derive a verdict or perform the
//! event's side effect, and hand back the stdout document plus the event
//! payload. The dispatcher owns the single event-log append.

mod lifecycle;
mod prompt;
mod session;
mod tool_use;
mod transcript;

use brainworm_core::Result;
use brainworm_protocol::{HookEventName, HookInput};

use crate::dispatch::{HandlerResult, HookContext};

pub fn dispatch(
    event: HookEventName,
    ctx: &HookContext,
    input: &HookInput,
) -> Result<HandlerResult> {
    match event {
        HookEventName::SessionStart => session::session_start(ctx, input),
        HookEventName::SessionEnd => session::session_end(ctx, input),
        HookEventName::UserPromptSubmit => prompt::user_prompt_submit(ctx, input),
        HookEventName::PreToolUse => tool_use::pre_tool_use(ctx, input),
        HookEventName::PostToolUse => tool_use::post_tool_use(ctx, input),
        HookEventName::Stop => lifecycle::stop(ctx, input, "stop"),
        HookEventName::SubagentStop => lifecycle::stop(ctx, input, "subagent_stop"),
        HookEventName::PreCompact => lifecycle::pre_compact(ctx, input),
        HookEventName::Notification => lifecycle::notification(ctx, input),
        HookEventName::TranscriptProcessor => transcript::transcript_processor(ctx, input),
    }
}
