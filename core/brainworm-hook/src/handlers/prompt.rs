//! `user_prompt_submit`: trigger-phrase detection and the
//! discussion→implementation transition.

use brainworm_core::daic::detect_trigger_phrase;
use brainworm_core::flags::TRIGGER_PHRASE_DETECTED;
use brainworm_core::state::DaicMode;
use brainworm_core::Result;
use brainworm_protocol::{HookInput, HookOutput};
use serde_json::json;

use crate::dispatch::{HandlerResult, HookContext};

pub fn user_prompt_submit(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let prompt = input.user_message.as_deref().unwrap_or("");
    let state = ctx.state.get_state()?;

    let matched = if ctx.config.daic.enabled {
        detect_trigger_phrase(prompt, &ctx.config.daic.trigger_phrases)
    } else {
        None
    };

    // Only discussion→implementation is phrase-driven; the reverse
    // transition belongs to the user's CLI alone.
    let transition = match matched {
        Some(phrase) if state.daic_mode == DaicMode::Discussion => {
            let new_state = ctx.state.set_daic_mode(DaicMode::Implementation)?;
            // Flag creation lets sibling hooks fired for this same prompt
            // observe the switch before they re-read state.
            ctx.flags.create(TRIGGER_PHRASE_DETECTED)?;

            tracing::info!(phrase = %phrase, "trigger phrase flipped DAIC to implementation");

            Some(json!({
                "from": DaicMode::Discussion.as_str(),
                "to": new_state.daic_mode.as_str(),
                "trigger": "user_phrase",
                "phrase": phrase,
            }))
        }
        _ => None,
    };

    let additional_context = transition.as_ref().map(|_| {
        "[DAIC] Implementation mode engaged by trigger phrase. File-modifying \
         tools are now permitted for this work."
            .to_string()
    });

    let event_data = json!({
        "prompt_chars": prompt.chars().count(),
        "daic_mode": ctx.state.get_state()?.daic_mode.as_str(),
        "mode_transition": transition,
    });

    Ok(HandlerResult::new(
        HookOutput::PromptContext { additional_context },
        event_data,
    ))
}
