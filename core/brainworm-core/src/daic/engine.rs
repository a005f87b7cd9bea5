//! Tool-gating decisions for `pre_tool_use`.
//!
//! Pure derivation from mode + config + the subagent flag; no I/O here.
//! The deny text carries the `[DAIC: Tool Blocked]` tag and always ends
//! with a remediation the user can act on.

use brainworm_protocol::ToolDecision;
use serde_json::Value;

use crate::config::Config;
use crate::daic::bash;
use crate::state::DaicMode;

/// Inputs the gating decision depends on. Collected by the caller so this
/// function stays deterministic and testable.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub mode: DaicMode,
    pub in_subagent_context: bool,
    pub config: &'a Config,
}

/// Decides whether a tool invocation may proceed.
pub fn gate_tool(ctx: &GateContext<'_>, tool_name: &str, tool_input: Option<&Value>) -> ToolDecision {
    if !ctx.config.daic.enabled {
        return ToolDecision::allow();
    }
    if ctx.mode == DaicMode::Implementation {
        return ToolDecision::allow();
    }
    // Sub-agents get full tool access during their scoped execution.
    if ctx.in_subagent_context {
        return ToolDecision::allow();
    }

    if ctx.config.daic.blocked_tools.iter().any(|t| t == tool_name) {
        return ToolDecision::deny(blocked_tool_message(tool_name, ctx.config));
    }

    if tool_name == "Bash" {
        let command = tool_input
            .and_then(|input| input.get("command"))
            .and_then(|c| c.as_str())
            .unwrap_or("");
        match bash::classify(command, &ctx.config.daic.read_only_bash_commands) {
            bash::Verdict::Allowed => return ToolDecision::allow(),
            bash::Verdict::Blocked { reason } => {
                return ToolDecision::deny(blocked_bash_message(&reason, ctx.config));
            }
        }
    }

    ToolDecision::allow()
}

fn suggested_phrase(config: &Config) -> String {
    config
        .daic
        .trigger_phrases
        .first()
        .cloned()
        .unwrap_or_else(|| "make it so".to_string())
}

fn blocked_tool_message(tool_name: &str, config: &Config) -> String {
    format!(
        "[DAIC: Tool Blocked] You're in discussion mode, and {tool_name} \
         modifies files. Discuss the approach first; when the user is ready \
         to proceed they can say \"{}\" or run `daic implementation`.",
        suggested_phrase(config)
    )
}

fn blocked_bash_message(reason: &str, config: &Config) -> String {
    format!(
        "[DAIC: Tool Blocked] You're in discussion mode and this command is \
         not read-only: {reason}. Read-only commands are fine; for anything \
         that mutates, wait for the user to say \"{}\" or run `daic \
         implementation`.",
        suggested_phrase(config)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(config: &Config, mode: DaicMode, in_subagent: bool) -> GateContext<'_> {
        GateContext {
            mode,
            in_subagent_context: in_subagent,
            config,
        }
    }

    #[test]
    fn implementation_mode_allows_everything() {
        let config = Config::default();
        let decision = gate_tool(
            &ctx(&config, DaicMode::Implementation, false),
            "Edit",
            None,
        );
        assert!(!decision.is_deny());
    }

    #[test]
    fn discussion_blocks_configured_tools() {
        let config = Config::default();
        for tool in ["Edit", "Write", "MultiEdit", "NotebookEdit"] {
            let decision = gate_tool(&ctx(&config, DaicMode::Discussion, false), tool, None);
            assert!(decision.is_deny(), "{tool} should be denied");
            let message = decision.user_message.unwrap();
            assert!(message.starts_with("[DAIC: Tool Blocked]"));
            assert!(message.contains("make it so"));
        }
    }

    #[test]
    fn subagent_flag_bypasses_discussion_gating() {
        let config = Config::default();
        let decision = gate_tool(&ctx(&config, DaicMode::Discussion, true), "Edit", None);
        assert!(!decision.is_deny());
    }

    #[test]
    fn discussion_allows_unlisted_tools() {
        let config = Config::default();
        let decision = gate_tool(&ctx(&config, DaicMode::Discussion, false), "Read", None);
        assert!(!decision.is_deny());
    }

    #[test]
    fn bash_defers_to_the_classifier() {
        let config = Config::default();
        let input = json!({"command": "ls -la | grep -E \"(task|script)\""});
        let decision = gate_tool(
            &ctx(&config, DaicMode::Discussion, false),
            "Bash",
            Some(&input),
        );
        assert!(!decision.is_deny());

        let input = json!({"command": "find . -name '*.tmp' -delete"});
        let decision = gate_tool(
            &ctx(&config, DaicMode::Discussion, false),
            "Bash",
            Some(&input),
        );
        assert!(decision.is_deny());
        assert!(decision.user_message.unwrap().contains("-delete"));
    }

    #[test]
    fn daic_disabled_allows_everything() {
        let mut config = Config::default();
        config.daic.enabled = false;
        let decision = gate_tool(&ctx(&config, DaicMode::Discussion, false), "Edit", None);
        assert!(!decision.is_deny());
    }

    #[test]
    fn bash_with_missing_command_field_is_allowed() {
        let config = Config::default();
        let input = json!({});
        let decision = gate_tool(
            &ctx(&config, DaicMode::Discussion, false),
            "Bash",
            Some(&input),
        );
        assert!(!decision.is_deny());
    }
}
