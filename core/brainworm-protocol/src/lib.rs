//! Hook wire types shared by the dispatcher and its tests.
//!
//! This crate is the single definition of what the host sends on stdin and
//! what a hook may write to stdout. The dispatcher remains the authority on
//! validation, but keeping the schema here prevents drift between the hook
//! binary, the CLI, and integration tests.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hook events recognized by the dispatcher.
///
/// The host historically sent PascalCase names (`PreToolUse`); newer payloads
/// use snake_case. Both spellings deserialize to the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventName {
    #[serde(alias = "SessionStart")]
    SessionStart,
    #[serde(alias = "UserPromptSubmit")]
    UserPromptSubmit,
    #[serde(alias = "PreToolUse")]
    PreToolUse,
    #[serde(alias = "PostToolUse")]
    PostToolUse,
    #[serde(alias = "SessionEnd")]
    SessionEnd,
    #[serde(alias = "Stop")]
    Stop,
    #[serde(alias = "SubagentStop")]
    SubagentStop,
    #[serde(alias = "PreCompact")]
    PreCompact,
    #[serde(alias = "Notification")]
    Notification,
    #[serde(alias = "TranscriptProcessor")]
    TranscriptProcessor,
}

impl HookEventName {
    /// Canonical snake_case name used for event rows and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEventName::SessionStart => "session_start",
            HookEventName::UserPromptSubmit => "user_prompt_submit",
            HookEventName::PreToolUse => "pre_tool_use",
            HookEventName::PostToolUse => "post_tool_use",
            HookEventName::SessionEnd => "session_end",
            HookEventName::Stop => "stop",
            HookEventName::SubagentStop => "subagent_stop",
            HookEventName::PreCompact => "pre_compact",
            HookEventName::Notification => "notification",
            HookEventName::TranscriptProcessor => "transcript_processor",
        }
    }

    /// PascalCase name used inside the host's `hookSpecificOutput` envelope.
    pub fn envelope_name(&self) -> &'static str {
        match self {
            HookEventName::SessionStart => "SessionStart",
            HookEventName::UserPromptSubmit => "UserPromptSubmit",
            HookEventName::PreToolUse => "PreToolUse",
            HookEventName::PostToolUse => "PostToolUse",
            HookEventName::SessionEnd => "SessionEnd",
            HookEventName::Stop => "Stop",
            HookEventName::SubagentStop => "SubagentStop",
            HookEventName::PreCompact => "PreCompact",
            HookEventName::Notification => "Notification",
            HookEventName::TranscriptProcessor => "TranscriptProcessor",
        }
    }
}

/// Host permission mode, forwarded verbatim in event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionMode {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "plan")]
    Plan,
    #[serde(rename = "acceptEdits")]
    AcceptEdits,
    #[serde(rename = "bypassPermissions")]
    BypassPermissions,
}

/// How the session was started (`session_start` only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Startup,
    Resume,
    Clear,
    Compact,
}

/// One JSON document read from stdin per invocation.
///
/// Everything except `hook_event_name` is optional at the parse layer; the
/// dispatcher validates per-event requirements afterwards so that a missing
/// field produces a structured validation outcome instead of a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    pub hook_event_name: HookEventName,

    #[serde(default)]
    pub tool_name: Option<String>,

    #[serde(default)]
    pub tool_input: Option<Value>,

    #[serde(default)]
    pub tool_response: Option<Value>,

    /// The submitted prompt. The host has used both field names.
    #[serde(default, alias = "prompt")]
    pub user_message: Option<String>,

    #[serde(default)]
    pub permission_mode: Option<PermissionMode>,

    #[serde(default)]
    pub source: Option<SessionSource>,

    #[serde(default)]
    pub stop_hook_active: Option<bool>,

    #[serde(default)]
    pub trigger: Option<String>,

    #[serde(default)]
    pub custom_instructions: Option<String>,

    /// Unique per tool-execution attempt; joins pre and post events.
    #[serde(default, alias = "tool_use_id")]
    pub execution_id: Option<String>,

    #[serde(default)]
    pub agent_name: Option<String>,

    /// Notification text (`notification` only).
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub transcript: Option<Value>,

    #[serde(default)]
    pub transcript_path: Option<String>,
}

impl HookInput {
    /// Checks the per-event required fields. Returns the name of the first
    /// missing field, or `None` when the input is dispatchable.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self.hook_event_name {
            HookEventName::PreToolUse => {
                if self.tool_name.is_none() {
                    return Some("tool_name");
                }
                None
            }
            HookEventName::PostToolUse => {
                if self.tool_name.is_none() {
                    return Some("tool_name");
                }
                None
            }
            HookEventName::UserPromptSubmit => {
                if self.user_message.is_none() {
                    return Some("user_message");
                }
                None
            }
            HookEventName::TranscriptProcessor => {
                if self.agent_name.is_none() {
                    return Some("agent_name");
                }
                None
            }
            _ => None,
        }
    }
}

/// Verdict for `pre_tool_use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Deny,
}

/// Tool-gating decision returned by the DAIC engine and serialized into the
/// `PreToolUse` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDecision {
    pub permission: Permission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
}

impl ToolDecision {
    pub fn allow() -> Self {
        Self {
            permission: Permission::Allow,
            user_message: None,
            updated_input: None,
        }
    }

    pub fn deny(user_message: impl Into<String>) -> Self {
        Self {
            permission: Permission::Deny,
            user_message: Some(user_message.into()),
            updated_input: None,
        }
    }

    pub fn is_deny(&self) -> bool {
        self.permission == Permission::Deny
    }
}

/// What a handler hands back to the dispatcher for stdout serialization.
#[derive(Debug, Clone)]
pub enum HookOutput {
    /// `pre_tool_use` decision, wrapped in `hookSpecificOutput`.
    Decision(ToolDecision),
    /// `user_prompt_submit` response with optional injected context.
    PromptContext { additional_context: Option<String> },
    /// `transcript_processor` response carrying the cleaned transcript.
    Transcript { cleaned: Value, chunks: usize },
    /// Plain acknowledgement for hooks without a decision surface.
    Ack,
    /// Validation failure: the host must continue, so this is still exit 0.
    Invalid { field: &'static str, message: String },
}

impl HookOutput {
    /// Serializes under the host's response contract for the given event.
    pub fn to_json(&self, event: HookEventName) -> Value {
        match self {
            HookOutput::Decision(decision) => {
                let mut body = json!({
                    "hookEventName": event.envelope_name(),
                    "permission": decision.permission,
                });
                if let Some(message) = &decision.user_message {
                    body["user_message"] = json!(message);
                }
                if let Some(updated) = &decision.updated_input {
                    body["updated_input"] = updated.clone();
                }
                json!({ "hookSpecificOutput": body })
            }
            HookOutput::PromptContext { additional_context } => {
                let mut body = json!({ "hookEventName": event.envelope_name() });
                if let Some(context) = additional_context {
                    body["additional_context"] = json!(context);
                }
                json!({ "hookSpecificOutput": body })
            }
            HookOutput::Transcript { cleaned, chunks } => json!({
                "hookSpecificOutput": {
                    "hookEventName": event.envelope_name(),
                    "cleaned_transcript": cleaned,
                    "chunk_count": chunks,
                }
            }),
            HookOutput::Ack => json!({ "ok": true }),
            HookOutput::Invalid { field, message } => json!({
                "ok": false,
                "validation_error": { "field": field, "message": message },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pascal_case_event_names() {
        let input: HookInput = serde_json::from_str(
            r#"{"session_id":"s1","cwd":"/p","hook_event_name":"PreToolUse","tool_name":"Edit"}"#,
        )
        .unwrap();
        assert_eq!(input.hook_event_name, HookEventName::PreToolUse);
    }

    #[test]
    fn parses_snake_case_event_names() {
        let input: HookInput = serde_json::from_str(
            r#"{"session_id":"s1","cwd":"/p","hook_event_name":"pre_tool_use","tool_name":"Edit"}"#,
        )
        .unwrap();
        assert_eq!(input.hook_event_name, HookEventName::PreToolUse);
    }

    #[test]
    fn prompt_alias_maps_to_user_message() {
        let input: HookInput = serde_json::from_str(
            r#"{"hook_event_name":"user_prompt_submit","prompt":"make it so"}"#,
        )
        .unwrap();
        assert_eq!(input.user_message.as_deref(), Some("make it so"));
    }

    #[test]
    fn tool_use_id_alias_maps_to_execution_id() {
        let input: HookInput = serde_json::from_str(
            r#"{"hook_event_name":"post_tool_use","tool_name":"Bash","tool_use_id":"E1"}"#,
        )
        .unwrap();
        assert_eq!(input.execution_id.as_deref(), Some("E1"));
    }

    #[test]
    fn missing_tool_name_is_reported() {
        let input: HookInput =
            serde_json::from_str(r#"{"hook_event_name":"pre_tool_use"}"#).unwrap();
        assert_eq!(input.missing_field(), Some("tool_name"));
    }

    #[test]
    fn deny_decision_serializes_under_envelope() {
        let output = HookOutput::Decision(ToolDecision::deny("[DAIC: Tool Blocked] nope"));
        let value = output.to_json(HookEventName::PreToolUse);
        assert_eq!(
            value["hookSpecificOutput"]["hookEventName"],
            json!("PreToolUse")
        );
        assert_eq!(value["hookSpecificOutput"]["permission"], json!("deny"));
        assert!(value["hookSpecificOutput"]["user_message"]
            .as_str()
            .unwrap()
            .starts_with("[DAIC: Tool Blocked]"));
    }

    #[test]
    fn allow_decision_omits_user_message() {
        let output = HookOutput::Decision(ToolDecision::allow());
        let value = output.to_json(HookEventName::PreToolUse);
        assert!(value["hookSpecificOutput"].get("user_message").is_none());
    }

    #[test]
    fn permission_mode_accepts_camel_case_values() {
        let mode: PermissionMode = serde_json::from_str(r#""acceptEdits""#).unwrap();
        assert_eq!(mode, PermissionMode::AcceptEdits);
    }
}
