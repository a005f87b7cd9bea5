//! `transcript_processor`: cleans a conversation transcript for a subagent
//! and chunks it into files the agent can page through.
//!
//! Pre-work noise (system entries, empty entries, anything before the first
//! user turn) is stripped. The remainder is chunked by an estimated token
//! budget into ordered files under `state/<agent>/`, and the
//! `in_subagent_context` flag is raised so tool gating steps aside for the
//! scoped execution.

use brainworm_core::flags::IN_SUBAGENT_CONTEXT;
use brainworm_core::Result;
use brainworm_protocol::{HookInput, HookOutput};
use fs_err as fs;
use serde_json::{json, Value};

use crate::dispatch::{HandlerResult, HookContext};

/// Default per-chunk budget in estimated tokens.
const TOKEN_BUDGET: usize = 18_000;

/// Rough chars-per-token ratio; close enough for chunk sizing.
const CHARS_PER_TOKEN: usize = 4;

pub fn transcript_processor(ctx: &HookContext, input: &HookInput) -> Result<HandlerResult> {
    let agent = sanitize_agent_name(input.agent_name.as_deref().unwrap_or_default());

    let entries: Vec<Value> = match &input.transcript {
        Some(Value::Array(entries)) => entries.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };

    let entries_in = entries.len();
    let cleaned = clean_transcript(entries);
    let chunks = chunk_entries(&cleaned, TOKEN_BUDGET);

    let agent_dir = ctx.paths.agent_state_dir(&agent);
    fs::create_dir_all(&agent_dir).map_err(|source| {
        brainworm_core::BrainwormError::Io {
            context: format!("creating agent state dir {}", agent_dir.display()),
            source,
        }
    })?;

    // Stale chunks from a previous run of this agent would interleave with
    // the new ordering; clear them first.
    if let Ok(existing) = fs::read_dir(&agent_dir) {
        for entry in existing.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy().into_owned();
            if name.starts_with("transcript-") && name.ends_with(".json") {
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    for (index, chunk) in chunks.iter().enumerate() {
        let chunk_path = agent_dir.join(format!("transcript-{:03}.json", index + 1));
        let content = serde_json::to_string_pretty(&Value::Array(chunk.clone()))
            .map_err(|source| brainworm_core::BrainwormError::Json {
                context: "serializing transcript chunk".to_string(),
                source,
            })?;
        fs::write(&chunk_path, content).map_err(|source| brainworm_core::BrainwormError::Io {
            context: format!("writing transcript chunk {}", chunk_path.display()),
            source,
        })?;
    }

    ctx.flags.create(IN_SUBAGENT_CONTEXT)?;

    tracing::info!(
        agent = %agent,
        entries_in,
        entries_out = cleaned.len(),
        chunks = chunks.len(),
        "transcript processed for subagent"
    );

    let event_data = json!({
        "agent": agent,
        "entries_in": entries_in,
        "entries_out": cleaned.len(),
        "chunks": chunks.len(),
    });

    Ok(HandlerResult::new(
        HookOutput::Transcript {
            cleaned: Value::Array(cleaned),
            chunks: chunks.len(),
        },
        event_data,
    ))
}

/// Directory-safe agent name: anything outside `[a-z0-9_-]` becomes `-`.
fn sanitize_agent_name(agent: &str) -> String {
    let sanitized: String = agent
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "agent".to_string()
    } else {
        sanitized
    }
}

/// Drops pre-work noise: system entries, entries with no content, and
/// everything before the first user turn.
fn clean_transcript(entries: Vec<Value>) -> Vec<Value> {
    let first_user = entries
        .iter()
        .position(|entry| entry.get("role").and_then(Value::as_str) == Some("user"));

    let Some(first_user) = first_user else {
        // No user turn at all: nothing qualifies as work.
        return Vec::new();
    };

    entries
        .into_iter()
        .skip(first_user)
        .filter(|entry| {
            let role = entry.get("role").and_then(Value::as_str);
            if role == Some("system") {
                return false;
            }
            match entry.get("content") {
                Some(Value::String(text)) => !text.trim().is_empty(),
                Some(Value::Null) | None => false,
                Some(_) => true,
            }
        })
        .collect()
}

fn estimate_tokens(entry: &Value) -> usize {
    let chars = entry.to_string().chars().count();
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Greedy chunking: entries accumulate until the budget would overflow. An
/// entry bigger than the whole budget still gets a chunk of its own.
fn chunk_entries(entries: &[Value], budget: usize) -> Vec<Vec<Value>> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_tokens = 0;

    for entry in entries {
        let tokens = estimate_tokens(entry);
        if !current.is_empty() && current_tokens + tokens > budget {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current_tokens += tokens;
        current.push(entry.clone());
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(role: &str, content: &str) -> Value {
        json!({ "role": role, "content": content })
    }

    #[test]
    fn cleaning_drops_leading_non_user_entries() {
        let entries = vec![
            entry("system", "you are an agent"),
            entry("assistant", "warming up"),
            entry("user", "do the thing"),
            entry("assistant", "on it"),
        ];
        let cleaned = clean_transcript(entries);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0]["role"], json!("user"));
    }

    #[test]
    fn cleaning_drops_system_and_empty_entries_after_first_user() {
        let entries = vec![
            entry("user", "start"),
            entry("system", "injected reminder"),
            entry("assistant", "   "),
            entry("assistant", "real answer"),
        ];
        let cleaned = clean_transcript(entries);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[1]["content"], json!("real answer"));
    }

    #[test]
    fn transcript_without_user_turns_cleans_to_nothing() {
        let entries = vec![entry("system", "a"), entry("assistant", "b")];
        assert!(clean_transcript(entries).is_empty());
    }

    #[test]
    fn chunking_respects_the_budget() {
        let entries: Vec<Value> = (0..10).map(|_| entry("user", &"x".repeat(400))).collect();
        let per_entry = estimate_tokens(&entries[0]);

        // Budget fits three entries per chunk.
        let chunks = chunk_entries(&entries, per_entry * 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        let total: usize = chunks.iter().map(Vec::len).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn oversized_entry_gets_its_own_chunk() {
        let entries = vec![entry("user", &"y".repeat(10_000)), entry("user", "tiny")];
        let chunks = chunk_entries(&entries, 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 1);
    }

    #[test]
    fn agent_names_are_directory_safe() {
        assert_eq!(sanitize_agent_name("Code Reviewer"), "code-reviewer");
        assert_eq!(sanitize_agent_name("../evil"), "---evil");
        assert_eq!(sanitize_agent_name(""), "agent");
    }
}
