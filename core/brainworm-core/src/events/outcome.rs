//! Tool-execution success determination for `post_tool_use`.
//!
//! This is a verdict about whether the tool ran, not whether it did what
//! the user wanted. Rules in priority order: an explicit `success` field
//! wins; explicit error indicators mean failure; otherwise a handful of
//! textual fields are probed for known failure substrings; anything else
//! counts as success.

use serde_json::Value;

const FAILURE_SUBSTRINGS: [&str; 5] = [
    "failed to",
    "error occurred",
    "exception raised",
    "timed out",
    "execution failed",
];

const PROBED_FIELDS: [&str; 3] = ["status", "message", "result"];

pub fn tool_succeeded(tool_response: Option<&Value>) -> bool {
    let Some(response) = tool_response else {
        // No response at all: nothing indicates failure.
        return true;
    };

    // (a) explicit success field wins outright
    if let Some(success) = response.get("success").and_then(Value::as_bool) {
        return success;
    }

    // (b) explicit error indicators
    if response
        .get("is_error")
        .is_some_and(|v| v.as_bool() == Some(true) || v.as_i64().is_some_and(|n| n != 0))
    {
        return false;
    }
    if response
        .get("error")
        .and_then(Value::as_str)
        .is_some_and(|e| !e.trim().is_empty())
    {
        return false;
    }

    // (c) failure substrings in the probed fields
    for field in PROBED_FIELDS {
        if let Some(text) = response.get(field).and_then(Value::as_str) {
            let lowered = text.to_lowercase();
            if FAILURE_SUBSTRINGS.iter().any(|s| lowered.contains(s)) {
                return false;
            }
        }
    }

    // (d) otherwise success
    true
}
