//! The pre→post timing checkpoint.
//!
//! `pre_tool_use` and `post_tool_use` run as separate processes, so duration
//! is carried through a per-session file: pre writes it, post reads and
//! deletes it. The filename hashes the session id (as lock names hash
//! project paths) so hostile session strings cannot escape the state dir.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_ctx, Result};
use crate::events::store::next_timestamp_ns;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingCheckpoint {
    /// Nanoseconds since epoch when the pre hook observed the tool start.
    pub start_time_ns: u64,
    pub tool_name: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl TimingCheckpoint {
    pub fn now(tool_name: &str, correlation_id: Option<&str>) -> Self {
        Self {
            start_time_ns: next_timestamp_ns(),
            tool_name: tool_name.to_string(),
            correlation_id: correlation_id.map(str::to_string),
        }
    }

    /// Elapsed milliseconds from this checkpoint until now. Clamped at zero
    /// against clock weirdness.
    pub fn elapsed_ms(&self) -> i64 {
        let now = next_timestamp_ns();
        (now.saturating_sub(self.start_time_ns) / 1_000_000) as i64
    }
}

pub fn checkpoint_path(state_dir: &Path, session_id: &str) -> PathBuf {
    let hash = format!("{:x}", md5::compute(session_id));
    state_dir.join(format!(".timing-{hash}.json"))
}

/// Writes (or overwrites — a stale checkpoint from a skipped post is
/// expected) the checkpoint for this session.
pub fn write(state_dir: &Path, session_id: &str, checkpoint: &TimingCheckpoint) -> Result<()> {
    fs_err::create_dir_all(state_dir)
        .map_err(io_ctx(format!("creating state dir {}", state_dir.display())))?;
    let path = checkpoint_path(state_dir, session_id);
    let content = serde_json::to_string(checkpoint)
        .map_err(crate::error::json_ctx("serializing timing checkpoint"))?;
    fs_err::write(&path, content)
        .map_err(io_ctx(format!("writing timing checkpoint {}", path.display())))?;
    Ok(())
}

/// Reads and deletes the checkpoint. Returns `None` when absent.
///
/// An unparsable checkpoint is dropped and reported as absent: the timing
/// file is derived data, safe to discard and recreate.
pub fn consume(state_dir: &Path, session_id: &str) -> Option<TimingCheckpoint> {
    let path = checkpoint_path(state_dir, session_id);
    let content = fs_err::read_to_string(&path).ok()?;
    let _ = fs_err::remove_file(&path);

    match serde_json::from_str(&content) {
        Ok(checkpoint) => Some(checkpoint),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Dropping invalid timing checkpoint"
            );
            None
        }
    }
}

/// Removes checkpoints older than 24 hours. Returns how many were swept.
pub fn sweep_stale(state_dir: &Path) -> usize {
    const STALE_SECS: u64 = 24 * 60 * 60;

    let entries = match fs_err::read_dir(state_dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut swept = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(".timing-") || !name.ends_with(".json") {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok());
        if age.is_some_and(|age| age.as_secs() > STALE_SECS)
            && fs_err::remove_file(entry.path()).is_ok()
        {
            swept += 1;
        }
    }
    swept
}
