//! Locked read-modify-write access to the unified state document.
//!
//! Mutations acquire the exclusive advisory lock, re-read the document,
//! apply the change, and atomically replace the file (temp + rename), so a
//! concurrent reader sees either the pre- or post-image and never a torn
//! write. Reads take no lock.
//!
//! A document that exists but does not parse is an integrity error. We
//! refuse to overwrite it: workflow state encodes decisions the user made,
//! and regenerating it silently would erase them.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brainworm_protocol::ToolDecision;
use fs_err as fs;
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::daic::engine::{self, GateContext};
use crate::error::{io_ctx, BrainwormError, Result};
use crate::lock::{self, FileLock};

use super::types::{DaicMode, UnifiedState};

pub struct StateStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock_timeout: lock::DEFAULT_TIMEOUT,
        }
    }

    /// User-facing operations tolerate a longer wait before declaring
    /// contention.
    pub fn with_lock_timeout(path: PathBuf, lock_timeout: Duration) -> Self {
        Self { path, lock_timeout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a snapshot of the current state. No lock held after return;
    /// a missing file yields the default document.
    pub fn get_state(&self) -> Result<UnifiedState> {
        self.read_document()
    }

    /// Creates the document if it does not exist yet, seeded with the
    /// configured starting mode. Idempotent; returns true when this call
    /// created it.
    pub fn initialize(&self, initial_mode: DaicMode) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let _lock = FileLock::acquire(&self.path, self.lock_timeout)?;
        if self.path.exists() {
            return Ok(false);
        }
        self.write_document(&UnifiedState {
            daic_mode: initial_mode,
            ..UnifiedState::default()
        })?;
        Ok(true)
    }

    /// Sets the DAIC mode, recording audit fields. No-op write still updates
    /// the timestamp so repeated CLI calls leave a trace.
    pub fn set_daic_mode(&self, mode: DaicMode) -> Result<UnifiedState> {
        self.mutate(|state| {
            state.previous_daic_mode = Some(state.daic_mode);
            state.daic_mode = mode;
            state.daic_timestamp = Some(chrono::Utc::now());
            Ok(())
        })
    }

    /// Atomic read-flip-write. Returns the new mode.
    pub fn toggle_daic_mode(&self) -> Result<DaicMode> {
        let state = self.mutate(|state| {
            state.previous_daic_mode = Some(state.daic_mode);
            state.daic_mode = state.daic_mode.flipped();
            state.daic_timestamp = Some(chrono::Utc::now());
            Ok(())
        })?;
        Ok(state.daic_mode)
    }

    /// Writes the task triple together. An empty task with a non-empty
    /// branch violates the task↔branch invariant and is rejected.
    pub fn set_task_state(
        &self,
        task: Option<&str>,
        branch: Option<&str>,
        services: &[String],
    ) -> Result<UnifiedState> {
        if task.is_none() && branch.is_some() {
            return Err(BrainwormError::InvalidArgument(
                "cannot set a branch without a task".to_string(),
            ));
        }
        if task.is_some() && branch.is_none() {
            return Err(BrainwormError::InvalidArgument(
                "a task requires a branch".to_string(),
            ));
        }

        self.mutate(|state| {
            state.current_task = task.map(str::to_string);
            state.current_branch = branch.map(str::to_string);
            state.task_services = services.to_vec();
            Ok(())
        })
    }

    /// Writes the identity pair together; they must change as a unit.
    pub fn update_session_correlation(
        &self,
        session_id: Option<&str>,
        correlation_id: Option<&str>,
    ) -> Result<UnifiedState> {
        self.mutate(|state| {
            state.session_id = session_id.map(str::to_string);
            state.correlation_id = correlation_id.map(str::to_string);
            Ok(())
        })
    }

    /// Drops the task triple and the correlation id in one write.
    pub fn clear_task_state(&self) -> Result<UnifiedState> {
        self.mutate(|state| {
            state.current_task = None;
            state.current_branch = None;
            state.task_services.clear();
            state.correlation_id = None;
            Ok(())
        })
    }

    /// Pure gating derivation from the current snapshot. Bash commands are
    /// delegated to the classifier; no lock is taken and nothing is written.
    pub fn should_block_tool(
        &self,
        config: &Config,
        in_subagent_context: bool,
        tool_name: &str,
        tool_input: Option<&serde_json::Value>,
    ) -> Result<ToolDecision> {
        let state = self.get_state()?;
        Ok(engine::gate_tool(
            &GateContext {
                mode: state.daic_mode,
                in_subagent_context,
                config,
            },
            tool_name,
            tool_input,
        ))
    }

    /// General locked mutation. Exposed for the task manager, which needs to
    /// update task and mode fields in a single atomic write.
    pub fn mutate(
        &self,
        apply: impl FnOnce(&mut UnifiedState) -> Result<()>,
    ) -> Result<UnifiedState> {
        let _lock = FileLock::acquire(&self.path, self.lock_timeout)?;
        let mut state = self.read_document()?;
        apply(&mut state)?;
        self.write_document(&state)?;
        Ok(state)
    }

    fn read_document(&self) -> Result<UnifiedState> {
        if !self.path.exists() {
            return Ok(UnifiedState::default());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|source| BrainwormError::StateUnreadable {
                path: self.path.clone(),
                source,
            })?;

        if content.trim().is_empty() {
            return Ok(UnifiedState::default());
        }

        serde_json::from_str(&content).map_err(|err| BrainwormError::StateCorrupted {
            path: self.path.clone(),
            details: err.to_string(),
        })
    }

    fn write_document(&self, state: &UnifiedState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)
            .map_err(crate::error::json_ctx("serializing unified state"))?;

        let parent = self.path.parent().ok_or_else(|| {
            BrainwormError::InvalidArgument("state path has no parent directory".to_string())
        })?;
        fs::create_dir_all(parent)
            .map_err(io_ctx(format!("creating state dir {}", parent.display())))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(io_ctx("creating temp file for unified state".to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(io_ctx("writing temp unified state".to_string()))?;
        temp.flush()
            .map_err(io_ctx("flushing temp unified state".to_string()))?;
        temp.persist(&self.path).map_err(|err| BrainwormError::Io {
            context: format!("persisting unified state to {}", self.path.display()),
            source: err.error,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> StateStore {
        StateStore::new(dir.join("unified_session_state.json"))
    }

    #[test]
    fn missing_file_reads_as_default() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let state = store.get_state().unwrap();
        assert_eq!(state.daic_mode, DaicMode::Discussion);
    }

    #[test]
    fn initialize_is_idempotent() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        assert!(store.initialize(DaicMode::Discussion).unwrap());
        assert!(!store.initialize(DaicMode::Discussion).unwrap());
    }

    #[test]
    fn initialize_seeds_the_configured_mode() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        store.initialize(DaicMode::Implementation).unwrap();
        assert_eq!(
            store.get_state().unwrap().daic_mode,
            DaicMode::Implementation
        );
        // An existing document is never reseeded.
        store.initialize(DaicMode::Discussion).unwrap();
        assert_eq!(
            store.get_state().unwrap().daic_mode,
            DaicMode::Implementation
        );
    }

    #[test]
    fn set_mode_records_audit_fields() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let state = store.set_daic_mode(DaicMode::Implementation).unwrap();
        assert_eq!(state.daic_mode, DaicMode::Implementation);
        assert_eq!(state.previous_daic_mode, Some(DaicMode::Discussion));
        assert!(state.daic_timestamp.is_some());
    }

    #[test]
    fn toggle_flips_and_returns_new_mode() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        assert_eq!(store.toggle_daic_mode().unwrap(), DaicMode::Implementation);
        assert_eq!(store.toggle_daic_mode().unwrap(), DaicMode::Discussion);
    }

    #[test]
    fn task_without_branch_is_rejected() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        assert!(store.set_task_state(Some("fix-x"), None, &[]).is_err());
        assert!(store.set_task_state(None, Some("fix/x"), &[]).is_err());
    }

    #[test]
    fn task_state_writes_fields_together() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        let services = vec!["api".to_string(), "worker".to_string()];
        let state = store
            .set_task_state(Some("fix-login"), Some("fix/login"), &services)
            .unwrap();
        assert_eq!(state.current_task.as_deref(), Some("fix-login"));
        assert_eq!(state.current_branch.as_deref(), Some("fix/login"));
        assert_eq!(state.task_services, services);
    }

    #[test]
    fn clear_drops_task_and_correlation() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());

        store
            .set_task_state(Some("fix-login"), Some("fix/login"), &[])
            .unwrap();
        store
            .update_session_correlation(Some("s1"), Some("c1"))
            .unwrap();

        let state = store.clear_task_state().unwrap();
        assert!(state.current_task.is_none());
        assert!(state.current_branch.is_none());
        assert!(state.correlation_id.is_none());
        // Session identity survives a task clear.
        assert_eq!(state.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn should_block_tool_follows_the_mode() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let config = Config::default();

        let decision = store
            .should_block_tool(&config, false, "Edit", None)
            .unwrap();
        assert!(decision.is_deny());

        store.set_daic_mode(DaicMode::Implementation).unwrap();
        let decision = store
            .should_block_tool(&config, false, "Edit", None)
            .unwrap();
        assert!(!decision.is_deny());
    }

    #[test]
    fn should_block_tool_honors_subagent_context() {
        let temp = tempdir().unwrap();
        let store = store_in(temp.path());
        let config = Config::default();

        let decision = store
            .should_block_tool(&config, true, "Write", None)
            .unwrap();
        assert!(!decision.is_deny());
    }

    #[test]
    fn corrupt_document_is_an_integrity_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("unified_session_state.json");
        fs::write(&path, "{not json").unwrap();

        let store = StateStore::new(path);
        assert!(matches!(
            store.get_state(),
            Err(BrainwormError::StateCorrupted { .. })
        ));
        // Mutations refuse too; the corrupt file is left untouched.
        assert!(store.set_daic_mode(DaicMode::Implementation).is_err());
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "{not json");
    }

    #[test]
    fn concurrent_readers_never_see_torn_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("unified_session_state.json");
        let store = StateStore::new(path.clone());
        store.initialize(DaicMode::Discussion).unwrap();

        // One writer cycles the task pair while readers snapshot freely.
        // Rename-based replacement means every snapshot parses and the two
        // task fields always agree.
        let writer = {
            let path = path.clone();
            std::thread::spawn(move || {
                let store = StateStore::new(path);
                for i in 0..20 {
                    let task = format!("fix-{i}");
                    let branch = format!("fix/{i}");
                    store
                        .set_task_state(Some(&task), Some(&branch), &[])
                        .unwrap();
                }
            })
        };

        let reader = StateStore::new(path);
        for _ in 0..200 {
            let snapshot = reader.get_state().unwrap();
            match (&snapshot.current_task, &snapshot.current_branch) {
                (Some(task), Some(branch)) => {
                    let suffix = task.strip_prefix("fix-").unwrap();
                    assert_eq!(*branch, format!("fix/{suffix}"));
                }
                (None, None) => {}
                other => panic!("torn task state: {other:?}"),
            }
        }

        writer.join().unwrap();
    }
}
