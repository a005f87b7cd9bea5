//! Correlation mapping: which correlation id tags each session's events.
//!
//! The mapping lives in `state/.correlation_state` as a JSON object keyed by
//! session id. This manager is the only writer; mutations run under the
//! exclusive lock on `.{file}.lock` and rewrite the document atomically so
//! a multi-entry clear is all-or-nothing.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{io_ctx, BrainwormError, Result};
use crate::lock::FileLock;

pub struct CorrelationManager {
    path: PathBuf,
}

impl CorrelationManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert-or-overwrite: a session maps to at most one correlation id.
    pub fn store(&self, session_id: &str, correlation_id: &str) -> Result<()> {
        let _lock = FileLock::acquire_default(&self.path)?;
        let mut map = self.read_map()?;
        map.insert(session_id.to_string(), correlation_id.to_string());
        self.write_map(&map)
    }

    /// Lock-free read of a single entry.
    pub fn lookup(&self, session_id: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.get(session_id).cloned())
    }

    /// Removes every entry carrying the given correlation id (a task may
    /// span several sessions). Atomic across the whole rewrite.
    pub fn clear_for_correlation(&self, correlation_id: &str) -> Result<usize> {
        let _lock = FileLock::acquire_default(&self.path)?;
        let mut map = self.read_map()?;
        let before = map.len();
        map.retain(|_, v| v != correlation_id);
        let removed = before - map.len();
        if removed > 0 {
            self.write_map(&map)?;
        }
        Ok(removed)
    }

    /// All session ids currently mapped, for diagnostics.
    pub fn sessions(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.keys().cloned().collect())
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|source| BrainwormError::StateUnreadable {
                path: self.path.clone(),
                source,
            })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|err| BrainwormError::StateCorrupted {
            path: self.path.clone(),
            details: err.to_string(),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(map)
            .map_err(crate::error::json_ctx("serializing correlation state"))?;

        let parent = self.path.parent().ok_or_else(|| {
            BrainwormError::InvalidArgument("correlation path has no parent".to_string())
        })?;
        fs::create_dir_all(parent)
            .map_err(io_ctx(format!("creating state dir {}", parent.display())))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(io_ctx("creating temp file for correlation state".to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(io_ctx("writing temp correlation state".to_string()))?;
        temp.flush()
            .map_err(io_ctx("flushing temp correlation state".to_string()))?;
        temp.persist(&self.path).map_err(|err| BrainwormError::Io {
            context: format!("persisting correlation state to {}", self.path.display()),
            source: err.error,
        })?;

        Ok(())
    }
}

/// Mints a new correlation identifier for a task.
pub fn new_correlation_id(task_name: &str) -> String {
    format!("{}-{}", task_name, ulid::Ulid::new().to_string().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager_in(dir: &Path) -> CorrelationManager {
        CorrelationManager::new(dir.join(".correlation_state"))
    }

    #[test]
    fn lookup_on_missing_file_is_none() {
        let temp = tempdir().unwrap();
        let manager = manager_in(temp.path());
        assert!(manager.lookup("s1").unwrap().is_none());
    }

    #[test]
    fn store_then_lookup() {
        let temp = tempdir().unwrap();
        let manager = manager_in(temp.path());

        manager.store("s1", "fix-login-01abc").unwrap();
        assert_eq!(
            manager.lookup("s1").unwrap().as_deref(),
            Some("fix-login-01abc")
        );
    }

    #[test]
    fn store_overwrites_previous_mapping() {
        let temp = tempdir().unwrap();
        let manager = manager_in(temp.path());

        manager.store("s1", "old-corr").unwrap();
        manager.store("s1", "new-corr").unwrap();
        assert_eq!(manager.lookup("s1").unwrap().as_deref(), Some("new-corr"));
    }

    #[test]
    fn clear_removes_all_entries_for_correlation() {
        let temp = tempdir().unwrap();
        let manager = manager_in(temp.path());

        manager.store("s1", "task-a").unwrap();
        manager.store("s2", "task-a").unwrap();
        manager.store("s3", "task-b").unwrap();

        assert_eq!(manager.clear_for_correlation("task-a").unwrap(), 2);
        assert!(manager.lookup("s1").unwrap().is_none());
        assert!(manager.lookup("s2").unwrap().is_none());
        assert_eq!(manager.lookup("s3").unwrap().as_deref(), Some("task-b"));
    }

    #[test]
    fn clear_for_unknown_correlation_is_a_noop() {
        let temp = tempdir().unwrap();
        let manager = manager_in(temp.path());
        manager.store("s1", "task-a").unwrap();
        assert_eq!(manager.clear_for_correlation("task-z").unwrap(), 0);
    }

    #[test]
    fn corrupt_map_is_an_integrity_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(".correlation_state");
        fs::write(&path, "][").unwrap();

        let manager = CorrelationManager::new(path);
        assert!(matches!(
            manager.lookup("s1"),
            Err(BrainwormError::StateCorrupted { .. })
        ));
    }

    #[test]
    fn new_ids_embed_task_and_differ() {
        let a = new_correlation_id("fix-login");
        let b = new_correlation_id("fix-login");
        assert!(a.starts_with("fix-login-"));
        assert_ne!(a, b);
    }
}
