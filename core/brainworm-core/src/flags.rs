//! Coordination flags between sibling hook processes.
//!
//! A flag is an empty file in `state/flags/`. Creation uses `create_new`
//! (O_CREAT|O_EXCL) so exactly one creator wins; the consumer deletes it.
//! Flags are unlocked by design: presence is the whole signal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fs_err as fs;

use crate::error::{io_ctx, Result};

/// Flag names recognized by the runtime.
pub const TRIGGER_PHRASE_DETECTED: &str = "trigger_phrase_detected";
pub const IN_SUBAGENT_CONTEXT: &str = "in_subagent_context";

/// Flags older than this are leftovers from a dead session and get swept
/// at session start.
pub const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Flags {
    dir: PathBuf,
}

impl Flags {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Check-and-create. Returns true if this process created the flag,
    /// false if it already existed.
    pub fn create(&self, name: &str) -> Result<bool> {
        fs::create_dir_all(&self.dir)
            .map_err(io_ctx(format!("creating flags dir {}", self.dir.display())))?;

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(name))
        {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(io_ctx(format!("creating flag {name}"))(err)),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Delete-on-consume. Returns true if the flag was present.
    pub fn consume(&self, name: &str) -> bool {
        fs::remove_file(self.path(name)).is_ok()
    }

    /// Removes flags older than [`STALE_AFTER`]. Returns how many were swept.
    pub fn sweep_stale(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut swept = 0;
        for entry in entries.flatten() {
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());
            if age.is_some_and(|age| age > STALE_AFTER) && fs::remove_file(entry.path()).is_ok() {
                swept += 1;
            }
        }
        swept
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_wins_once() {
        let temp = tempdir().unwrap();
        let flags = Flags::new(temp.path().join("flags"));

        assert!(flags.create(TRIGGER_PHRASE_DETECTED).unwrap());
        assert!(!flags.create(TRIGGER_PHRASE_DETECTED).unwrap());
        assert!(flags.exists(TRIGGER_PHRASE_DETECTED));
    }

    #[test]
    fn consume_deletes_and_reports_presence() {
        let temp = tempdir().unwrap();
        let flags = Flags::new(temp.path().join("flags"));

        flags.create(IN_SUBAGENT_CONTEXT).unwrap();
        assert!(flags.consume(IN_SUBAGENT_CONTEXT));
        assert!(!flags.exists(IN_SUBAGENT_CONTEXT));
        assert!(!flags.consume(IN_SUBAGENT_CONTEXT));
    }

    #[test]
    fn sweep_ignores_fresh_flags() {
        let temp = tempdir().unwrap();
        let flags = Flags::new(temp.path().join("flags"));
        flags.create(TRIGGER_PHRASE_DETECTED).unwrap();

        assert_eq!(flags.sweep_stale(), 0);
        assert!(flags.exists(TRIGGER_PHRASE_DETECTED));
    }

    #[test]
    fn missing_dir_is_not_an_error() {
        let temp = tempdir().unwrap();
        let flags = Flags::new(temp.path().join("nope"));
        assert!(!flags.exists("anything"));
        assert_eq!(flags.sweep_stale(), 0);
    }
}
