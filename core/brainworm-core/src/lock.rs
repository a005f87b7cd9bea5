//! Advisory cross-process locks around named files.
//!
//! A lock on `state/foo.json` is the file `state/.foo.json.lock` containing
//! the owner's PID. Creation uses `create_new` so exactly one process wins;
//! losers poll until the default 10-second timeout. A lock whose recorded
//! PID is no longer alive is stale and gets reclaimed.
//!
//! The guard releases on drop. A process killed mid-critical-section leaves
//! its lock behind, but the next contender reclaims it via the PID check,
//! and rename-based state writes mean there is no torn document to protect.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs_err as fs;

use crate::error::{BrainwormError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// User-facing CLI operations wait longer before giving up.
pub const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    lock_path: PathBuf,
}

/// Computes the side-car lock path: `.{filename}.lock` next to the target.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}.lock"))
}

impl FileLock {
    /// Acquires an exclusive lock guarding `target`, waiting up to `timeout`.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = lock_path_for(target);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(crate::error::io_ctx(format!(
                "creating lock directory for {}",
                lock_path.display()
            )))?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match try_create(&lock_path) {
                Ok(()) => return Ok(Self { lock_path }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if holder_is_dead(&lock_path) {
                        // Stale lock: remove and contend again. Another
                        // process may beat us to the re-create; that is fine.
                        let _ = fs::remove_file(&lock_path);
                        continue;
                    }
                }
                Err(err) => {
                    return Err(BrainwormError::Io {
                        context: format!("creating lock file {}", lock_path.display()),
                        source: err,
                    })
                }
            }

            if Instant::now() >= deadline {
                return Err(BrainwormError::LockTimeout {
                    path: lock_path,
                    waited_secs: timeout.as_secs(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Acquire with the standard 10-second timeout.
    pub fn acquire_default(target: &Path) -> Result<Self> {
        Self::acquire(target, DEFAULT_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn try_create(lock_path: &Path) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)?;
    write!(file, "{}", std::process::id())?;
    Ok(())
}

/// True when the lock file records a PID that no longer exists.
///
/// An unreadable or unparsable lock file is treated as stale: it carries no
/// liveness evidence and blocking on it forever helps nobody.
fn holder_is_dead(lock_path: &Path) -> bool {
    let pid = match fs::read_to_string(lock_path) {
        Ok(content) => match content.trim().parse::<u32>() {
            Ok(pid) => pid,
            Err(_) => return true,
        },
        Err(_) => return true,
    };

    !is_pid_alive(pid)
}

pub(crate) fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: kill with signal 0 performs only an existence check.
        #[allow(unsafe_code)]
        unsafe {
            libc::kill(pid as i32, 0) == 0
        }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}
