//! Error types for brainworm-core operations.
//!
//! Variants group into five categories with distinct propagation rules:
//! infrastructure and contention are fatal (non-zero exit, loud stderr),
//! validation and policy become structured hook responses with exit 0, and
//! integrity errors are logged and repaired only where safe.

use std::path::PathBuf;

/// All errors that can occur in brainworm-core operations.
#[derive(Debug, thiserror::Error)]
pub enum BrainwormError {
    // ─────────────────────────────────────────────────────────────────────
    // Infrastructure
    // ─────────────────────────────────────────────────────────────────────
    #[error("Project root not found from {0} (no .brainworm or .git ancestor)")]
    ProjectRootNotFound(PathBuf),

    #[error("Event database unavailable: {path}: {details}")]
    EventStoreUnavailable { path: PathBuf, details: String },

    #[error("State file unreadable: {path}: {source}")]
    StateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Git command failed: {command}: {details}")]
    GitFailed { command: String, details: String },

    #[error("Not a git repository: {0} (run `git init` or move into one)")]
    NotAGitRepository(PathBuf),

    // ─────────────────────────────────────────────────────────────────────
    // Contention
    // ─────────────────────────────────────────────────────────────────────
    #[error(
        "Timed out after {waited_secs}s waiting for lock on {path}. \
         Is another brainworm operation running? If not, remove the stale \
         lock file and retry."
    )]
    LockTimeout { path: PathBuf, waited_secs: u64 },

    // ─────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid task name: {name}: {reason}")]
    InvalidTaskName { name: String, reason: String },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already exists: {0}")]
    TaskAlreadyExists(String),

    #[error("{0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────────────
    // Precondition
    // ─────────────────────────────────────────────────────────────────────
    #[error("Working tree has uncommitted changes; commit or stash before switching tasks")]
    UncommittedChanges,

    // ─────────────────────────────────────────────────────────────────────
    // Integrity
    // ─────────────────────────────────────────────────────────────────────
    #[error(
        "State file corrupted: {path}: {details}. Refusing to overwrite; \
         inspect and repair it by hand."
    )]
    StateCorrupted { path: PathBuf, details: String },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Config file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },
}

impl BrainwormError {
    /// True for errors the dispatcher must treat as fatal (bordered stderr,
    /// non-zero exit) rather than fold into a structured response.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BrainwormError::ProjectRootNotFound(_)
                | BrainwormError::EventStoreUnavailable { .. }
                | BrainwormError::StateUnreadable { .. }
                | BrainwormError::Io { .. }
                | BrainwormError::LockTimeout { .. }
                | BrainwormError::StateCorrupted { .. }
                | BrainwormError::ConfigMalformed { .. }
        )
    }

    /// Process exit code for the CLI binaries.
    pub fn exit_code(&self) -> i32 {
        match self {
            BrainwormError::InvalidTaskName { .. } | BrainwormError::InvalidArgument(_) => 2,
            BrainwormError::TaskNotFound(_) => 3,
            BrainwormError::UncommittedChanges => 4,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BrainwormError>;

impl From<BrainwormError> for String {
    fn from(err: BrainwormError) -> String {
        err.to_string()
    }
}

pub(crate) fn io_ctx(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> BrainwormError {
    let context = context.into();
    move |source| BrainwormError::Io { context, source }
}

pub(crate) fn json_ctx(
    context: impl Into<String>,
) -> impl FnOnce(serde_json::Error) -> BrainwormError {
    let context = context.into();
    move |source| BrainwormError::Json { context, source }
}
