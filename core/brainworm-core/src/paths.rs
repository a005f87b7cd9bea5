//! Project-root location and the `.brainworm/` directory layout.
//!
//! Every hook process starts from an arbitrary `cwd` and must find the
//! project it belongs to. Resolution order:
//!
//! 1. `CLAUDE_PLUGIN_ROOT` environment override (used when the host installs
//!    brainworm as a plugin and knows the root better than we do)
//! 2. Nearest ancestor containing `.brainworm/`
//! 3. Nearest ancestor containing `.git/`
//! 4. The starting directory itself (scaffolding will create `.brainworm/`)

use std::path::{Path, PathBuf};

pub const ENV_PLUGIN_ROOT: &str = "CLAUDE_PLUGIN_ROOT";
pub const ENV_DEBUG: &str = "BRAINWORM_DEBUG";

pub const STATE_FILE: &str = "unified_session_state.json";
pub const CORRELATION_FILE: &str = ".correlation_state";
pub const EVENTS_DB: &str = "hooks.db";
pub const CONFIG_FILE: &str = "config.toml";

/// All paths under `<project>/.brainworm/`, derived once per process.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Locates the project root starting from `cwd`.
    ///
    /// Honors the `CLAUDE_PLUGIN_ROOT` override. Falls back to `cwd` itself
    /// when no `.brainworm` or `.git` ancestor exists, so that a first
    /// `session_start` in a fresh directory can still scaffold.
    pub fn locate(cwd: &Path) -> Self {
        if let Ok(override_root) = std::env::var(ENV_PLUGIN_ROOT) {
            let root = PathBuf::from(override_root);
            if root.is_dir() {
                return Self { root };
            }
            tracing::warn!(
                root = %root.display(),
                "CLAUDE_PLUGIN_ROOT does not exist, falling back to cwd ascent"
            );
        }

        for ancestor in cwd.ancestors() {
            if ancestor.join(".brainworm").is_dir() {
                return Self {
                    root: ancestor.to_path_buf(),
                };
            }
        }
        for ancestor in cwd.ancestors() {
            if ancestor.join(".git").exists() {
                return Self {
                    root: ancestor.to_path_buf(),
                };
            }
        }

        Self {
            root: cwd.to_path_buf(),
        }
    }

    /// Wraps an already-known project root (tests, CLI `--root`).
    pub fn at_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn brainworm_dir(&self) -> PathBuf {
        self.root.join(".brainworm")
    }

    pub fn config_file(&self) -> PathBuf {
        self.brainworm_dir().join(CONFIG_FILE)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.brainworm_dir().join("state")
    }

    pub fn unified_state_file(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    pub fn correlation_file(&self) -> PathBuf {
        self.state_dir().join(CORRELATION_FILE)
    }

    pub fn flags_dir(&self) -> PathBuf {
        self.state_dir().join("flags")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.brainworm_dir().join("events")
    }

    pub fn events_db(&self) -> PathBuf {
        self.events_dir().join(EVENTS_DB)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.brainworm_dir().join("tasks")
    }

    pub fn task_dir(&self, name: &str) -> PathBuf {
        self.tasks_dir().join(name)
    }

    pub fn task_file(&self, name: &str) -> PathBuf {
        self.task_dir(name).join("README.md")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.brainworm_dir().join("logs")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.brainworm_dir().join("memory")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.brainworm_dir().join("bin")
    }

    /// Directory for chunked subagent transcripts.
    pub fn agent_state_dir(&self, agent: &str) -> PathBuf {
        self.state_dir().join(agent)
    }
}
