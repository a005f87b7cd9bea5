//! Configuration document: `<project>/.brainworm/config.toml`.
//!
//! Every field has a default so a missing or partial file always yields a
//! usable configuration. Saves are atomic (temp file + rename) and unknown
//! keys survive a load/save round trip.

use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{io_ctx, BrainwormError, Result};

pub const DEFAULT_TRIGGER_PHRASES: [&str; 6] = [
    "make it so",
    "go ahead",
    "ship it",
    "let's do it",
    "execute",
    "implement it",
];

pub const DEFAULT_BLOCKED_TOOLS: [&str; 4] = ["Edit", "Write", "MultiEdit", "NotebookEdit"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daic: DaicConfig,

    #[serde(default)]
    pub debug: DebugConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubConfig>,

    /// Keys we don't recognize are kept verbatim so hand edits survive a
    /// programmatic save.
    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaicConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_mode")]
    pub default_mode: String,

    #[serde(default = "default_blocked_tools")]
    pub blocked_tools: Vec<String>,

    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,

    #[serde(default)]
    pub read_only_bash_commands: Allowlist,

    #[serde(default)]
    pub branch_enforcement: BranchEnforcement,
}

impl Default for DaicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_mode: default_mode(),
            blocked_tools: default_blocked_tools(),
            trigger_phrases: default_trigger_phrases(),
            read_only_bash_commands: Allowlist::default(),
            branch_enforcement: BranchEnforcement::default(),
        }
    }
}

/// Grouped allowlist of read-only command prefixes. Entries are either a
/// single word (`ls`) or a two-word prefix (`git status`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allowlist {
    #[serde(default = "defaults::basic")]
    pub basic: Vec<String>,
    #[serde(default = "defaults::git")]
    pub git: Vec<String>,
    #[serde(default = "defaults::docker")]
    pub docker: Vec<String>,
    #[serde(default = "defaults::package_managers")]
    pub package_managers: Vec<String>,
    #[serde(default = "defaults::network")]
    pub network: Vec<String>,
    #[serde(default = "defaults::text_processing")]
    pub text_processing: Vec<String>,
    #[serde(default = "defaults::testing")]
    pub testing: Vec<String>,
    #[serde(default)]
    pub custom: Vec<String>,
}

impl Default for Allowlist {
    fn default() -> Self {
        Self {
            basic: defaults::basic(),
            git: defaults::git(),
            docker: defaults::docker(),
            package_managers: defaults::package_managers(),
            network: defaults::network(),
            text_processing: defaults::text_processing(),
            testing: defaults::testing(),
            custom: Vec::new(),
        }
    }
}

impl Allowlist {
    /// Iterates every entry across all sections.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.basic
            .iter()
            .chain(&self.git)
            .chain(&self.docker)
            .chain(&self.package_managers)
            .chain(&self.network)
            .chain(&self.text_processing)
            .chain(&self.testing)
            .chain(&self.custom)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchEnforcement {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Task-name prefixes that carry their own branch prefix.
    #[serde(default = "defaults::task_prefixes")]
    pub task_prefixes: Vec<String>,

    /// task prefix → branch prefix. Anything unmapped falls back to
    /// `feature/`.
    #[serde(default = "defaults::prefix_mapping")]
    pub mapping: toml::Table,
}

impl Default for BranchEnforcement {
    fn default() -> Self {
        Self {
            enabled: true,
            task_prefixes: defaults::task_prefixes(),
            mapping: defaults::prefix_mapping(),
        }
    }
}

impl BranchEnforcement {
    /// Derives the branch name for a task: `fix-login-bug` → `fix/login-bug`
    /// when `fix` is mapped, otherwise `feature/<name>`.
    pub fn branch_for_task(&self, task_name: &str) -> String {
        if let Some((prefix, rest)) = task_name.split_once('-') {
            if self.task_prefixes.iter().any(|p| p == prefix) {
                let branch_prefix = self
                    .mapping
                    .get(prefix)
                    .and_then(|v| v.as_str())
                    .unwrap_or("feature");
                return format!("{branch_prefix}/{rest}");
            }
        }
        format!("feature/{task_name}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub outputs: DebugOutputs,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_level(),
            outputs: DebugOutputs::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugOutputs {
    #[serde(default = "default_true")]
    pub file: bool,
    #[serde(default)]
    pub stderr: bool,
}

impl Default for DebugOutputs {
    fn default() -> Self {
        Self {
            file: true,
            stderr: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GithubConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub link_issues: bool,
}

fn default_true() -> bool {
    true
}

fn default_mode() -> String {
    "discussion".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_blocked_tools() -> Vec<String> {
    DEFAULT_BLOCKED_TOOLS.iter().map(|s| s.to_string()).collect()
}

fn default_trigger_phrases() -> Vec<String> {
    DEFAULT_TRIGGER_PHRASES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

mod defaults {
    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn basic() -> Vec<String> {
        strings(&[
            "ls", "pwd", "cd", "echo", "cat", "head", "tail", "wc", "which", "env", "date",
            "file", "stat", "du", "df", "tree",
        ])
    }

    pub fn git() -> Vec<String> {
        strings(&[
            "git status",
            "git log",
            "git diff",
            "git show",
            "git branch",
            "git remote",
            "git rev-parse",
            "git blame",
            "git stash",
        ])
    }

    pub fn docker() -> Vec<String> {
        strings(&["docker ps", "docker images", "docker logs", "docker inspect"])
    }

    pub fn package_managers() -> Vec<String> {
        strings(&[
            "npm list",
            "npm outdated",
            "pip list",
            "pip show",
            "cargo tree",
            "cargo metadata",
        ])
    }

    pub fn network() -> Vec<String> {
        strings(&["ping", "dig", "nslookup", "host"])
    }

    pub fn text_processing() -> Vec<String> {
        strings(&["grep", "rg", "find", "sed", "awk", "sort", "uniq", "cut", "diff", "jq"])
    }

    pub fn testing() -> Vec<String> {
        strings(&["pytest --collect-only", "cargo check", "tox -l"])
    }

    pub fn task_prefixes() -> Vec<String> {
        strings(&["fix", "feature", "refactor", "implement", "migrate", "test", "docs"])
    }

    pub fn prefix_mapping() -> toml::Table {
        let mut table = toml::Table::new();
        for (task, branch) in [
            ("fix", "fix"),
            ("feature", "feature"),
            ("refactor", "refactor"),
            ("implement", "feature"),
            ("migrate", "migrate"),
            ("test", "test"),
            ("docs", "docs"),
        ] {
            table.insert(task.to_string(), toml::Value::String(branch.to_string()));
        }
        table
    }
}

impl Config {
    /// Loads the configuration, returning full defaults when the file does
    /// not exist. A file that exists but fails to parse is malformed, not
    /// missing: that surfaces as an error instead of silently reverting to
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| BrainwormError::StateUnreadable {
            path: path.to_path_buf(),
            source: source.into(),
        })?;

        toml::from_str(&content).map_err(|err| BrainwormError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
    }

    /// Atomically writes the configuration.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|err| BrainwormError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;

        let parent = path
            .parent()
            .ok_or_else(|| BrainwormError::InvalidArgument("config path has no parent".into()))?;
        fs::create_dir_all(parent)
            .map_err(io_ctx(format!("creating config dir {}", parent.display())))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(io_ctx("creating temp file for config".to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(io_ctx("writing temp config".to_string()))?;
        temp.flush()
            .map_err(io_ctx("flushing temp config".to_string()))?;
        temp.persist(path).map_err(|err| BrainwormError::Io {
            context: format!("persisting config to {}", path.display()),
            source: err.error,
        })?;

        Ok(())
    }
}
