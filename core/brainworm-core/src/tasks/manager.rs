//! Task lifecycle: creation, switching, clearing, listing.
//!
//! A task is a directory under `.brainworm/tasks/`, a git branch, and a
//! correlation identifier. The manager is the only writer of task state in
//! the unified document; hooks read task files but never mutate them except
//! through [`TaskManager::record_continuity`].

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use fs_err as fs;

use crate::config::Config;
use crate::correlation::{new_correlation_id, CorrelationManager};
use crate::error::{io_ctx, BrainwormError, Result};
use crate::paths::ProjectPaths;
use crate::state::{DaicMode, StateStore, UnifiedState};

use super::frontmatter::{self, TaskFrontmatter};
use super::git;

/// Task names that would shadow CLI subcommands.
const RESERVED_NAMES: [&str; 8] = [
    "create", "switch", "clear", "list", "status", "set", "session", "help",
];

pub const VALID_STATUSES: [&str; 3] = ["pending", "in-progress", "completed"];

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid task name pattern"));

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub services: Vec<String>,
    pub submodule: Option<String>,
    pub no_interactive: bool,
    pub link_issue: Option<u64>,
    pub create_issue: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub name: String,
    pub branch: String,
    pub status: String,
    pub created: String,
    pub correlation_id: String,
}

/// Outcome of `create`/`switch`, for CLI display.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: String,
    pub branch: String,
    pub correlation_id: String,
    pub warnings: Vec<String>,
}

pub struct TaskManager<'a> {
    paths: &'a ProjectPaths,
    config: &'a Config,
    state: &'a StateStore,
    correlation: &'a CorrelationManager,
}

impl<'a> TaskManager<'a> {
    pub fn new(
        paths: &'a ProjectPaths,
        config: &'a Config,
        state: &'a StateStore,
        correlation: &'a CorrelationManager,
    ) -> Self {
        Self {
            paths,
            config,
            state,
            correlation,
        }
    }

    pub fn create(&self, name: &str, options: &CreateOptions) -> Result<TaskOutcome> {
        validate_name(name)?;

        let task_dir = self.paths.task_dir(name);
        if task_dir.exists() {
            return Err(BrainwormError::TaskAlreadyExists(name.to_string()));
        }

        let work_dir = match &options.submodule {
            Some(submodule) => self.paths.root().join(submodule),
            None => self.paths.root().to_path_buf(),
        };
        if !git::is_repository(&work_dir) {
            return Err(BrainwormError::NotAGitRepository(work_dir));
        }

        let current = git::current_branch(&work_dir)?;
        let enforcement = &self.config.daic.branch_enforcement;
        // On a protected branch a task branch is carved out; on an existing
        // feature branch the task rides along. Deterministic either way, so
        // non-interactive contexts behave identically.
        let branch = if enforcement.enabled && git::is_protected(&current) {
            enforcement.branch_for_task(name)
        } else {
            current.clone()
        };

        let mut warnings = Vec::new();
        if branch != current {
            if git::branch_exists(&work_dir, &branch) {
                warnings.push(format!("branch {branch} already exists, reusing it"));
            }
            git::checkout_or_create(&work_dir, &branch)?;
        }

        // Issue references only land in the task file when the integration
        // opted in to linking; the request is surfaced, never dropped
        // silently.
        let linked_issue = options.link_issue.filter(|_| self.github_links_enabled());
        if options.link_issue.is_some() && linked_issue.is_none() {
            warnings.push(
                "github issue linking is disabled ([github] link_issues); \
                 --link-issue ignored"
                    .to_string(),
            );
        }

        let correlation_id = new_correlation_id(name);
        self.write_task_file(name, &branch, &correlation_id, linked_issue, options)?;

        // Task triple, DAIC reset, and correlation land in one atomic write.
        let state = self.state.mutate(|state| {
            state.current_task = Some(name.to_string());
            state.current_branch = Some(branch.clone());
            state.task_services = options.services.clone();
            state.previous_daic_mode = Some(state.daic_mode);
            state.daic_mode = DaicMode::Discussion;
            state.daic_timestamp = Some(chrono::Utc::now());
            state.correlation_id = Some(correlation_id.clone());
            Ok(())
        })?;

        if let Some(session_id) = &state.session_id {
            self.correlation.store(session_id, &correlation_id)?;
        }

        if options.create_issue && !self.github_enabled() {
            warnings.push("github integration is disabled; no issue created".to_string());
        }

        Ok(TaskOutcome {
            task: name.to_string(),
            branch,
            correlation_id,
            warnings,
        })
    }

    pub fn switch(&self, name: &str) -> Result<TaskOutcome> {
        let task_file = self.paths.task_file(name);
        if !task_file.exists() {
            return Err(BrainwormError::TaskNotFound(name.to_string()));
        }

        let content = fs::read_to_string(&task_file)
            .map_err(io_ctx(format!("reading task file {}", task_file.display())))?;
        let (front, body) = frontmatter::parse(&content)?;

        let work_dir = self.paths.root();
        if !git::is_repository(work_dir) {
            return Err(BrainwormError::NotAGitRepository(work_dir.to_path_buf()));
        }
        if git::has_uncommitted_changes(work_dir)? {
            return Err(BrainwormError::UncommittedChanges);
        }
        git::checkout_or_create(work_dir, &front.branch)?;

        let state = self.state.mutate(|state| {
            state.current_task = Some(name.to_string());
            state.current_branch = Some(front.branch.clone());
            state.task_services = front.modules.clone();
            state.correlation_id = Some(front.correlation_id.clone());
            Ok(())
        })?;

        if let Some(session_id) = &state.session_id {
            self.correlation.store(session_id, &front.correlation_id)?;
        }

        let mut warnings = Vec::new();
        if !body.contains("## Context") {
            warnings.push(format!(
                "task file for {name} has no Context section; consider adding one"
            ));
        }

        Ok(TaskOutcome {
            task: name.to_string(),
            branch: front.branch,
            correlation_id: front.correlation_id,
            warnings,
        })
    }

    /// Drops the active task from unified state and clears its correlation
    /// entries. The task directory stays; tasks are cleared, not deleted.
    pub fn clear(&self) -> Result<Option<String>> {
        let snapshot = self.state.get_state()?;
        let Some(task) = snapshot.current_task.clone() else {
            return Ok(None);
        };

        self.state.clear_task_state()?;
        if let Some(correlation_id) = &snapshot.correlation_id {
            self.correlation.clear_for_correlation(correlation_id)?;
        }
        Ok(Some(task))
    }

    pub fn list(&self, status_filter: Option<&str>) -> Result<Vec<TaskSummary>> {
        let tasks_dir = self.paths.tasks_dir();
        if !tasks_dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in WalkDir::new(&tasks_dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_name() != "README.md" {
                continue;
            }
            let content = match fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), error = %err, "Skipping unreadable task file");
                    continue;
                }
            };
            let Ok((front, _)) = frontmatter::parse(&content) else {
                tracing::warn!(path = %entry.path().display(), "Skipping task file without frontmatter");
                continue;
            };
            if status_filter.is_some_and(|f| f != front.status) {
                continue;
            }
            summaries.push(TaskSummary {
                name: front.task,
                branch: front.branch,
                status: front.status,
                created: front.created,
                correlation_id: front.correlation_id,
            });
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    /// Current task view for `tasks status`.
    pub fn status(&self) -> Result<UnifiedState> {
        self.state.get_state()
    }

    /// Updates the status field in a task's frontmatter.
    pub fn set_status(&self, name: &str, status: &str) -> Result<()> {
        if !VALID_STATUSES.contains(&status) {
            return Err(BrainwormError::InvalidArgument(format!(
                "invalid status {status:?}; expected one of {VALID_STATUSES:?}"
            )));
        }

        let task_file = self.paths.task_file(name);
        if !task_file.exists() {
            return Err(BrainwormError::TaskNotFound(name.to_string()));
        }

        let content = fs::read_to_string(&task_file)
            .map_err(io_ctx(format!("reading task file {}", task_file.display())))?;
        let (mut front, _) = frontmatter::parse(&content)?;
        front.status = status.to_string();
        let rewritten = frontmatter::replace_frontmatter(&content, &front)?;
        fs::write(&task_file, rewritten)
            .map_err(io_ctx(format!("writing task file {}", task_file.display())))?;
        Ok(())
    }

    /// Appends a continuity note to the active task's file. Used by
    /// `pre_compact` so context survives transcript compaction.
    pub fn record_continuity(&self, trigger: &str, instructions: Option<&str>) -> Result<bool> {
        let snapshot = self.state.get_state()?;
        let Some(task) = &snapshot.current_task else {
            return Ok(false);
        };

        let task_file = self.paths.task_file(task);
        if !task_file.exists() {
            return Ok(false);
        }

        let mut content = fs::read_to_string(&task_file)
            .map_err(io_ctx(format!("reading task file {}", task_file.display())))?;

        if !content.contains("## Continuity") {
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str("\n## Continuity\n");
        }

        let note = match instructions {
            Some(instructions) if !instructions.trim().is_empty() => format!(
                "- {} compaction ({trigger}): {}\n",
                chrono::Utc::now().to_rfc3339(),
                instructions.trim()
            ),
            _ => format!(
                "- {} compaction ({trigger})\n",
                chrono::Utc::now().to_rfc3339()
            ),
        };
        content.push_str(&note);

        fs::write(&task_file, content)
            .map_err(io_ctx(format!("writing task file {}", task_file.display())))?;
        Ok(true)
    }

    /// Session↔correlation linkage for `tasks session`.
    pub fn session_info(&self) -> Result<(UnifiedState, Vec<String>)> {
        let state = self.state.get_state()?;
        let sessions = self.correlation.sessions()?;
        Ok((state, sessions))
    }

    fn github_enabled(&self) -> bool {
        self.config.github.as_ref().is_some_and(|gh| gh.enabled)
    }

    fn github_links_enabled(&self) -> bool {
        self.config
            .github
            .as_ref()
            .is_some_and(|gh| gh.enabled && gh.link_issues)
    }

    fn write_task_file(
        &self,
        name: &str,
        branch: &str,
        correlation_id: &str,
        linked_issue: Option<u64>,
        options: &CreateOptions,
    ) -> Result<()> {
        let task_dir = self.paths.task_dir(name);
        fs::create_dir_all(&task_dir)
            .map_err(io_ctx(format!("creating task dir {}", task_dir.display())))?;

        let front = TaskFrontmatter {
            task: name.to_string(),
            branch: branch.to_string(),
            status: "pending".to_string(),
            modules: options.services.clone(),
            created: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            correlation_id: correlation_id.to_string(),
        };

        let mut body = format!(
            "\n# Task: {name}\n\n## Problem statement\n\n\
             Describe what this task is solving.\n\n\
             ## Context\n\n\
             Notes that future sessions will need.\n\n\
             ## Work log\n"
        );
        if let Some(issue) = linked_issue {
            body.push_str(&format!("\nLinked issue: #{issue}\n"));
        }

        let task_file = self.paths.task_file(name);
        fs::write(&task_file, format!("{}{}", front.render(), body))
            .map_err(io_ctx(format!("writing task file {}", task_file.display())))?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if !NAME_PATTERN.is_match(name) {
        return Err(BrainwormError::InvalidTaskName {
            name: name.to_string(),
            reason: "use lowercase words separated by hyphens".to_string(),
        });
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(BrainwormError::InvalidTaskName {
            name: name.to_string(),
            reason: "name is reserved for a CLI command".to_string(),
        });
    }
    Ok(())
}
