//! Git branch orchestration for the task manager.
//!
//! Shells out to `git` in the project (or submodule) directory. Output is
//! captured, never streamed; failures carry the command and stderr so CLI
//! users see what actually went wrong.

use std::path::Path;
use std::process::Command;

use crate::error::{BrainwormError, Result};

/// Branches the task manager refuses to work on directly.
pub const PROTECTED_BRANCHES: [&str; 3] = ["main", "master", "develop"];

pub fn is_protected(branch: &str) -> bool {
    PROTECTED_BRANCHES.contains(&branch)
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|err| BrainwormError::GitFailed {
            command: format!("git {}", args.join(" ")),
            details: err.to_string(),
        })?;

    if !output.status.success() {
        return Err(BrainwormError::GitFailed {
            command: format!("git {}", args.join(" ")),
            details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn is_repository(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(dir)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub fn current_branch(dir: &Path) -> Result<String> {
    run_git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn has_uncommitted_changes(dir: &Path) -> Result<bool> {
    Ok(!run_git(dir, &["status", "--porcelain"])?.is_empty())
}

pub fn branch_exists(dir: &Path, branch: &str) -> bool {
    Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
        .current_dir(dir)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Checks out `branch`, creating it from the current HEAD when absent.
/// An existing branch is reused, never reset.
pub fn checkout_or_create(dir: &Path, branch: &str) -> Result<()> {
    if branch_exists(dir, branch) {
        run_git(dir, &["checkout", branch])?;
    } else {
        run_git(dir, &["checkout", "-b", branch])?;
    }
    Ok(())
}

pub fn checkout(dir: &Path, branch: &str) -> Result<()> {
    run_git(dir, &["checkout", branch])?;
    Ok(())
}

/// `user.name` / `user.email` from git config, for the developer block in
/// unified state. Absence is not an error.
pub fn configured_developer(dir: &Path) -> (Option<String>, Option<String>) {
    let name = run_git(dir, &["config", "user.name"]).ok().filter(|s| !s.is_empty());
    let email = run_git(dir, &["config", "user.email"]).ok().filter(|s| !s.is_empty());
    (name, email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(dir: &Path) {
        git_in(dir, &["init", "--quiet", "--initial-branch=main"]);
        git_in(dir, &["config", "user.name", "Test"]);
        git_in(dir, &["config", "user.email", "test@example.com"]);
        fs_err::write(dir.join("README"), "hello").unwrap();
        git_in(dir, &["add", "."]);
        git_in(dir, &["commit", "--quiet", "-m", "init"]);
    }

    #[test]
    fn protected_branch_detection() {
        assert!(is_protected("main"));
        assert!(is_protected("develop"));
        assert!(!is_protected("feature/x"));
    }

    #[test]
    fn non_repo_is_detected() {
        let temp = tempdir().unwrap();
        assert!(!is_repository(temp.path()));
        assert!(current_branch(temp.path()).is_err());
    }

    #[test]
    fn branch_lifecycle() {
        let temp = tempdir().unwrap();
        init_repo(temp.path());

        assert_eq!(current_branch(temp.path()).unwrap(), "main");
        assert!(!branch_exists(temp.path(), "fix/login"));

        checkout_or_create(temp.path(), "fix/login").unwrap();
        assert_eq!(current_branch(temp.path()).unwrap(), "fix/login");
        assert!(branch_exists(temp.path(), "fix/login"));

        // Re-checkout reuses, does not fail.
        checkout(temp.path(), "main").unwrap();
        checkout_or_create(temp.path(), "fix/login").unwrap();
        assert_eq!(current_branch(temp.path()).unwrap(), "fix/login");
    }

    #[test]
    fn uncommitted_changes_are_noticed() {
        let temp = tempdir().unwrap();
        init_repo(temp.path());

        assert!(!has_uncommitted_changes(temp.path()).unwrap());
        fs_err::write(temp.path().join("dirty.txt"), "wip").unwrap();
        assert!(has_uncommitted_changes(temp.path()).unwrap());
    }
}
