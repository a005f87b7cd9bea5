//! Task README frontmatter: render and parse.
//!
//! The frontmatter is the flat YAML subset between `---` markers: scalar
//! `key: value` lines plus an inline list for `modules`. Body markdown is
//! preserved byte-for-byte on rewrite; the user owns it.

use crate::error::{BrainwormError, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskFrontmatter {
    pub task: String,
    pub branch: String,
    pub status: String,
    pub modules: Vec<String>,
    pub created: String,
    pub correlation_id: String,
}

impl TaskFrontmatter {
    pub fn render(&self) -> String {
        let modules = self.modules.join(", ");
        format!(
            "---\n\
             task: {}\n\
             branch: {}\n\
             status: {}\n\
             modules: [{}]\n\
             created: {}\n\
             correlation_id: {}\n\
             ---\n",
            self.task, self.branch, self.status, modules, self.created, self.correlation_id
        )
    }
}

/// Splits a task file into `(frontmatter, body)`.
pub fn parse(content: &str) -> Result<(TaskFrontmatter, String)> {
    let rest = content.strip_prefix("---\n").ok_or_else(|| {
        BrainwormError::InvalidArgument("task file has no frontmatter".to_string())
    })?;
    let (header, body) = rest.split_once("\n---\n").ok_or_else(|| {
        BrainwormError::InvalidArgument("task file frontmatter is unterminated".to_string())
    })?;

    let mut frontmatter = TaskFrontmatter::default();
    for line in header.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "task" => frontmatter.task = value.to_string(),
            "branch" => frontmatter.branch = value.to_string(),
            "status" => frontmatter.status = value.to_string(),
            "created" => frontmatter.created = value.to_string(),
            "correlation_id" => frontmatter.correlation_id = value.to_string(),
            "modules" => {
                let inner = value.trim_start_matches('[').trim_end_matches(']');
                frontmatter.modules = inner
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();
            }
            _ => {}
        }
    }

    Ok((frontmatter, body.to_string()))
}

/// Rewrites only the frontmatter, leaving the body untouched.
pub fn replace_frontmatter(content: &str, frontmatter: &TaskFrontmatter) -> Result<String> {
    let (_, body) = parse(content)?;
    Ok(format!("{}{}", frontmatter.render(), body))
}
