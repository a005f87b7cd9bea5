//! Bordered stderr diagnostics for infrastructure failures.
//!
//! When a collaborator is missing the hook must not degrade to a silent
//! no-op: the box names what broke and what to do about it, and the
//! process exits non-zero so the host notices.

use brainworm_core::BrainwormError;

/// Prints a bordered diagnostic naming the failure and a remedy.
pub fn print_fatal(context: &str, details: &str, remedy: &str) {
    let mut lines = vec!["brainworm: infrastructure failure".to_string(), String::new()];
    lines.push(format!("while: {context}"));
    for detail in details.lines() {
        lines.push(format!("error: {detail}"));
    }
    lines.push(String::new());
    for hint in remedy.lines() {
        lines.push(format!("remedy: {hint}"));
    }

    eprintln!("{}", boxed(&lines));
}

/// Maps an error to its remedy text and prints the box.
pub fn print_fatal_error(context: &str, err: &BrainwormError) {
    print_fatal(context, &err.to_string(), remedy_for(err));
}

fn remedy_for(err: &BrainwormError) -> &'static str {
    match err {
        BrainwormError::LockTimeout { .. } => {
            "check for a hung brainworm process; if none is running,\n\
             remove the stale .lock file and retry"
        }
        BrainwormError::EventStoreUnavailable { .. } => {
            "verify .brainworm/events/ is writable and the disk has space;\n\
             the event log is required, hooks never run without it"
        }
        BrainwormError::StateCorrupted { .. } => {
            "inspect the named file; restore it from version control or\n\
             fix the JSON by hand (brainworm will not rewrite it)"
        }
        BrainwormError::ProjectRootNotFound(_) => {
            "run from inside a project, or set CLAUDE_PLUGIN_ROOT to the project root"
        }
        _ => "re-run with BRAINWORM_DEBUG=1 for a verbose log of the failure",
    }
}

fn boxed(lines: &[String]) -> String {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    out.push('+');
    out.push_str(&"-".repeat(width + 2));
    out.push_str("+\n");
    for line in lines {
        let padding = width - line.chars().count();
        out.push_str("| ");
        out.push_str(line);
        out.push_str(&" ".repeat(padding));
        out.push_str(" |\n");
    }
    out.push('+');
    out.push_str(&"-".repeat(width + 2));
    out.push('+');
    out
}
