//! tasks: create, switch, and inspect units of work.

use brainworm_cli::{exit_with, parse_services, CliContext};
use brainworm_core::events::EventStore;
use brainworm_core::tasks::{CreateOptions, TaskManager};
use brainworm_core::{BrainwormError, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tasks")]
#[command(about = "Task management for the brainworm workflow")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task: directory, branch, correlation id
    Create {
        /// Task name (lowercase, hyphen-delimited, e.g. fix-login-bug)
        name: String,

        /// Comma-separated services this task touches
        #[arg(long, value_name = "LIST")]
        services: Option<String>,

        /// Create the branch inside this submodule instead of the project
        #[arg(long, value_name = "PATH")]
        submodule: Option<String>,

        /// Never prompt; take the deterministic branch decision
        #[arg(long)]
        no_interactive: bool,

        /// Reference an existing issue number in the task file
        #[arg(long, value_name = "N")]
        link_issue: Option<u64>,

        /// Create a tracking issue (requires [github] integration)
        #[arg(long)]
        create_issue: bool,
    },

    /// Show the active task and workflow mode
    Status,

    /// List tasks, optionally filtered by status
    List {
        #[arg(long, value_name = "STATUS")]
        status: Option<String>,
    },

    /// Switch to an existing task (checks out its branch)
    Switch { name: String },

    /// Clear the active task from session state
    Clear,

    /// Update a task field, e.g. `tasks set status completed`
    Set {
        /// Field to update (only `status` is recognized)
        field: String,
        value: String,
        /// Task to update; defaults to the active task
        #[arg(long, value_name = "NAME")]
        task: Option<String>,
    },

    /// Show session ↔ correlation linkage
    Session,
}

fn main() {
    let cli = Cli::parse();

    let ctx = match CliContext::resolve() {
        Ok(ctx) => ctx,
        Err(err) => exit_with(err),
    };

    if let Err(err) = run(&ctx, cli.command) {
        exit_with(err);
    }
}

fn run(ctx: &CliContext, command: Commands) -> Result<()> {
    let manager = TaskManager::new(&ctx.paths, &ctx.config, &ctx.state, &ctx.correlation);

    match command {
        Commands::Create {
            name,
            services,
            submodule,
            no_interactive,
            link_issue,
            create_issue,
        } => {
            let options = CreateOptions {
                services: parse_services(services.as_deref()),
                submodule,
                no_interactive,
                link_issue,
                create_issue,
            };
            let outcome = manager.create(&name, &options)?;
            println!("created task {} on branch {}", outcome.task, outcome.branch);
            println!("correlation: {}", outcome.correlation_id);
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
        }

        Commands::Status => {
            let state = manager.status()?;
            match &state.current_task {
                Some(task) => {
                    println!("task: {task}");
                    println!(
                        "branch: {}",
                        state.current_branch.as_deref().unwrap_or("?")
                    );
                    if !state.task_services.is_empty() {
                        println!("services: {}", state.task_services.join(", "));
                    }
                }
                None => println!("task: none"),
            }
            println!("mode: {}", state.daic_mode.as_str());

            if let Some(line) = last_event_line(ctx) {
                println!("{line}");
            }
        }

        Commands::List { status } => {
            let summaries = manager.list(status.as_deref())?;
            if summaries.is_empty() {
                println!("no tasks");
            }
            for summary in summaries {
                println!(
                    "{:<28} {:<12} {:<20} {}",
                    summary.name, summary.status, summary.branch, summary.created
                );
            }
        }

        Commands::Switch { name } => {
            let outcome = manager.switch(&name)?;
            println!("switched to {} on branch {}", outcome.task, outcome.branch);
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
        }

        Commands::Clear => match manager.clear()? {
            Some(task) => println!("cleared task {task}"),
            None => println!("no active task"),
        },

        Commands::Set { field, value, task } => {
            if field != "status" {
                return Err(BrainwormError::InvalidArgument(format!(
                    "unknown field {field:?}; only `status` can be set"
                )));
            }
            let name = match task {
                Some(name) => name,
                None => ctx
                    .state
                    .get_state()?
                    .current_task
                    .ok_or_else(|| {
                        BrainwormError::InvalidArgument(
                            "no active task; pass --task <name>".to_string(),
                        )
                    })?,
            };
            manager.set_status(&name, &value)?;
            println!("{name}: status = {value}");
        }

        Commands::Session => {
            let (state, sessions) = manager.session_info()?;
            println!(
                "session: {}",
                state.session_id.as_deref().unwrap_or("none")
            );
            println!(
                "correlation: {}",
                state.correlation_id.as_deref().unwrap_or("none")
            );
            if !sessions.is_empty() {
                println!("linked sessions: {}", sessions.join(", "));
            }
        }
    }
    Ok(())
}

/// Best-effort "last event" line for `tasks status`. The event log is
/// informational here; a missing or locked database is not an error.
fn last_event_line(ctx: &CliContext) -> Option<String> {
    let db = ctx.paths.events_db();
    if !db.exists() {
        return None;
    }
    let events = EventStore::open(&db).ok()?;
    let recent = events.recent_events(1).ok()?;
    let event = recent.first()?;

    let now_ns = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_nanos() as u64;
    let age_secs = now_ns.saturating_sub(event.timestamp_ns) / 1_000_000_000;
    Some(format!("last event: {} ({age_secs}s ago)", event.hook_name))
}
