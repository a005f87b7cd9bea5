//! daic: inspect and transition the DAIC workflow mode.
//!
//! The user drives both directions from here. Trigger phrases can flip
//! discussion→implementation during a prompt, but implementation→discussion
//! happens only through this command.

use brainworm_cli::{exit_with, CliContext};
use brainworm_core::state::DaicMode;
use brainworm_core::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "daic")]
#[command(about = "DAIC workflow mode control")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current mode and active task
    Status,
    /// Switch to discussion mode
    Discussion,
    /// Switch to implementation mode
    Implementation,
    /// Flip between the two modes
    Toggle,
}

fn main() {
    let cli = Cli::parse();
    // Bare `daic` toggles, matching the muscle-memory usage.
    let command = cli.command.unwrap_or(Commands::Toggle);

    let ctx = match CliContext::resolve() {
        Ok(ctx) => ctx,
        Err(err) => exit_with(err),
    };

    if let Err(err) = run(&ctx, command) {
        exit_with(err);
    }
}

fn run(ctx: &CliContext, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            let state = ctx.state.get_state()?;
            println!("mode: {}", state.daic_mode.as_str());
            match &state.current_task {
                Some(task) => println!(
                    "task: {task} (branch {})",
                    state.current_branch.as_deref().unwrap_or("?")
                ),
                None => println!("task: none"),
            }
            if let Some(timestamp) = &state.daic_timestamp {
                println!("since: {}", timestamp.to_rfc3339());
            }
        }
        Commands::Discussion => {
            ctx.state.set_daic_mode(DaicMode::Discussion)?;
            println!("mode: discussion");
        }
        Commands::Implementation => {
            ctx.state.set_daic_mode(DaicMode::Implementation)?;
            println!("mode: implementation");
        }
        Commands::Toggle => {
            let mode = ctx.state.toggle_daic_mode()?;
            println!("mode: {}", mode.as_str());
        }
    }
    Ok(())
}
