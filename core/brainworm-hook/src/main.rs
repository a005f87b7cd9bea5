//! brainworm-hook: hook dispatcher for the brainworm runtime.
//!
//! The host invokes this binary once per lifecycle event with a JSON
//! payload on stdin. The dispatcher parses the payload, locates the
//! project, constructs the collaborators, routes to the handler for the
//! event, and writes a JSON response to stdout.
//!
//! Exit codes: 0 for handled events (including policy denials and
//! validation failures — the host must continue); non-zero only for
//! infrastructure failures, which also print a bordered diagnostic to
//! stderr.

mod diagnostics;
mod dispatch;
mod handlers;
mod logging;
#[cfg(test)]
mod testutil;

use std::io::Read;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "brainworm-hook")]
#[command(about = "brainworm workflow enforcement hook dispatcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle {
        /// Event name the host believes it is sending; the payload's
        /// `hook_event_name` is authoritative on mismatch.
        #[arg(value_name = "EVENT")]
        event: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Handle { event } => {
            let mut input = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut input) {
                diagnostics::print_fatal(
                    "reading hook payload from stdin",
                    &err.to_string(),
                    "the host must pipe a JSON document into this process",
                );
                std::process::exit(1);
            }

            std::process::exit(dispatch::run(&input, event.as_deref()));
        }
    }
}
