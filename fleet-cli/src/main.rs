//! Fleet — batch-change planning CLI.
//!
//! # Usage
//!
//! ```text
//! fleet validate <spec>
//! fleet plan <spec> --repos <file> --checkouts <dir> [--json]
//! fleet group <diff-file> --spec <spec> --repo <name> [--json]
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{group::GroupArgs, plan::PlanArgs, validate::ValidateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fleet",
    version,
    about = "Plan batch changes across many repositories",
    long_about = None,
)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a batch spec.
    Validate(ValidateArgs),

    /// Resolve workspaces from local checkouts and print the planned tasks.
    Plan(PlanArgs),

    /// Validate transformChanges groups and split a diff into branches.
    Group(GroupArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Validate(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Group(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
