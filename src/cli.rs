use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "monac")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative monitoring-as-code", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: monac.toml in the config directory)
    #[arg(short, long, global = true, env = "MONAC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Reconcile backends with the object documents
    Apply(ApplyArgs),

    /// Inspect or edit the identity mapping
    #[command(subcommand)]
    State(StateCommand),

    /// Check config and documents without touching state or backends
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Also list objects that are up to date
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List tracked objects and their remote ids
    List,

    /// Stop tracking an object (the remote object is left alone)
    Rm {
        /// Stable identifier, e.g. Alert.cpu
        id: String,
    },
}
