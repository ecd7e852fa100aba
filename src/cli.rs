use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge managed clusters and workspaces to a declared configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Desired configuration file [default: <config dir>/resources.toml]
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<String>,

    /// Recorded state file [default: <state dir>/state.json]
    #[arg(long, global = true, env = "CONVERGE_STATE")]
    pub state: Option<String>,

    /// Local control plane store [default: <state dir>/remote.json]
    #[arg(long, global = true, env = "CONVERGE_REMOTE")]
    pub remote: Option<String>,

    /// Act as an authenticated control plane caller
    #[arg(long, global = true, env = "CONVERGE_AUTHENTICATED")]
    pub authenticated: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Reconcile the remote with the desired configuration
    Apply(ApplyArgs),

    /// Delete recorded resources
    Destroy(DestroyArgs),

    /// Adopt an existing remote resource into state
    Import {
        /// Address to record the resource under (kind.name)
        address: String,

        /// Remote id of the resource
        id: String,
    },

    /// Show recorded state
    Show {
        /// Resource address (kind.name); all resources if omitted
        address: Option<String>,
    },

    /// List resource kinds or describe one
    Schema {
        /// Kind to describe
        kind: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone)]
pub struct PlanArgs {
    /// Only plan specific resources (kind or kind.name, repeatable)
    #[arg(short, long)]
    pub target: Vec<String>,

    /// Re-read recorded resources from the remote before planning
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Args, Clone)]
pub struct ApplyArgs {
    /// Only apply specific resources (kind or kind.name, repeatable)
    #[arg(short, long)]
    pub target: Vec<String>,

    /// Re-read recorded resources from the remote before planning
    #[arg(long)]
    pub refresh: bool,

    /// Show what would change without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,

    /// Give up on remote calls not yet started after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Clone)]
pub struct DestroyArgs {
    /// Only destroy specific resources (kind or kind.name, repeatable)
    #[arg(short, long)]
    pub target: Vec<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of resources reconciled in parallel
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub jobs: u16,
}
