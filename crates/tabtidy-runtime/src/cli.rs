//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tabtidy", about = "rule-driven tab grouping and sorting")]
pub struct Cli {
    /// Preferences file (.toml or .json)
    #[arg(long, short = 'c', global = true, env = "TABTIDY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extra custom strategies (JSON array), appended to the config's
    #[arg(long, global = true)]
    pub strategies: Option<PathBuf>,

    /// Strategy id to apply, in order; repeatable. Overrides `sorting`
    #[arg(long = "strategy", short = 's', global = true)]
    pub strategy: Vec<String>,

    /// Clock for age buckets (RFC 3339); defaults to now
    #[arg(long, global = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bucket a tab snapshot file and print the buckets (JSON)
    Plan(PlanOpts),
    /// Plan against a host state file and reconcile its groups
    Apply(StateOpts),
    /// Sort tabs within groups and windows of a host state file
    Sort(StateOpts),
    /// Describe the existing groups of a host state file (JSON)
    Current(CurrentOpts),
    /// List built-in and custom strategies (JSON)
    Strategies,
}

#[derive(clap::Args)]
pub struct PlanOpts {
    /// JSON array of tab records
    #[arg(long)]
    pub tabs: PathBuf,
}

#[derive(clap::Args)]
pub struct StateOpts {
    /// Host state JSON ({ tabs, groups, windows })
    #[arg(long)]
    pub state: PathBuf,

    /// Write the resulting state back to the file
    #[arg(long)]
    pub write: bool,

    /// Restrict to these windows; repeatable
    #[arg(long = "window")]
    pub windows: Vec<i64>,

    /// Restrict to these tabs; repeatable
    #[arg(long = "tab")]
    pub tabs: Vec<i64>,
}

#[derive(clap::Args)]
pub struct CurrentOpts {
    /// Host state JSON ({ tabs, groups, windows })
    #[arg(long)]
    pub state: PathBuf,
}
