use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "odavl")]
#[command(version)]
#[command(about = "Self-driving code quality: observe, decide, act, verify, learn")]
pub struct Args {
    /// Workspace root (the directory holding .odavl/)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analysis report inspection
    Insight {
        #[command(subcommand)]
        command: InsightCommand,
    },
    /// The observe→decide→act→verify→learn cycle
    Autopilot {
        #[command(subcommand)]
        command: AutopilotCommand,
    },
    /// Restore files from an undo snapshot
    Undo {
        #[command(subcommand)]
        command: Option<UndoCommand>,
        /// Snapshot id to restore (defaults to the latest)
        #[arg(long)]
        to: Option<String>,
    },
    /// Website checks (accessibility, performance, security)
    Guardian {
        #[command(subcommand)]
        command: GuardianCommand,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand)]
pub enum InsightCommand {
    /// Read the current analysis report and print per-detector counts
    Analyze {
        /// Print the raw metrics object as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AutopilotCommand {
    /// Run the cycle
    Run {
        /// Number of cycles before stopping
        #[arg(long, default_value = "1")]
        cycles: u32,
        /// Stop after decide; execute nothing
        #[arg(long)]
        dry_run: bool,
        /// Skip recipes whose predicted risk exceeds this ceiling
        #[arg(long, default_value = "0.8")]
        risk_ceiling: f64,
    },
}

#[derive(Subcommand)]
pub enum UndoCommand {
    /// List available snapshot ids
    List,
}

#[derive(Subcommand)]
pub enum GuardianCommand {
    /// Fetch a URL and run every check suite
    Test { url: String },
}
