use clap::{CommandFactory, Parser};
use colored::*;

use odavl::autopilot::act::ShellRunner;
use odavl::autopilot::engine::{AutopilotEngine, EngineConfig};
use odavl::cli::{Args, AutopilotCommand, Command, GuardianCommand, InsightCommand, UndoCommand};
use odavl::insight;
use odavl::undo::UndoRegistry;
use odavl::workspace::Workspace;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("odavl=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let ws = Workspace::new(&args.workspace);

    let outcome = match args.command {
        Command::Insight { command } => run_insight(&ws, command),
        Command::Autopilot { command } => run_autopilot(&ws, command),
        Command::Undo { command, to } => run_undo(&ws, command, to),
        Command::Guardian { command } => run_guardian(&ws, command).await,
        Command::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Args::command(),
                "odavl",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("{} {}", "error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

fn run_insight(ws: &Workspace, command: InsightCommand) -> odavl::error::Result<()> {
    match command {
        InsightCommand::Analyze { json } => {
            let metrics = insight::observe(ws);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&metrics).unwrap_or_else(|_| "{}".to_string())
                );
            } else {
                println!("{}", "ANALYSIS".bright_cyan().bold());
                if metrics.counts.is_empty() {
                    println!("  no issues observed");
                }
                for (detector, count) in &metrics.counts {
                    println!("  {:<16} {}", detector.bright_yellow(), count);
                }
                println!("  {:<16} {}", "total".bright_white().bold(), metrics.total());
            }
            Ok(())
        }
    }
}

fn run_autopilot(ws: &Workspace, command: AutopilotCommand) -> odavl::error::Result<()> {
    match command {
        AutopilotCommand::Run { cycles, dry_run, risk_ceiling } => {
            let engine = AutopilotEngine::new(
                ws,
                &ShellRunner,
                EngineConfig { cycles, dry_run, risk_ceiling },
            );
            let outcomes = engine.run()?;
            let improved = outcomes
                .iter()
                .filter(|o| o.verify.as_ref().is_some_and(|v| v.improved()))
                .count();
            println!(
                "{} {} cycle(s), {} improved",
                "done".bright_green().bold(),
                outcomes.len(),
                improved
            );
            Ok(())
        }
    }
}

fn run_undo(
    ws: &Workspace,
    command: Option<UndoCommand>,
    to: Option<String>,
) -> odavl::error::Result<()> {
    let registry = UndoRegistry::new(ws);
    match command {
        Some(UndoCommand::List) => {
            let ids = registry.list();
            if ids.is_empty() {
                println!("no undo snapshots");
            }
            for id in ids {
                println!("{id}");
            }
            Ok(())
        }
        None => {
            let restored = registry.restore(to.as_deref())?;
            println!(
                "{} restored {} file(s) from {}",
                "undo".bright_green().bold(),
                restored,
                to.as_deref().unwrap_or("latest")
            );
            Ok(())
        }
    }
}

async fn run_guardian(ws: &Workspace, command: GuardianCommand) -> odavl::error::Result<()> {
    match command {
        GuardianCommand::Test { url } => {
            let (report, paths) = odavl::guardian::run(ws, &url).await?;
            println!("{} {}", "GUARDIAN".bright_cyan().bold(), report.url);
            if let Some(error) = &report.error {
                println!("  {} {}", "unreachable:".bright_red(), error);
            }
            for suite in &report.suites {
                println!(
                    "  {:<14} {:>4.0}%  ({} finding(s))",
                    suite.name.bright_yellow(),
                    suite.score * 100.0,
                    suite.findings.len()
                );
            }
            println!("  {:<14} {:>4.0}%", "overall".bright_white().bold(), report.overall_score * 100.0);
            for path in paths {
                println!("  report: {}", path.display());
            }
            Ok(())
        }
    }
}
