//! # Stage: Act
//!
//! ## Responsibility
//! Execute a recipe.  Before touching anything, the files named by edit
//! actions are captured into an undo snapshot (shell actions snapshot
//! nothing — their targets are unknowable ahead of time).  Then each action
//! runs in order; a failing action is counted and its stderr captured, and
//! execution continues with the next action.  Nothing here throws on a
//! failing command — failures are data for verify and learn.
//!
//! Command execution sits behind [`CommandRunner`] so the engine and tests
//! can run cycles without a shell.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::Result;
use crate::recipes::{Recipe, RecipeAction};
use crate::undo::UndoRegistry;
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

/// Captured result of one subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == 0
    }
}

/// Abstracts shell execution so act logic is testable without a shell.
pub trait CommandRunner {
    fn run(&self, command: &str, cwd: &Path) -> CommandOutcome;
}

/// Runs commands through the platform shell, blocking, output captured.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> CommandOutcome {
        #[cfg(windows)]
        let mut cmd = {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        match cmd.current_dir(cwd).output() {
            Ok(output) => CommandOutcome {
                status: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            // Spawn failure (no shell, bad cwd) is captured, not thrown.
            Err(e) => CommandOutcome {
                status: -1,
                stdout: String::new(),
                stderr: format!("spawn failed: {e}"),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Act
// ---------------------------------------------------------------------------

/// What one act pass did.
#[derive(Debug, Clone, Default)]
pub struct ActOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Captured stderr (or failure messages) from failing actions.
    pub stderr: Vec<String>,
    /// Undo snapshot id, when edit actions required one.
    pub snapshot_id: Option<String>,
}

impl ActOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Snapshot, then run every action of `recipe`.
pub fn act(ws: &Workspace, recipe: &Recipe, runner: &dyn CommandRunner) -> Result<ActOutcome> {
    let mut outcome = ActOutcome::default();

    let touched = recipe.touched_files();
    if !touched.is_empty() {
        outcome.snapshot_id = Some(UndoRegistry::new(ws).capture(&touched)?);
    }

    for action in &recipe.actions {
        match action {
            RecipeAction::Shell { command } => {
                tracing::info!(recipe = %recipe.id, %command, "running shell action");
                let result = runner.run(command, ws.root());
                if result.succeeded() {
                    outcome.succeeded += 1;
                } else {
                    outcome.failed += 1;
                    outcome.stderr.push(format!(
                        "{}: exit {}: {}",
                        command,
                        result.status,
                        result.stderr.trim()
                    ));
                }
            }
            RecipeAction::Edit { file, find, replace } => {
                tracing::info!(recipe = %recipe.id, %file, "applying edit action");
                match apply_edit(ws, file, find, replace) {
                    Ok(()) => outcome.succeeded += 1,
                    Err(msg) => {
                        outcome.failed += 1;
                        outcome.stderr.push(msg);
                    }
                }
            }
        }
    }

    Ok(outcome)
}

/// Literal find/replace on one workspace file.  A missing target or an
/// absent needle is a failure message, not an error.
fn apply_edit(
    ws: &Workspace,
    file: &str,
    find: &str,
    replace: &str,
) -> std::result::Result<(), String> {
    let path = ws.root().join(file);
    let body = fs::read_to_string(&path).map_err(|e| format!("{file}: {e}"))?;
    if !body.contains(find) {
        return Err(format!("{file}: pattern not found"));
    }
    let updated = body.replace(find, replace);
    crate::workspace::atomic_write(&path, updated.as_bytes())
        .map_err(|e| format!("{file}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Scripted runner: pops predetermined outcomes, recording commands.
    struct ScriptedRunner {
        outcomes: RefCell<Vec<CommandOutcome>>,
        seen: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<CommandOutcome>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn pass() -> CommandOutcome {
            CommandOutcome { status: 0, stdout: String::new(), stderr: String::new() }
        }

        fn fail(stderr: &str) -> CommandOutcome {
            CommandOutcome { status: 1, stdout: String::new(), stderr: stderr.to_string() }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str, _cwd: &Path) -> CommandOutcome {
            self.seen.borrow_mut().push(command.to_string());
            self.outcomes.borrow_mut().remove(0)
        }
    }

    fn scratch() -> (TempDir, Workspace) {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path());
        (dir, ws)
    }

    fn shell_recipe(commands: &[&str]) -> Recipe {
        Recipe {
            id: "r".to_string(),
            name: "r".to_string(),
            description: String::new(),
            trust: None,
            condition: None,
            actions: commands
                .iter()
                .map(|c| RecipeAction::Shell { command: c.to_string() })
                .collect(),
        }
    }

    #[test]
    fn test_all_shell_actions_run_in_order() {
        let (_dir, ws) = scratch();
        let runner = ScriptedRunner::new(vec![ScriptedRunner::pass(), ScriptedRunner::pass()]);
        let outcome = act(&ws, &shell_recipe(&["first", "second"]), &runner).expect("act");
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(*runner.seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_failure_is_captured_and_execution_continues() {
        let (_dir, ws) = scratch();
        let runner = ScriptedRunner::new(vec![
            ScriptedRunner::fail("eslint exploded"),
            ScriptedRunner::pass(),
        ]);
        let outcome = act(&ws, &shell_recipe(&["bad", "good"]), &runner).expect("act");
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.succeeded, 1);
        assert!(outcome.stderr[0].contains("eslint exploded"));
        assert!(!outcome.all_succeeded());
    }

    #[test]
    fn test_shell_only_recipe_takes_no_snapshot() {
        let (_dir, ws) = scratch();
        let runner = ScriptedRunner::new(vec![ScriptedRunner::pass()]);
        let outcome = act(&ws, &shell_recipe(&["true"]), &runner).expect("act");
        assert!(outcome.snapshot_id.is_none());
    }

    #[test]
    fn test_edit_recipe_snapshots_then_edits() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("config.json"), r#"{"strict": false}"#).expect("write");
        let recipe = Recipe {
            id: "r".to_string(),
            name: "r".to_string(),
            description: String::new(),
            trust: None,
            condition: None,
            actions: vec![RecipeAction::Edit {
                file: "config.json".to_string(),
                find: "false".to_string(),
                replace: "true".to_string(),
            }],
        };
        let runner = ScriptedRunner::new(vec![]);
        let outcome = act(&ws, &recipe, &runner).expect("act");
        assert_eq!(outcome.succeeded, 1);
        let snapshot_id = outcome.snapshot_id.expect("snapshot taken");

        // The file changed, and the snapshot preserves the original.
        assert_eq!(
            fs::read_to_string(ws.root().join("config.json")).expect("read"),
            r#"{"strict": true}"#
        );
        let registry = UndoRegistry::new(&ws);
        let snap = registry.load(Some(&snapshot_id)).expect("load");
        assert_eq!(snap.data["config.json"], Some(r#"{"strict": false}"#.to_string()));
    }

    #[test]
    fn test_edit_missing_file_is_captured_failure() {
        let (_dir, ws) = scratch();
        let recipe = Recipe {
            id: "r".to_string(),
            name: "r".to_string(),
            description: String::new(),
            trust: None,
            condition: None,
            actions: vec![RecipeAction::Edit {
                file: "absent.json".to_string(),
                find: "a".to_string(),
                replace: "b".to_string(),
            }],
        };
        let outcome = act(&ws, &recipe, &ScriptedRunner::new(vec![])).expect("act");
        assert_eq!(outcome.failed, 1);
        assert!(outcome.stderr[0].contains("absent.json"));
    }

    #[test]
    fn test_edit_pattern_not_found_is_captured_failure() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("f.txt"), "hello").expect("write");
        let recipe = Recipe {
            id: "r".to_string(),
            name: "r".to_string(),
            description: String::new(),
            trust: None,
            condition: None,
            actions: vec![RecipeAction::Edit {
                file: "f.txt".to_string(),
                find: "absent-needle".to_string(),
                replace: "x".to_string(),
            }],
        };
        let outcome = act(&ws, &recipe, &ScriptedRunner::new(vec![])).expect("act");
        assert!(outcome.stderr[0].contains("pattern not found"));
    }

    #[test]
    fn test_shell_runner_captures_exit_and_stderr() {
        let (_dir, ws) = scratch();
        let result = ShellRunner.run("echo out; echo err >&2; exit 3", ws.root());
        assert_eq!(result.status, 3);
        assert!(result.stdout.contains("out"));
        assert!(result.stderr.contains("err"));
        assert!(!result.succeeded());
    }

    #[test]
    fn test_shell_runner_runs_in_workspace_cwd() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("marker.txt"), "here").expect("write");
        let result = ShellRunner.run("cat marker.txt", ws.root());
        assert!(result.succeeded());
        assert!(result.stdout.contains("here"));
    }
}
