//! # Autopilot Engine
//!
//! The loop that closes the feedback cycle:
//!
//! ```text
//! observe ──► decide ──► act ──► verify ──► learn
//!    ▲                                        │
//!    └────────────── next cycle ◄─────────────┘
//! ```
//!
//! Each cycle is strictly sequential; `noop` from decide ends the run early.
//! `dry_run` stops a cycle after decide and reports what would have run.

use colored::*;

use crate::autopilot::act::{act, ActOutcome, CommandRunner};
use crate::autopilot::decide::{decide, Decision};
use crate::autopilot::learn::learn;
use crate::autopilot::predictor::TrustPredictor;
use crate::autopilot::verify::{verify, VerifyOutcome};
use crate::error::Result;
use crate::insight::observe;
use crate::recipes::load_recipes;
use crate::trust::{TrustRecord, TrustStore};
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Config / outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many observe→learn cycles to run.
    pub cycles: u32,
    /// Stop each cycle after decide; nothing is executed or learned.
    pub dry_run: bool,
    /// Forwarded to the risk predictor.
    pub risk_ceiling: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycles: 1,
            dry_run: false,
            risk_ceiling: crate::autopilot::predictor::DEFAULT_RISK_CEILING,
        }
    }
}

/// Everything one cycle did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle: u32,
    pub decision: Decision,
    pub act: Option<ActOutcome>,
    pub verify: Option<VerifyOutcome>,
    pub trust: Option<TrustRecord>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct AutopilotEngine<'a> {
    ws: &'a Workspace,
    runner: &'a dyn CommandRunner,
    config: EngineConfig,
}

impl<'a> AutopilotEngine<'a> {
    pub fn new(ws: &'a Workspace, runner: &'a dyn CommandRunner, config: EngineConfig) -> Self {
        Self { ws, runner, config }
    }

    /// Run up to `cycles` full cycles, stopping early on `noop`.
    pub fn run(&self) -> Result<Vec<CycleOutcome>> {
        let mut outcomes = Vec::new();
        for cycle in 1..=self.config.cycles {
            let outcome = self.run_cycle(cycle)?;
            let is_noop = outcome.decision == Decision::Noop;
            outcomes.push(outcome);
            // A dry run never changes the workspace, so later cycles would
            // just repeat the same decision.
            if is_noop || self.config.dry_run {
                break;
            }
        }
        Ok(outcomes)
    }

    fn run_cycle(&self, cycle: u32) -> Result<CycleOutcome> {
        println!(
            "{} {}",
            "cycle".bright_blue().bold(),
            cycle.to_string().bright_white()
        );

        // Observe
        let metrics = observe(self.ws);
        tracing::info!(total = metrics.total(), "observe complete");
        println!("  {} {} issue(s) observed", "observe".bright_yellow(), metrics.total());

        // Decide
        let recipes = load_recipes(self.ws)?;
        let store = TrustStore::load(self.ws);
        let predictor = TrustPredictor::new(self.config.risk_ceiling);
        let decision = decide(&metrics, &recipes, &store, &predictor);
        println!("  {} {}", "decide".bright_yellow(), decision);

        if decision == Decision::Noop || self.config.dry_run {
            if self.config.dry_run && decision != Decision::Noop {
                println!("  {} dry run, stopping before act", "skip".bright_magenta());
            }
            return Ok(CycleOutcome {
                cycle,
                decision,
                act: None,
                verify: None,
                trust: None,
            });
        }

        let recipe_id = decision
            .recipe_id()
            .expect("non-noop decision names a recipe")
            .to_string();
        let recipe = recipes
            .iter()
            .find(|r| r.id == recipe_id)
            .expect("decision picked a loaded recipe");

        // Act
        let act_outcome = act(self.ws, recipe, self.runner)?;
        println!(
            "  {} {} ok, {} failed{}",
            "act".bright_yellow(),
            act_outcome.succeeded,
            act_outcome.failed,
            act_outcome
                .snapshot_id
                .as_deref()
                .map(|id| format!(" (undo {id})"))
                .unwrap_or_default()
        );
        for line in &act_outcome.stderr {
            tracing::warn!(recipe = %recipe_id, stderr = %line, "action failed");
        }

        // Verify
        let verify_outcome = verify(self.ws, &recipe_id, &metrics);
        println!("  {} {}", "verify".bright_yellow(), verify_outcome.report.summary());

        // Learn — improvement is judged by the report alone; a noisy action
        // that still drove the counts down counts as a success.
        let improved = verify_outcome.improved();
        let mut store = TrustStore::load(self.ws);
        let record = learn(
            self.ws,
            &mut store,
            &recipe_id,
            recipe.trust,
            improved,
            verify_outcome.deltas.clone(),
            act_outcome.failed,
        )?;
        let verdict = if improved {
            "improved".bright_green().to_string()
        } else {
            "no improvement".bright_red().to_string()
        };
        println!(
            "  {} {} — trust {:.2} ({}/{} runs)",
            "learn".bright_yellow(),
            verdict,
            record.trust,
            record.success,
            record.runs
        );

        Ok(CycleOutcome {
            cycle,
            decision,
            act: Some(act_outcome),
            verify: Some(verify_outcome),
            trust: Some(record),
        })
    }
}
