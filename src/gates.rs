//! # Stage: Quality Gates
//!
//! ## Responsibility
//! Named numeric thresholds enforced after a fix attempt, loaded from
//! `.odavl/gates.yml`.  Two kinds:
//!
//! - `max_increase` — the detector's delta (`after - before`) must not
//!   exceed the bound (default bound 0: "no new issues")
//! - `max_total` — the detector's absolute count after the act must not
//!   exceed the bound
//!
//! A missing or unparsable gates file falls back to one built-in gate:
//! the total issue count must not increase.
//!
//! ## Guarantees
//! - Auditable: every evaluation produces a [`GateReport`] with a per-gate
//!   outcome and a one-line summary for logs

use std::fs;

use serde::{Deserialize, Serialize};

use crate::insight::MetricsSnapshot;
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Gate definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gate {
    pub name: String,
    /// Detector the gate watches; `total` means the sum over all detectors.
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_increase: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateSet {
    #[serde(default)]
    pub gates: Vec<Gate>,
}

impl GateSet {
    /// Load `.odavl/gates.yml`, falling back to [`GateSet::builtin`] when the
    /// file is missing or unparsable.
    pub fn load(ws: &Workspace) -> Self {
        let Ok(body) = fs::read_to_string(ws.gates_file()) else {
            return Self::builtin();
        };
        match serde_yaml::from_str::<GateSet>(&body) {
            Ok(set) if !set.gates.is_empty() => set,
            _ => Self::builtin(),
        }
    }

    /// The default gate applied when no gates file exists: don't get worse.
    pub fn builtin() -> Self {
        Self {
            gates: vec![Gate {
                name: "total-issues".to_string(),
                metric: "total".to_string(),
                max_increase: Some(0),
                max_total: None,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// The outcome of a single gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateStatus {
    Passed,
    Failed { reason: String },
}

impl GateStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, GateStatus::Passed)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Passed => write!(f, "PASS"),
            GateStatus::Failed { reason } => write!(f, "FAIL: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: String,
    pub metric: String,
    pub status: GateStatus,
}

/// The complete output of one gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub outcomes: Vec<GateOutcome>,
    pub overall_passed: bool,
    /// Detectors whose count went down.
    pub improved: Vec<String>,
}

impl GateReport {
    pub fn failed_gates(&self) -> Vec<&GateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.status.is_passed())
            .collect()
    }

    /// Compact text summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "Gates: {} — {} passed, {} failed, {} detector(s) improved",
            if self.overall_passed { "PASS" } else { "FAIL" },
            self.outcomes.len() - self.failed_gates().len(),
            self.failed_gates().len(),
            self.improved.len(),
        )
    }
}

/// Evaluate every gate against the before/after pair.
pub fn evaluate(before: &MetricsSnapshot, after: &MetricsSnapshot, gates: &GateSet) -> GateReport {
    let mut outcomes = Vec::new();

    for gate in &gates.gates {
        let before_count = before.get(&gate.metric) as i64;
        let after_count = after.get(&gate.metric) as i64;
        let delta = after_count - before_count;

        let mut status = GateStatus::Passed;
        if let Some(bound) = gate.max_increase {
            if delta > bound {
                status = GateStatus::Failed {
                    reason: format!("{} rose by {} (allowed {})", gate.metric, delta, bound),
                };
            }
        }
        if status.is_passed() {
            if let Some(bound) = gate.max_total {
                if after.get(&gate.metric) > bound {
                    status = GateStatus::Failed {
                        reason: format!(
                            "{} is {} (allowed {})",
                            gate.metric,
                            after.get(&gate.metric),
                            bound
                        ),
                    };
                }
            }
        }
        outcomes.push(GateOutcome {
            gate: gate.name.clone(),
            metric: gate.metric.clone(),
            status,
        });
    }

    let improved: Vec<String> = before
        .delta_to(after)
        .into_iter()
        .filter(|(_, delta)| *delta < 0)
        .map(|(name, _)| name)
        .collect();

    let overall_passed = outcomes.iter().all(|o| o.status.is_passed());
    GateReport {
        outcomes,
        overall_passed,
        improved,
    }
}
