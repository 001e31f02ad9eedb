//! # Stage: Verify
//!
//! ## Responsibility
//! Decide whether an act made things better.  Re-runs observe, computes
//! per-detector deltas, and evaluates every gate from `.odavl/gates.yml`.
//! On an overall pass with at least one improved detector, writes an
//! attestation — a SHA-256-stamped record of the before/after counts — to
//! `reports/verify-<ts>.json`.
//!
//! ## NOT Responsible For
//! - Rolling anything back (the operator decides, via `odavl undo`)
//! - Updating trust (learn)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::gates::{evaluate, GateReport, GateSet};
use crate::insight::{observe, MetricsSnapshot};
use crate::workspace::{atomic_write_json, timestamp_id, Workspace};

// ---------------------------------------------------------------------------
// Attestation
// ---------------------------------------------------------------------------

/// A hash-stamped record asserting a verified improvement occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub id: String,
    pub timestamp: String,
    pub recipe_id: String,
    /// SHA-256 over the canonical before/after counts.
    pub digest: String,
    pub improved: Vec<String>,
}

impl Attestation {
    fn stamp(recipe_id: &str, before: &MetricsSnapshot, after: &MetricsSnapshot, report: &GateReport) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: timestamp_id(),
            recipe_id: recipe_id.to_string(),
            digest: digest_counts(&before.counts, &after.counts),
            improved: report.improved.clone(),
        }
    }
}

/// Deterministic digest over the two count maps.  BTreeMap ordering makes
/// the serialization canonical.
fn digest_counts(before: &BTreeMap<String, u64>, after: &BTreeMap<String, u64>) -> String {
    let mut hasher = Sha256::new();
    for (name, count) in before {
        hasher.update(name.as_bytes());
        hasher.update(count.to_le_bytes());
    }
    hasher.update(b"->");
    for (name, count) in after {
        hasher.update(name.as_bytes());
        hasher.update(count.to_le_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub after: MetricsSnapshot,
    pub deltas: BTreeMap<String, i64>,
    pub report: GateReport,
    pub attestation: Option<Attestation>,
}

impl VerifyOutcome {
    /// An act "improved" the workspace when every gate passed and at least
    /// one detector count went down.  This is the signal learn feeds on.
    pub fn improved(&self) -> bool {
        self.report.overall_passed && !self.report.improved.is_empty()
    }
}

/// Re-observe and evaluate the gates.  Writes an attestation on a verified
/// improvement; a failed attestation write degrades to a log line, the
/// verdict stands either way.
pub fn verify(ws: &Workspace, recipe_id: &str, before: &MetricsSnapshot) -> VerifyOutcome {
    let after = observe(ws);
    let deltas = before.delta_to(&after);
    let gates = GateSet::load(ws);
    let report = evaluate(before, &after, &gates);

    let attestation = if report.overall_passed && !report.improved.is_empty() {
        let attestation = Attestation::stamp(recipe_id, before, &after, &report);
        let path = ws
            .reports_dir()
            .join(format!("verify-{}.json", attestation.timestamp));
        if let Err(e) = atomic_write_json(&path, &attestation) {
            tracing::warn!(error = %e, "could not write attestation");
        }
        Some(attestation)
    } else {
        None
    };

    VerifyOutcome {
        after,
        deltas,
        report,
        attestation,
    }
}
