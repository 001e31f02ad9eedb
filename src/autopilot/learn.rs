//! # Stage: Learn
//!
//! ## Responsibility
//! The only writer of trust state.  Folds one verified outcome into the
//! recipe's trust record (bounded running average, blacklist rule) and
//! appends one entry each to the two append-only logs:
//!
//! - `.odavl/history.json` — what ran and how it went
//! - `.odavl/trust-history.json` — the trust delta it produced

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::trust::{TrustRecord, TrustStore};
use crate::workspace::{append_json_array, timestamp_id, Workspace};

/// One line of `.odavl/history.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub recipe_id: String,
    pub improved: bool,
    pub deltas: BTreeMap<String, i64>,
    pub actions_failed: usize,
}

/// One line of `.odavl/trust-history.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustHistoryEntry {
    pub timestamp: String,
    pub recipe_id: String,
    pub runs: u32,
    pub success: u32,
    pub trust: f64,
    pub blacklisted: bool,
}

/// Update the ledger and both logs.  Returns the updated record.
pub fn learn(
    ws: &Workspace,
    store: &mut TrustStore,
    recipe_id: &str,
    seed_trust: Option<f64>,
    improved: bool,
    deltas: BTreeMap<String, i64>,
    actions_failed: usize,
) -> Result<TrustRecord> {
    let record = store.record_run(recipe_id, seed_trust, improved);
    store.save(ws)?;

    let timestamp = timestamp_id();
    append_json_array(
        &ws.history_file(),
        HistoryEntry {
            timestamp: timestamp.clone(),
            recipe_id: recipe_id.to_string(),
            improved,
            deltas,
            actions_failed,
        },
    )?;
    append_json_array(
        &ws.trust_history_file(),
        TrustHistoryEntry {
            timestamp,
            recipe_id: recipe_id.to_string(),
            runs: record.runs,
            success: record.success,
            trust: record.trust,
            blacklisted: record.blacklisted,
        },
    )?;

    if record.blacklisted {
        tracing::warn!(recipe = %recipe_id, "recipe blacklisted after repeated failures");
    }
    Ok(record)
}
