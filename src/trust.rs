//! # Stage: Trust Store
//!
//! ## Responsibility
//! The per-recipe success ledger.  Each record tracks run and success counts
//! and a trust score recomputed as `success / runs` clamped to `[0.1, 1.0]`
//! on every update.  Three consecutive failures blacklist a recipe; the
//! blacklist is sticky until an operator clears the record by hand.
//!
//! Persisted as a flat JSON array at `.odavl/recipes-trust.json` — no
//! indexing, rewritten whole on every save (atomically).
//!
//! ## Guarantees
//! - Bounded: trust never leaves `[0.1, 1.0]` once a recipe has run
//! - Mutated only by the learn step; decide reads it, never writes

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::workspace::{atomic_write_json, read_json_or_default, Workspace};

pub const TRUST_FLOOR: f64 = 0.1;
pub const TRUST_CEILING: f64 = 1.0;
pub const BLACKLIST_STREAK: u32 = 3;

/// Trust a recipe starts with before its first run, unless the recipe file
/// seeds its own.
pub const DEFAULT_SEED_TRUST: f64 = 0.5;

// ---------------------------------------------------------------------------
// TrustRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustRecord {
    pub id: String,
    pub runs: u32,
    pub success: u32,
    pub trust: f64,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub blacklisted: bool,
}

impl TrustRecord {
    pub fn new(id: impl Into<String>, seed_trust: f64) -> Self {
        Self {
            id: id.into(),
            runs: 0,
            success: 0,
            trust: seed_trust.clamp(TRUST_FLOOR, TRUST_CEILING),
            consecutive_failures: 0,
            blacklisted: false,
        }
    }

    /// Fold one run outcome into the record.
    pub fn record_run(&mut self, improved: bool) {
        self.runs += 1;
        if improved {
            self.success += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= BLACKLIST_STREAK {
                self.blacklisted = true;
            }
        }
        self.trust = (f64::from(self.success) / f64::from(self.runs))
            .clamp(TRUST_FLOOR, TRUST_CEILING);
    }
}

// ---------------------------------------------------------------------------
// TrustStore
// ---------------------------------------------------------------------------

/// The full trust ledger, loaded from and saved to
/// `.odavl/recipes-trust.json`.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    records: Vec<TrustRecord>,
}

impl TrustStore {
    pub fn load(ws: &Workspace) -> Self {
        Self {
            records: read_json_or_default(&ws.trust_file()),
        }
    }

    pub fn save(&self, ws: &Workspace) -> Result<()> {
        atomic_write_json(&ws.trust_file(), &self.records)
    }

    pub fn get(&self, id: &str) -> Option<&TrustRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Trust used for ranking: the stored score when the recipe has history,
    /// otherwise the recipe's own seed (or the global default).
    pub fn effective_trust(&self, id: &str, seed: Option<f64>) -> f64 {
        match self.get(id) {
            Some(record) => record.trust,
            None => seed
                .unwrap_or(DEFAULT_SEED_TRUST)
                .clamp(TRUST_FLOOR, TRUST_CEILING),
        }
    }

    pub fn is_blacklisted(&self, id: &str) -> bool {
        self.get(id).is_some_and(|r| r.blacklisted)
    }

    /// Fold one run outcome into the ledger, creating the record on first
    /// contact.  Returns a copy of the updated record.
    pub fn record_run(&mut self, id: &str, seed: Option<f64>, improved: bool) -> TrustRecord {
        let idx = match self.records.iter().position(|r| r.id == id) {
            Some(i) => i,
            None => {
                self.records
                    .push(TrustRecord::new(id, seed.unwrap_or(DEFAULT_SEED_TRUST)));
                self.records.len() - 1
            }
        };
        self.records[idx].record_run(improved);
        self.records[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TrustRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    // -----------------------------------------------------------------------
    // TrustRecord
    // -----------------------------------------------------------------------

    #[test]
    fn test_new_record_clamps_seed() {
        assert_eq!(TrustRecord::new("r", 5.0).trust, TRUST_CEILING);
        assert_eq!(TrustRecord::new("r", -1.0).trust, TRUST_FLOOR);
    }

    #[test]
    fn test_success_ratio() {
        let mut r = TrustRecord::new("r", 0.5);
        r.record_run(true);
        r.record_run(true);
        r.record_run(false);
        assert_eq!(r.runs, 3);
        assert_eq!(r.success, 2);
        assert!((r.trust - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_failures_floor_at_point_one() {
        let mut r = TrustRecord::new("r", 0.9);
        for _ in 0..5 {
            r.record_run(false);
        }
        assert_eq!(r.trust, TRUST_FLOOR);
    }

    #[test]
    fn test_three_consecutive_failures_blacklist() {
        let mut r = TrustRecord::new("r", 0.5);
        r.record_run(false);
        r.record_run(false);
        assert!(!r.blacklisted);
        r.record_run(false);
        assert!(r.blacklisted);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut r = TrustRecord::new("r", 0.5);
        r.record_run(false);
        r.record_run(false);
        r.record_run(true);
        r.record_run(false);
        r.record_run(false);
        assert!(!r.blacklisted, "streak broken by a success should not blacklist");
    }

    #[test]
    fn test_blacklist_is_sticky() {
        let mut r = TrustRecord::new("r", 0.5);
        for _ in 0..3 {
            r.record_run(false);
        }
        r.record_run(true);
        assert!(r.blacklisted, "a later success does not clear the blacklist");
    }

    proptest! {
        #[test]
        fn prop_trust_stays_in_bounds(outcomes in proptest::collection::vec(any::<bool>(), 1..100)) {
            let mut r = TrustRecord::new("r", 0.5);
            for improved in outcomes {
                r.record_run(improved);
                prop_assert!(r.trust >= TRUST_FLOOR && r.trust <= TRUST_CEILING);
            }
        }
    }

    // -----------------------------------------------------------------------
    // TrustStore
    // -----------------------------------------------------------------------

    #[test]
    fn test_effective_trust_unseen_uses_seed() {
        let store = TrustStore::default();
        assert_eq!(store.effective_trust("new", Some(0.8)), 0.8);
        assert_eq!(store.effective_trust("new", None), DEFAULT_SEED_TRUST);
    }

    #[test]
    fn test_effective_trust_seen_ignores_seed() {
        let mut store = TrustStore::default();
        store.record_run("r", None, true);
        assert_eq!(store.effective_trust("r", Some(0.2)), TRUST_CEILING);
    }

    #[test]
    fn test_record_run_creates_on_first_contact() {
        let mut store = TrustStore::default();
        assert!(store.get("r").is_none());
        let record = store.record_run("r", Some(0.6), true);
        assert_eq!(record.runs, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_is_blacklisted_unknown_recipe_false() {
        assert!(!TrustStore::default().is_blacklisted("ghost"));
    }

    #[test]
    fn test_store_round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path());
        let mut store = TrustStore::default();
        store.record_run("a", None, true);
        store.record_run("b", None, false);
        store.save(&ws).expect("save");

        let loaded = TrustStore::load(&ws);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("a").expect("a").success, 1);
        assert_eq!(loaded.get("b").expect("b").consecutive_failures, 1);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path());
        assert!(TrustStore::load(&ws).is_empty());
    }
}
