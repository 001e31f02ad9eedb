//! # Stage: Decide
//!
//! ## Responsibility
//! Pick the next recipe to run, or `noop`.  A recipe is eligible when its
//! condition clauses all hold against the observed metrics, its trust record
//! is not blacklisted, and its predicted risk is under the ceiling.
//! Eligible recipes rank by trust descending, ties broken by id so the
//! ordering is stable run to run.
//!
//! ## NOT Responsible For
//! - Executing anything (act)
//! - Mutating trust (learn owns every write to the ledger)

use crate::autopilot::predictor::TrustPredictor;
use crate::insight::MetricsSnapshot;
use crate::recipes::Recipe;
use crate::trust::TrustStore;

/// The outcome of the decide step.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Nothing eligible; the cycle ends here.
    Noop,
    /// Run this recipe.
    Run { recipe_id: String, trust: f64 },
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Noop => write!(f, "noop"),
            Decision::Run { recipe_id, trust } => {
                write!(f, "{} (trust {:.2})", recipe_id, trust)
            }
        }
    }
}

impl Decision {
    pub fn recipe_id(&self) -> Option<&str> {
        match self {
            Decision::Noop => None,
            Decision::Run { recipe_id, .. } => Some(recipe_id),
        }
    }
}

/// Filter, rank, and pick.
pub fn decide(
    metrics: &MetricsSnapshot,
    recipes: &[Recipe],
    store: &TrustStore,
    predictor: &TrustPredictor,
) -> Decision {
    let mut eligible: Vec<(&Recipe, f64)> = Vec::new();

    for recipe in recipes {
        if !recipe.matches(metrics) {
            continue;
        }
        if store.is_blacklisted(&recipe.id) {
            tracing::debug!(recipe = %recipe.id, "skipping blacklisted recipe");
            continue;
        }
        let assessment = predictor.assess(recipe, store.get(&recipe.id));
        if !predictor.is_acceptable(&assessment) {
            tracing::debug!(
                recipe = %recipe.id,
                risk = assessment.score,
                "skipping recipe above risk ceiling"
            );
            continue;
        }
        eligible.push((recipe, store.effective_trust(&recipe.id, recipe.trust)));
    }

    // Trust descending, id ascending on ties.
    eligible.sort_by(|(a, ta), (b, tb)| {
        tb.partial_cmp(ta)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    match eligible.first() {
        None => Decision::Noop,
        Some((recipe, trust)) => Decision::Run {
            recipe_id: recipe.id.clone(),
            trust: *trust,
        },
    }
}
