//! Heuristic recipe risk scoring.
//!
//! There is no learned model here.  The predictor weighs a handful of fixed
//! features — action count, how many of those actions are shell commands,
//! the recipe's current failure streak, and how far its trust sits below
//! certainty — into a single risk score clamped to `[0, 1]`.  Decide drops
//! recipes whose risk exceeds the configured ceiling before ranking.

use crate::recipes::Recipe;
use crate::trust::TrustRecord;

// Feature weights.  Shell commands can touch anything, so they dominate;
// edits are bounded to one file each.
const WEIGHT_SHELL_ACTION: f64 = 0.15;
const WEIGHT_EDIT_ACTION: f64 = 0.05;
const WEIGHT_FAILURE_STREAK: f64 = 0.20;
const WEIGHT_TRUST_GAP: f64 = 0.30;

pub const DEFAULT_RISK_CEILING: f64 = 0.8;

/// The score plus the features that produced it, for logs.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub recipe_id: String,
    pub score: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TrustPredictor {
    pub risk_ceiling: f64,
}

impl Default for TrustPredictor {
    fn default() -> Self {
        Self {
            risk_ceiling: DEFAULT_RISK_CEILING,
        }
    }
}

impl TrustPredictor {
    pub fn new(risk_ceiling: f64) -> Self {
        Self {
            risk_ceiling: risk_ceiling.clamp(0.0, 1.0),
        }
    }

    /// Score one recipe against its trust record (if any).
    pub fn assess(&self, recipe: &Recipe, record: Option<&TrustRecord>) -> RiskAssessment {
        let mut score = 0.0;
        let mut factors = Vec::new();

        let shell_actions = recipe.actions.iter().filter(|a| a.is_shell()).count();
        let edit_actions = recipe.actions.len() - shell_actions;
        if shell_actions > 0 {
            score += shell_actions as f64 * WEIGHT_SHELL_ACTION;
            factors.push(format!("{shell_actions} shell action(s)"));
        }
        if edit_actions > 0 {
            score += edit_actions as f64 * WEIGHT_EDIT_ACTION;
            factors.push(format!("{edit_actions} edit action(s)"));
        }

        if let Some(record) = record {
            if record.consecutive_failures > 0 {
                // Streak saturates at the blacklist threshold.
                let streak = record.consecutive_failures.min(3) as f64 / 3.0;
                score += streak * WEIGHT_FAILURE_STREAK;
                factors.push(format!("{} consecutive failure(s)", record.consecutive_failures));
            }
            score += (1.0 - record.trust) * WEIGHT_TRUST_GAP;
        } else {
            // Unproven recipe: full trust gap against the midpoint seed.
            score += 0.5 * WEIGHT_TRUST_GAP;
            factors.push("no run history".to_string());
        }

        RiskAssessment {
            recipe_id: recipe.id.clone(),
            score: score.clamp(0.0, 1.0),
            factors,
        }
    }

    pub fn is_acceptable(&self, assessment: &RiskAssessment) -> bool {
        assessment.score <= self.risk_ceiling
    }
}
