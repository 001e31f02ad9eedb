//! Recipe model and loading.
//!
//! A recipe is a static JSON description of one automated fix: a list of
//! shell commands and/or file edits, optionally guarded by threshold
//! conditions on the observed metrics.  Recipes are authored by hand and
//! read-only at runtime; the only invariant is that ids are unique within
//! the recipes directory.

use std::collections::BTreeSet;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::{OdavlError, Result};
use crate::insight::MetricsSnapshot;
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

/// One threshold clause over the metrics object, e.g.
/// `{"metric": "typescript", "op": "gt", "value": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub op: ConditionOp,
    pub value: u64,
}

impl Condition {
    pub fn holds(&self, metrics: &MetricsSnapshot) -> bool {
        let actual = metrics.get(&self.metric);
        match self.op {
            ConditionOp::Gt => actual > self.value,
            ConditionOp::Gte => actual >= self.value,
            ConditionOp::Lt => actual < self.value,
            ConditionOp::Lte => actual <= self.value,
            ConditionOp::Eq => actual == self.value,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One step of a recipe.  `shell` runs a command; `edit` applies a literal
/// find/replace to a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecipeAction {
    Shell {
        command: String,
    },
    Edit {
        file: String,
        find: String,
        replace: String,
    },
}

impl RecipeAction {
    pub fn is_shell(&self) -> bool {
        matches!(self, RecipeAction::Shell { .. })
    }
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Seed trust for recipes the trust store has never seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<f64>,
    /// All clauses must hold for the recipe to be eligible.  Absent means
    /// "always eligible".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Vec<Condition>>,
    pub actions: Vec<RecipeAction>,
}

impl Recipe {
    pub fn matches(&self, metrics: &MetricsSnapshot) -> bool {
        match &self.condition {
            None => true,
            Some(clauses) => clauses.iter().all(|c| c.holds(metrics)),
        }
    }

    /// Files named by edit actions — the set the undo snapshot must capture.
    pub fn touched_files(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                RecipeAction::Edit { file, .. } => Some(file.clone()),
                RecipeAction::Shell { .. } => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load every `*.json` recipe in `.odavl/recipes/`, sorted by id.  A missing
/// directory reads as an empty list; a duplicate id is an error (the one
/// invariant recipes carry).
pub fn load_recipes(ws: &Workspace) -> Result<Vec<Recipe>> {
    let dir = ws.recipes_dir();
    let Ok(entries) = fs::read_dir(&dir) else {
        return Ok(Vec::new());
    };

    let mut recipes = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let body = fs::read_to_string(&path)?;
        let recipe: Recipe = serde_json::from_str(&body).map_err(|source| OdavlError::Json {
            path: path.clone(),
            source,
        })?;
        if !seen.insert(recipe.id.clone()) {
            return Err(OdavlError::InvalidRecipe {
                id: recipe.id,
                reason: "duplicate id in recipes directory".to_string(),
            });
        }
        recipes.push(recipe);
    }
    recipes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(recipes)
}
