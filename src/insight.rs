//! # Stage: Observe
//!
//! ## Responsibility
//! Turn the workspace's current analysis state into a flat metrics object —
//! one issue count per detector category.  Three sources, tried in order:
//!
//! 1. `.odavl/insight.json` — the primary analyzer report
//! 2. `.odavl/insight/latest-analysis.json` — written by newer analyzers
//! 3. A fallback shallow scan of workspace source files
//!
//! A missing or unparsable report is never an error; it reads as "empty".
//! Each observe call also persists its snapshot to
//! `.odavl/metrics/latest-observe.json` for inspection.
//!
//! ## NOT Responsible For
//! - Running the real analyzers (an external tool writes the report)
//! - Deciding what to do about the counts (that is the decide step)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workspace::{atomic_write_json, now_ms, Workspace};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// A flat map of issue counts per detector category, captured at one instant.
/// Schema-free: unknown detector names from the report are kept verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub timestamp_ms: u64,
    pub counts: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn new(counts: BTreeMap<String, u64>) -> Self {
        Self {
            timestamp_ms: now_ms(),
            counts,
        }
    }

    /// Count for one detector; unknown detectors read as zero.
    pub fn get(&self, detector: &str) -> u64 {
        if detector == "total" {
            return self.total();
        }
        self.counts.get(detector).copied().unwrap_or(0)
    }

    /// Sum of all detector counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Per-detector signed deltas, `after - before`.  Detectors present in
    /// either snapshot appear in the result.
    pub fn delta_to(&self, after: &MetricsSnapshot) -> BTreeMap<String, i64> {
        let mut deltas = BTreeMap::new();
        for name in self.counts.keys().chain(after.counts.keys()) {
            let before = self.get(name) as i64;
            let now = after.get(name) as i64;
            deltas.entry(name.clone()).or_insert(now - before);
        }
        deltas
    }
}

// ---------------------------------------------------------------------------
// Observe
// ---------------------------------------------------------------------------

/// Produce a fresh metrics snapshot for the workspace and persist it to
/// `.odavl/metrics/latest-observe.json`.
pub fn observe(ws: &Workspace) -> MetricsSnapshot {
    let snapshot = read_report(&ws.insight_report())
        .or_else(|| read_report(&ws.insight_latest()))
        .unwrap_or_else(|| shallow_scan(ws.root()));

    if let Err(e) = atomic_write_json(&ws.latest_observe_file(), &snapshot) {
        tracing::warn!(error = %e, "could not persist observe snapshot");
    }
    snapshot
}

/// Parse an analyzer report into counts.  Two shapes are accepted:
///
/// - `{"detectors": {"typescript": {"issues": [...]}, ...}}`
/// - `{"issues": [{"detector": "typescript", ...}, ...]}`
///
/// Returns `None` when the file is missing or neither shape matches.
fn read_report(path: &Path) -> Option<MetricsSnapshot> {
    let body = fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&body).ok()?;

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    if let Some(detectors) = value.get("detectors").and_then(|d| d.as_object()) {
        for (name, entry) in detectors {
            let n = entry
                .get("issues")
                .and_then(|i| i.as_array())
                .map(|a| a.len() as u64)
                .or_else(|| entry.as_u64())
                .unwrap_or(0);
            counts.insert(name.clone(), n);
        }
    } else if let Some(issues) = value.get("issues").and_then(|i| i.as_array()) {
        for issue in issues {
            let detector = issue
                .get("detector")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown")
                .to_string();
            *counts.entry(detector).or_insert(0) += 1;
        }
    } else {
        return None;
    }

    Some(MetricsSnapshot::new(counts))
}

// ---------------------------------------------------------------------------
// Fallback shallow scan
// ---------------------------------------------------------------------------

const SOURCE_EXTENSIONS: &[&str] = &["rs", "ts", "tsx", "js", "jsx", "py", "go", "java"];
const SKIP_DIRS: &[&str] = &[".git", ".odavl", "node_modules", "target", "dist", "reports"];

/// When no analyzer report exists, walk the workspace and count the cheap
/// signals we can detect without a real analyzer: TODO/FIXME markers,
/// oversized files, and leftover debug prints.
pub fn shallow_scan(root: &Path) -> MetricsSnapshot {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    scan_dir(root, &mut counts, 0);
    MetricsSnapshot::new(counts)
}

fn scan_dir(dir: &Path, counts: &mut BTreeMap<String, u64>, depth: usize) {
    // Depth guard against symlink cycles.
    if depth > 16 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if !SKIP_DIRS.contains(&name.as_str()) {
                scan_dir(&path, counts, depth + 1);
            }
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }
        let Ok(body) = fs::read_to_string(&path) else {
            continue;
        };
        scan_file(&body, counts);
    }
}

fn scan_file(body: &str, counts: &mut BTreeMap<String, u64>) {
    let mut lines = 0u64;
    for line in body.lines() {
        lines += 1;
        if line.contains("TODO") || line.contains("FIXME") {
            *counts.entry("todo".to_string()).or_insert(0) += 1;
        }
        if line.contains("console.log(") || line.contains("dbg!(") {
            *counts.entry("debug".to_string()).or_insert(0) += 1;
        }
    }
    if lines > 600 {
        *counts.entry("complexity".to_string()).or_insert(0) += 1;
    }
}
