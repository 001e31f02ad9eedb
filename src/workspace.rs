//! Workspace layout and state-file I/O.
//!
//! Every path the tool reads or writes lives under two roots: the `.odavl/`
//! state directory and the `reports/` output directory.  Centralizing them
//! here lets tests point the whole tool at a temp directory.
//!
//! All state-file writes go through [`atomic_write`] (temp file plus rename)
//! so a process kill mid-write cannot leave a half-written trust store or
//! undo snapshot behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Resolved paths for one workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn odavl_dir(&self) -> PathBuf {
        self.root.join(".odavl")
    }

    /// Primary analysis report location.
    pub fn insight_report(&self) -> PathBuf {
        self.odavl_dir().join("insight.json")
    }

    /// Secondary analysis report location (written by newer analyzers).
    pub fn insight_latest(&self) -> PathBuf {
        self.odavl_dir().join("insight").join("latest-analysis.json")
    }

    pub fn recipes_dir(&self) -> PathBuf {
        self.odavl_dir().join("recipes")
    }

    pub fn trust_file(&self) -> PathBuf {
        self.odavl_dir().join("recipes-trust.json")
    }

    pub fn gates_file(&self) -> PathBuf {
        self.odavl_dir().join("gates.yml")
    }

    pub fn undo_dir(&self) -> PathBuf {
        self.odavl_dir().join("undo")
    }

    pub fn history_file(&self) -> PathBuf {
        self.odavl_dir().join("history.json")
    }

    pub fn trust_history_file(&self) -> PathBuf {
        self.odavl_dir().join("trust-history.json")
    }

    pub fn latest_observe_file(&self) -> PathBuf {
        self.odavl_dir().join("metrics").join("latest-observe.json")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Write `bytes` to `path` via a temp file in the same directory, then rename.
/// The temp filename includes the PID to avoid cross-process collisions.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| crate::error::OdavlError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &body)
}

// ---------------------------------------------------------------------------
// Swallow-to-default reads
// ---------------------------------------------------------------------------

/// Read and parse a JSON file, treating a missing or unparsable file as the
/// type's default.  This is the uniform I/O-boundary policy: state files are
/// allowed to not exist yet.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read_to_string(path) {
        Ok(body) => serde_json::from_str(&body).unwrap_or_default(),
        Err(_) => T::default(),
    }
}

/// Append one entry to an append-only JSON array file.
pub fn append_json_array<T: Serialize>(path: &Path, entry: T) -> Result<()> {
    let mut entries: Vec<serde_json::Value> = read_json_or_default(path);
    let value = serde_json::to_value(entry).map_err(|source| crate::error::OdavlError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    entries.push(value);
    atomic_write_json(path, &entries)
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Sortable timestamp id used for undo snapshots and report filenames,
/// e.g. `20260807-142530-123`.
pub fn timestamp_id() -> String {
    chrono::Utc::now().format("%Y%m%d-%H%M%S-%3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_paths_live_under_root() {
        let ws = Workspace::new("/tmp/project");
        assert!(ws.trust_file().starts_with("/tmp/project/.odavl"));
        assert!(ws.reports_dir().starts_with("/tmp/project"));
        assert!(ws.insight_latest().ends_with("insight/latest-analysis.json"));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("a/b/c.json");
        atomic_write(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("state.json");
        atomic_write(&path, b"[1,2]").expect("write");
        let names: Vec<String> = fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["state.json".to_string()]);
    }

    #[test]
    fn test_read_json_or_default_missing_file() {
        let v: Vec<u32> = read_json_or_default(Path::new("/nonexistent/nope.json"));
        assert!(v.is_empty());
    }

    #[test]
    fn test_read_json_or_default_corrupt_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").expect("write");
        let v: Vec<u32> = read_json_or_default(&path);
        assert!(v.is_empty());
    }

    #[test]
    fn test_append_json_array_accumulates() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("log.json");
        append_json_array(&path, serde_json::json!({"n": 1})).expect("append");
        append_json_array(&path, serde_json::json!({"n": 2})).expect("append");
        let entries: Vec<serde_json::Value> = read_json_or_default(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["n"], 2);
    }

    #[test]
    fn test_now_ms_is_reasonable() {
        // After 2023-11-01
        assert!(now_ms() > 1_700_000_000_000);
    }

    #[test]
    fn test_timestamp_id_is_sortable_format() {
        let id = timestamp_id();
        assert_eq!(id.len(), "20260807-142530-123".len());
        assert!(id.chars().all(|c| c.is_ascii_digit() || c == '-'));
    }
}
