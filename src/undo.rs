//! # Stage: Undo Snapshots
//!
//! ## Responsibility
//! Point-in-time copies of the files a recipe is about to touch, so any act
//! can be reversed by overwrite.  One snapshot is written before every act:
//! `.odavl/undo/<timestamp>.json`, mirrored to `.odavl/undo/latest.json`.
//! A `null` entry records that the file did not exist yet, so restoring
//! deletes whatever the act created.
//!
//! Retention: after each capture the directory is pruned to the 10 most
//! recent snapshots (`latest.json` aside).
//!
//! ## Guarantees
//! - Written atomically; a kill mid-capture cannot corrupt an older snapshot
//! - Restore is overwrite-only: it never merges and never runs commands

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OdavlError, Result};
use crate::workspace::{atomic_write_json, timestamp_id, Workspace};

pub const KEEP_SNAPSHOTS: usize = 10;

// ---------------------------------------------------------------------------
// UndoSnapshot
// ---------------------------------------------------------------------------

/// Full-content copy of the files an act is about to modify.  Field names
/// stay camelCase on disk for compatibility with existing tooling that reads
/// the undo directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UndoSnapshot {
    pub timestamp: String,
    pub modified_files: Vec<String>,
    /// Workspace-relative path → captured content, `None` for "did not exist".
    pub data: BTreeMap<String, Option<String>>,
}

impl UndoSnapshot {
    /// Capture the current content of `files` (workspace-relative paths).
    pub fn capture(ws: &Workspace, files: &[String]) -> Self {
        let mut data = BTreeMap::new();
        for file in files {
            let content = fs::read_to_string(ws.root().join(file)).ok();
            data.insert(file.clone(), content);
        }
        Self {
            timestamp: timestamp_id(),
            modified_files: files.to_vec(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// UndoRegistry
// ---------------------------------------------------------------------------

/// Reads and writes the `.odavl/undo/` directory.
pub struct UndoRegistry<'a> {
    ws: &'a Workspace,
}

impl<'a> UndoRegistry<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        Self { ws }
    }

    /// Snapshot `files` and persist under a fresh timestamp id.  Returns the
    /// id.  Also rewrites `latest.json` and prunes old snapshots.
    pub fn capture(&self, files: &[String]) -> Result<String> {
        let snapshot = UndoSnapshot::capture(self.ws, files);
        let id = snapshot.timestamp.clone();
        let dir = self.ws.undo_dir();
        atomic_write_json(&dir.join(format!("{id}.json")), &snapshot)?;
        atomic_write_json(&dir.join("latest.json"), &snapshot)?;
        self.prune()?;
        Ok(id)
    }

    /// Snapshot ids on disk, oldest first.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.ws.undo_dir()) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .filter(|id| id != "latest")
            .collect();
        ids.sort();
        ids
    }

    /// Load one snapshot by id, or the latest when `id` is `None`.
    pub fn load(&self, id: Option<&str>) -> Result<UndoSnapshot> {
        let name = id.unwrap_or("latest");
        let path = self.ws.undo_dir().join(format!("{name}.json"));
        let body = fs::read_to_string(&path)
            .map_err(|_| OdavlError::SnapshotNotFound(name.to_string()))?;
        serde_json::from_str(&body).map_err(|source| OdavlError::Json { path, source })
    }

    /// Restore a snapshot by overwrite.  Captured content is written back;
    /// a `None` entry deletes the file the act created.  Returns the number
    /// of files restored.
    pub fn restore(&self, id: Option<&str>) -> Result<usize> {
        let snapshot = self.load(id)?;
        let mut restored = 0;
        for (file, content) in &snapshot.data {
            let target = self.ws.root().join(file);
            match content {
                Some(body) => {
                    crate::workspace::atomic_write(&target, body.as_bytes())?;
                }
                None => {
                    let _ = fs::remove_file(&target);
                }
            }
            restored += 1;
        }
        Ok(restored)
    }

    fn prune(&self) -> Result<()> {
        let ids = self.list();
        if ids.len() <= KEEP_SNAPSHOTS {
            return Ok(());
        }
        for stale in &ids[..ids.len() - KEEP_SNAPSHOTS] {
            remove_snapshot_file(&self.ws.undo_dir(), stale);
        }
        Ok(())
    }
}

fn remove_snapshot_file(dir: &Path, id: &str) {
    let _ = fs::remove_file(dir.join(format!("{id}.json")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, Workspace) {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path());
        (dir, ws)
    }

    #[test]
    fn test_capture_existing_and_missing_files() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("a.txt"), "alpha").expect("write");
        let snap = UndoSnapshot::capture(&ws, &["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(snap.data["a.txt"], Some("alpha".to_string()));
        assert_eq!(snap.data["b.txt"], None);
        assert_eq!(snap.modified_files.len(), 2);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let snap = UndoSnapshot {
            timestamp: "t".to_string(),
            modified_files: vec!["x".to_string()],
            data: BTreeMap::new(),
        };
        let json = serde_json::to_string(&snap).expect("serialize");
        assert!(json.contains("modifiedFiles"));
        assert!(!json.contains("modified_files"));
    }

    #[test]
    fn test_registry_capture_writes_id_and_latest() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("a.txt"), "alpha").expect("write");
        let reg = UndoRegistry::new(&ws);
        let id = reg.capture(&["a.txt".to_string()]).expect("capture");
        assert!(ws.undo_dir().join(format!("{id}.json")).exists());
        assert!(ws.undo_dir().join("latest.json").exists());
        assert_eq!(reg.list(), vec![id]);
    }

    #[test]
    fn test_restore_overwrites_changed_file() {
        let (_dir, ws) = scratch();
        fs::write(ws.root().join("a.txt"), "before").expect("write");
        let reg = UndoRegistry::new(&ws);
        let id = reg.capture(&["a.txt".to_string()]).expect("capture");

        fs::write(ws.root().join("a.txt"), "mangled").expect("write");
        let restored = reg.restore(Some(&id)).expect("restore");
        assert_eq!(restored, 1);
        assert_eq!(fs::read_to_string(ws.root().join("a.txt")).expect("read"), "before");
    }

    #[test]
    fn test_restore_deletes_file_that_did_not_exist() {
        let (_dir, ws) = scratch();
        let reg = UndoRegistry::new(&ws);
        reg.capture(&["new.txt".to_string()]).expect("capture");

        fs::write(ws.root().join("new.txt"), "created by act").expect("write");
        reg.restore(None).expect("restore latest");
        assert!(!ws.root().join("new.txt").exists());
    }

    #[test]
    fn test_restore_unknown_id_is_error() {
        let (_dir, ws) = scratch();
        let reg = UndoRegistry::new(&ws);
        assert!(matches!(
            reg.restore(Some("20990101-000000-000")),
            Err(OdavlError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_prune_keeps_last_ten() {
        let (_dir, ws) = scratch();
        let reg = UndoRegistry::new(&ws);
        // Snapshot ids are millisecond-resolution timestamps; write enough
        // synthetic ones to trigger pruning without racing the clock.
        for i in 0..14 {
            let snap = UndoSnapshot {
                timestamp: format!("20260101-000000-{i:03}"),
                modified_files: vec![],
                data: BTreeMap::new(),
            };
            atomic_write_json(
                &ws.undo_dir().join(format!("{}.json", snap.timestamp)),
                &snap,
            )
            .expect("write");
        }
        fs::write(ws.root().join("a.txt"), "x").expect("write");
        reg.capture(&["a.txt".to_string()]).expect("capture");

        let ids = reg.list();
        assert_eq!(ids.len(), KEEP_SNAPSHOTS);
        assert!(!ids.contains(&"20260101-000000-000".to_string()));
    }

    #[test]
    fn test_list_excludes_latest_marker() {
        let (_dir, ws) = scratch();
        let reg = UndoRegistry::new(&ws);
        fs::write(ws.root().join("a.txt"), "x").expect("write");
        reg.capture(&["a.txt".to_string()]).expect("capture");
        assert!(!reg.list().contains(&"latest".to_string()));
    }
}
