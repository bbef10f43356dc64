use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{CachedSnapshot, StandupPhase};

/// Per-user standup phase record, persisted next to the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhaseRecord {
    phase: StandupPhase,
    updated_at: DateTime<Utc>,
}

/// Whole-file JSON store for per-user GitHub snapshots and standup phase.
///
/// One record per user, overwritten wholesale on each store. Reads treat a
/// missing or malformed file as "no prior data". Writes for the same user
/// are not coordinated here; the orchestrator serializes turns per user,
/// and without that guard the last store wins.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, user_id: &str) -> CachedSnapshot {
        let path = self.snapshot_path(user_id);
        read_json(&path).unwrap_or_default()
    }

    pub fn store(&self, user_id: &str, snapshot: &CachedSnapshot) -> anyhow::Result<()> {
        let path = self.snapshot_path(user_id);
        write_json(&path, snapshot)?;
        debug!(user_id, path = %path.display(), "Stored snapshot");
        Ok(())
    }

    pub fn load_phase(&self, user_id: &str) -> StandupPhase {
        let path = self.phase_path(user_id);
        read_json::<PhaseRecord>(&path)
            .map(|record| record.phase)
            .unwrap_or_default()
    }

    pub fn store_phase(&self, user_id: &str, phase: StandupPhase) -> anyhow::Result<()> {
        let record = PhaseRecord {
            phase,
            updated_at: Utc::now(),
        };
        write_json(&self.phase_path(user_id), &record)
    }

    fn snapshot_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_user_id(user_id)))
    }

    fn phase_path(&self, user_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.phase.json", sanitize_user_id(user_id)))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None, // absence is valid
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed cache file, treating as empty");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Derive a safe filename stem from an opaque user identifier.
fn sanitize_user_id(user_id: &str) -> String {
    let sanitized: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.len() > 100 {
        sanitized[..100].to_string()
    } else if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}
