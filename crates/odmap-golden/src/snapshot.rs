//! Snapshot management for golden tests
//!
//! Snapshots are named by `<category>/<case>` and stored as
//! `<snapshot_dir>/<category>/<case>.json`.

use crate::{GoldenError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Version written into new snapshots
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// A test snapshot containing the expected envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Name of the test, `<category>/<case>`
    pub name: String,

    /// Snapshot metadata
    pub metadata: SnapshotMetadata,

    /// The expected decision request
    pub content: Value,
}

/// Metadata about a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Version of the snapshot format
    pub version: String,

    /// When the snapshot was created
    pub created_at: String,

    /// When the snapshot was last updated
    pub updated_at: String,

    /// Description of what this tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Manages reading and writing snapshots
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    /// Create a new snapshot manager
    pub fn new(snapshot_dir: impl AsRef<Path>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.as_ref().to_path_buf(),
        }
    }

    /// Load a snapshot from disk
    pub fn load(&self, name: &str) -> Result<Snapshot> {
        let path = self.snapshot_path(name);

        if !path.exists() {
            return Err(GoldenError::CorpusError(format!(
                "Snapshot '{}' not found at {:?}",
                name, path
            )));
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a snapshot to disk
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.snapshot_path(&snapshot.name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');
        fs::write(&path, content)?;

        Ok(())
    }

    /// Replace the content of an existing snapshot, keeping a backup
    pub fn update(&self, name: &str, new_content: Value) -> Result<()> {
        let mut snapshot = self.load(name)?;
        self.backup(name)?;

        snapshot.content = new_content;
        snapshot.metadata.updated_at = Utc::now().to_rfc3339();

        self.save(&snapshot)
    }

    /// Create a new snapshot
    pub fn create(
        &self,
        name: &str,
        content: Value,
        description: Option<String>,
        tags: Vec<String>,
    ) -> Result<Snapshot> {
        let now = Utc::now().to_rfc3339();

        let snapshot = Snapshot {
            name: name.to_string(),
            metadata: SnapshotMetadata {
                version: SNAPSHOT_VERSION.to_string(),
                created_at: now.clone(),
                updated_at: now,
                description,
                tags,
            },
            content,
        };

        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Check if a snapshot exists
    pub fn exists(&self, name: &str) -> bool {
        self.snapshot_path(name).exists()
    }

    /// List all snapshot names, recursing into category directories
    pub fn list(&self) -> Result<Vec<String>> {
        let mut snapshots = Vec::new();

        if !self.snapshot_dir.exists() {
            return Ok(snapshots);
        }

        for entry in WalkDir::new(&self.snapshot_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            // Backups are `<case>.backup.<ts>.json`
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !stem.contains(".backup.") => stem,
                _ => continue,
            };
            let relative = path
                .parent()
                .and_then(|parent| parent.strip_prefix(&self.snapshot_dir).ok())
                .map(|dir| dir.join(name))
                .unwrap_or_else(|| PathBuf::from(name));
            snapshots.push(
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
            );
        }

        snapshots.sort();
        Ok(snapshots)
    }

    /// Delete a snapshot
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.snapshot_path(name);

        if path.exists() {
            fs::remove_file(path)?;
        }

        Ok(())
    }

    fn snapshot_path(&self, name: &str) -> PathBuf {
        let filename = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}.json", name)
        };

        self.snapshot_dir.join(filename)
    }

    /// Copy a snapshot aside before it is overwritten
    pub fn backup(&self, name: &str) -> Result<()> {
        let source = self.snapshot_path(name);

        if !source.exists() {
            return Ok(());
        }

        let backup_name = format!("{}.backup.{}", name, Utc::now().timestamp());
        fs::copy(source, self.snapshot_path(&backup_name))?;
        Ok(())
    }
}

/// Normalize JSON for comparison
///
/// Floats are rounded to six decimals. Object keys are sorted only when
/// `sort_keys` is set, since envelope key order is part of the contract.
pub fn normalize_json(value: &Value, sort_keys: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            if sort_keys {
                entries.sort_by_key(|(k, _)| k.as_str());
            }

            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, val)| (key.clone(), normalize_json(val, sort_keys)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| normalize_json(v, sort_keys)).collect()),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| (f * 1_000_000.0).round() / 1_000_000.0)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

/// Apply ignore fields to a JSON value
pub fn apply_ignores(value: &mut Value, ignore_fields: &[String]) {
    for field_path in ignore_fields {
        let parts: Vec<&str> = field_path.split('.').filter(|s| !s.is_empty()).collect();
        remove_field_recursive(value, &parts);
    }
}

fn remove_field_recursive(value: &mut Value, path_parts: &[&str]) {
    let Some((first, rest)) = path_parts.split_first() else {
        return;
    };

    match value {
        Value::Object(map) => {
            if rest.is_empty() {
                map.shift_remove(*first);
            } else if let Some(next_value) = map.get_mut(*first) {
                remove_field_recursive(next_value, rest);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                remove_field_recursive(item, path_parts);
            }
        }
        _ => {}
    }
}
