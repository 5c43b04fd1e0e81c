//! Snapshot files on disk
//!
//! The encoding follows the file extension: `.bin` / `.bincode` use bincode,
//! anything else is pretty-printed JSON.

use std::path::Path;

use thicket_core::{GraphStore, StoreConfig};
use tracing::debug;

use crate::error::Result;
use crate::snapshot::GraphSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Binary,
}

impl SnapshotFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") | Some("bincode") => SnapshotFormat::Binary,
            _ => SnapshotFormat::Json,
        }
    }
}

/// Write `snapshot` to `path`, creating parent directories as needed.
pub fn save_snapshot(snapshot: &GraphSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => serde_json::to_vec_pretty(snapshot)?,
        SnapshotFormat::Binary => bincode::serialize(snapshot)?,
    };
    std::fs::write(path, bytes)?;

    debug!("Snapshot saved: {}", path.display());
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let bytes = std::fs::read(path)?;
    let snapshot = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => serde_json::from_slice(&bytes)?,
        SnapshotFormat::Binary => bincode::deserialize(&bytes)?,
    };

    debug!("Snapshot loaded from: {}", path.display());
    Ok(snapshot)
}

/// Load a snapshot file into the main view of a fresh store.
pub fn load_store(path: &Path, config: StoreConfig) -> Result<GraphStore> {
    let snapshot = load_snapshot(path)?;
    let store = GraphStore::new(StoreConfig {
        directed: snapshot.directed,
        ..config
    });
    snapshot.restore_into(&mut store.main_view().write())?;
    Ok(store)
}
