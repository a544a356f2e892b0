//! JSON snapshot of the chain kept in the data directory.

use std::path::{Path, PathBuf};

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::Hash;

use crate::domain::block::Block;
use crate::domain::state::AccountNonces;
use crate::error::{ChainError, Result};

pub const SNAPSHOT_FILE: &str = "mockchain.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub block: Block,
    pub total_difficulty: U256,
    /// State after executing the block.
    pub state: AccountNonces,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub genesis_hash: Hash,
    pub head: Hash,
    pub blocks: Vec<StoredBlock>,
}

pub fn snapshot_path(datadir: &Path) -> PathBuf {
    datadir.join(SNAPSHOT_FILE)
}

/// `Ok(None)` when no snapshot has been written yet.
pub fn load(path: &Path) -> Result<Option<ChainSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read(path)?;
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| ChainError::Snapshot(format!("{}: {e}", path.display())))
}

/// Write to a sibling temp file, then rename over the old snapshot.
pub fn save(path: &Path, snapshot: &ChainSnapshot) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let encoded =
        serde_json::to_vec(snapshot).map_err(|e| ChainError::Snapshot(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, encoded)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&snapshot_path(dir.path())).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path());
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(load(&path), Err(ChainError::Snapshot(_))));
    }
}
