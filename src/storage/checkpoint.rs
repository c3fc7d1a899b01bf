use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::core::error::{Error, Result};
use crate::index::inverted::InvertedIndex;

const MAGIC: &[u8; 8] = b"MCATSNP1";
const CHECKPOINT_FILE: &str = "index.snapshot";
// magic + crc32 + payload length
const HEADER_LEN: usize = 8 + 4 + 8;

#[derive(Serialize)]
struct CheckpointRef<'a> {
    version: u64,
    timestamp: DateTime<Utc>,
    index: &'a InvertedIndex,
}

/// A committed index state read back from disk
#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub index: InvertedIndex,
}

/// Persists the committed index as one checksummed file.
///
/// File layout: `[ MAGIC | crc32 (LE) | payload length (LE) | bincode payload ]`.
/// Saves go through a temporary file and a rename, so a crash mid-write
/// leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_dir: PathBuf,
}

impl SnapshotStore {
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| {
            Error::index_unavailable(format!("cannot create {}: {}", base_dir.display(), e))
        })?;
        Ok(SnapshotStore { base_dir })
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.base_dir.join(CHECKPOINT_FILE)
    }

    pub fn save(&self, version: u64, index: &InvertedIndex) -> Result<()> {
        let payload = bincode::serialize(&CheckpointRef {
            version,
            timestamp: Utc::now(),
            index,
        })?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let checksum = hasher.finalize();

        let mut data = Vec::with_capacity(HEADER_LEN + payload.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&checksum.to_le_bytes());
        data.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        data.extend_from_slice(&payload);

        let path = self.checkpoint_path();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, &path)?;

        info!(version, bytes = data.len(), path = %path.display(), "checkpoint written");
        Ok(())
    }

    /// `Ok(None)` when nothing was ever committed
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path();
        if !path.exists() {
            debug!(path = %path.display(), "no checkpoint to restore");
            return Ok(None);
        }

        let data = fs::read(&path)?;
        if data.len() < HEADER_LEN || &data[..8] != MAGIC {
            return Err(Error::index_unavailable(format!(
                "{} is not a catalog checkpoint", path.display()
            )));
        }

        let checksum = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&data[12..HEADER_LEN]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        let payload = &data[HEADER_LEN..];
        if payload.len() != len {
            return Err(Error::index_unavailable(format!(
                "{} is truncated: expected {} bytes, found {}", path.display(), len, payload.len()
            )));
        }

        let mut hasher = Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != checksum {
            return Err(Error::index_unavailable(format!(
                "{} failed checksum verification", path.display()
            )));
        }

        let checkpoint: Checkpoint = bincode::deserialize(payload)?;
        info!(version = checkpoint.version, records = checkpoint.index.live_count(), "checkpoint restored");
        Ok(Some(checkpoint))
    }
}
