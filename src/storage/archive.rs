//! Forecast archive
//!
//! Append-only log of completed forecasts in a sled tree. Keys are ids from
//! `sled::Db::generate_id` as big-endian bytes, so iteration order is
//! insertion order; values are JSON-serialized [`ForecastEntry`] records.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::types::ForecastEntry;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An archived forecast with its archive id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedForecast {
    pub id: u64,
    #[serde(flatten)]
    pub entry: ForecastEntry,
}

#[derive(Clone)]
pub struct ForecastArchive {
    db: Arc<sled::Db>,
}

impl ForecastArchive {
    /// Open or create the archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Append an entry, returning its id.
    ///
    /// No flush per write; sled flushes in the background.
    pub fn append(&self, entry: &ForecastEntry) -> Result<u64, ArchiveError> {
        let id = self.db.generate_id()?;
        let value = serde_json::to_vec(entry)?;
        self.db.insert(id.to_be_bytes(), value)?;
        Ok(id)
    }

    /// Most recent `limit` entries, newest first. Undecodable records are
    /// skipped.
    pub fn recent(&self, limit: usize) -> Vec<ArchivedForecast> {
        let mut entries = Vec::with_capacity(limit.min(self.count()));

        for item in self.db.iter().rev() {
            if entries.len() >= limit {
                break;
            }
            let Ok((key, value)) = item else { continue };
            let Ok(id_bytes) = <[u8; 8]>::try_from(key.as_ref()) else {
                continue;
            };
            let id = u64::from_be_bytes(id_bytes);
            match serde_json::from_slice::<ForecastEntry>(&value) {
                Ok(entry) => entries.push(ArchivedForecast { id, entry }),
                Err(e) => warn!(id, error = %e, "Skipping undecodable archive record"),
            }
        }

        entries
    }

    pub fn count(&self) -> usize {
        self.db.len()
    }

    pub fn flush(&self) -> Result<(), ArchiveError> {
        self.db.flush()?;
        Ok(())
    }
}
