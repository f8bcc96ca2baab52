//! File-backed progress ledger.
//!
//! A flat append-only UTF-8 text file, one encoded partition key per line.
//! Appends go through a mutex and write the whole line in one call, so
//! concurrent workers never interleave mid-line. The file is never
//! rewritten or compacted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::ledger::{LedgerSnapshot, ProgressLedger};
use crate::domain::partition::PartitionKey;
use crate::error::{HarvestError, Result};

pub struct FileLedger {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the ledger file (and its parent directories) if absent.
    pub async fn ensure_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(HarvestError::Ledger)?;
            }
        }
        if fs::metadata(&self.path).await.is_err() {
            fs::write(&self.path, b"").await.map_err(HarvestError::Ledger)?;
            info!("Created progress ledger at {}", self.path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressLedger for FileLedger {
    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(LedgerSnapshot::from_lines(&content)),
            // First run: nothing crawled yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LedgerSnapshot::default()),
            Err(e) => Err(HarvestError::Ledger(e)),
        }
    }

    async fn mark_crawled(&self, key: &PartitionKey) -> Result<()> {
        let line = format!("{}\n", key.encode());
        let _guard = self.append_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(HarvestError::Ledger)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(HarvestError::Ledger)?;
        file.flush().await.map_err(HarvestError::Ledger)?;
        info!("Marked as crawled | {}", key.encode());
        Ok(())
    }
}
