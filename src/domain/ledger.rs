//! Progress ledger abstraction.
//!
//! The ledger is the only durable state in the system: one encoded
//! partition key per line, append-only, never rewritten. Membership is
//! tested against a snapshot loaded once per combination so tight
//! refinement loops never re-read the file, and an ancestor entry subsumes
//! every key refined from it.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::partition::PartitionKey;
use crate::error::Result;

/// Point-in-time view of the ledger content. Staleness against concurrent
/// writers costs at most a duplicate fetch, never corruption.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    entries: HashSet<String>,
}

impl LedgerSnapshot {
    pub fn from_lines(content: &str) -> Self {
        Self {
            entries: content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// True when the key itself or any ancestor in its refinement chain is
    /// recorded: ancestor completion subsumes descendant completion.
    pub fn is_crawled(&self, key: &PartitionKey) -> bool {
        key.self_and_ancestors()
            .iter()
            .any(|k| self.entries.contains(&k.encode()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Durable record of completed partitions. File-backed in production,
/// in-memory in tests; injected everywhere it is needed.
#[async_trait]
pub trait ProgressLedger: Send + Sync {
    /// Loads the current ledger content. A missing backing store reads as
    /// an empty snapshot, never an error.
    async fn snapshot(&self) -> Result<LedgerSnapshot>;

    /// Appends the key as one whole line. Idempotent in effect: duplicate
    /// lines are harmless because membership is set-based.
    async fn mark_crawled(&self, key: &PartitionKey) -> Result<()>;
}

/// Set-backed ledger for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: RwLock<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &PartitionKey) -> bool {
        self.entries.read().await.contains(&key.encode())
    }
}

#[async_trait]
impl ProgressLedger for MemoryLedger {
    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            entries: self.entries.read().await.clone(),
        })
    }

    async fn mark_crawled(&self, key: &PartitionKey) -> Result<()> {
        self.entries.write().await.insert(key.encode());
        Ok(())
    }
}
