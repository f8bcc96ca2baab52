//! Adaptive crawl-space partitioning.
//!
//! For each (university, year) combination the planner decides whether the
//! aggregate result page fits under the site's display ceiling or the query
//! must be subdivided along the configured refinement dimensions. The
//! progress ledger is consulted before every search and updated only in
//! child-before-parent order, so a crash mid-refinement can never leave a
//! false "fully crawled" mark behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::crawling::executor::SearchExecutor;
use crate::domain::dimensions::{DimensionValue, Dimensions, RefinementKind};
use crate::domain::ledger::{LedgerSnapshot, ProgressLedger};
use crate::domain::partition::PartitionKey;
use crate::error::{HarvestError, Result};
use crate::infrastructure::artifacts::ArtifactWriter;
use crate::infrastructure::config::OverflowPolicy;

/// One refinement dimension with the values enumerated for this run.
/// Strategies are tried in list order; the planner iterates them
/// generically instead of hand-coding each dimension.
#[derive(Debug, Clone)]
pub struct RefinementStrategy {
    pub kind: RefinementKind,
    pub values: Vec<DimensionValue>,
}

impl RefinementStrategy {
    pub fn build(order: &[RefinementKind], dims: &Dimensions) -> Vec<Self> {
        order
            .iter()
            .map(|&kind| Self {
                kind,
                values: dims.values_for(kind).to_vec(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// The ledger already covers this key; no network call was made.
    AlreadyCrawled,
    /// Zero records: terminal, marked crawled without an artifact.
    Empty,
    /// At or under the ceiling: artifact persisted, key marked.
    Accepted { record_count: u64 },
    /// Over the ceiling: aggregate artifact persisted unmarked, every
    /// child attempted, then the key marked.
    Refined { children: usize },
}

/// Counters for one planner's lifetime, shared across subworkers.
#[derive(Debug, Default)]
pub struct PlannerStats {
    searches: AtomicU64,
    skipped: AtomicU64,
    accepted: AtomicU64,
    empty: AtomicU64,
    refined: AtomicU64,
    failed_children: AtomicU64,
}

impl PlannerStats {
    pub fn searches(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> String {
        format!(
            "searches={} skipped={} accepted={} empty={} refined={} failed_children={}",
            self.searches.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.accepted.load(Ordering::Relaxed),
            self.empty.load(Ordering::Relaxed),
            self.refined.load(Ordering::Relaxed),
            self.failed_children.load(Ordering::Relaxed),
        )
    }
}

pub struct PartitionPlanner {
    executor: SearchExecutor,
    ledger: Arc<dyn ProgressLedger>,
    writer: ArtifactWriter,
    strategies: Vec<RefinementStrategy>,
    ceiling: u64,
    overflow_policy: OverflowPolicy,
    subworkers: usize,
    stats: PlannerStats,
}

impl PartitionPlanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        executor: SearchExecutor,
        ledger: Arc<dyn ProgressLedger>,
        writer: ArtifactWriter,
        strategies: Vec<RefinementStrategy>,
        ceiling: u64,
        overflow_policy: OverflowPolicy,
        subworkers: usize,
    ) -> Self {
        Self {
            executor,
            ledger,
            writer,
            strategies,
            ceiling,
            overflow_policy,
            subworkers,
            stats: PlannerStats::default(),
        }
    }

    pub fn stats(&self) -> &PlannerStats {
        &self.stats
    }

    /// Processes one (university, year) combination against the given
    /// ledger snapshot.
    pub async fn plan(
        &self,
        university: &DimensionValue,
        year: &str,
        snapshot: &LedgerSnapshot,
    ) -> Result<PartitionOutcome> {
        let root = PartitionKey::new(university.clone(), year);
        self.crawl_partition(root, &self.strategies, snapshot).await
    }

    fn crawl_partition<'a>(
        &'a self,
        key: PartitionKey,
        strategies: &'a [RefinementStrategy],
        snapshot: &'a LedgerSnapshot,
    ) -> BoxFuture<'a, Result<PartitionOutcome>> {
        async move {
            // Fast path: one set lookup against the snapshot, never a
            // fresh ledger read per dimension value.
            if snapshot.is_crawled(&key) {
                debug!("Already crawled, skipping | {}", key);
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                return Ok(PartitionOutcome::AlreadyCrawled);
            }

            self.stats.searches.fetch_add(1, Ordering::Relaxed);
            let outcome = self.executor.search(&key).await?;

            if outcome.record_count == 0 {
                // An empty result is a terminal, not a failure.
                self.ledger.mark_crawled(&key).await?;
                self.stats.empty.fetch_add(1, Ordering::Relaxed);
                info!("No records, marked terminal | {}", key);
                return Ok(PartitionOutcome::Empty);
            }

            if outcome.record_count <= self.ceiling {
                self.writer.persist(&key, &outcome.html).await?;
                self.ledger.mark_crawled(&key).await?;
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                return Ok(PartitionOutcome::Accepted {
                    record_count: outcome.record_count,
                });
            }

            warn!(
                "Record count {} exceeds ceiling {} | {}",
                outcome.record_count, self.ceiling, key
            );
            // The aggregate listing is useful even though incomplete;
            // persist it, but the key stays unmarked.
            self.writer.persist(&key, &outcome.html).await?;

            if key.depth() >= 1 && self.overflow_policy == OverflowPolicy::Fail {
                return Err(HarvestError::PartitionOverflow {
                    partition: key.describe(),
                    record_count: outcome.record_count,
                    ceiling: self.ceiling,
                });
            }

            let Some((strategy, rest)) = next_strategy(strategies) else {
                return Err(HarvestError::PartitionOverflow {
                    partition: key.describe(),
                    record_count: outcome.record_count,
                    ceiling: self.ceiling,
                });
            };

            self.refine(&key, strategy, rest, snapshot).await
        }
        .boxed()
    }

    async fn refine(
        &self,
        parent: &PartitionKey,
        strategy: &RefinementStrategy,
        rest: &[RefinementStrategy],
        snapshot: &LedgerSnapshot,
    ) -> Result<PartitionOutcome> {
        info!(
            "Refining by {} across {} values | {}",
            strategy.kind.label(),
            strategy.values.len(),
            parent
        );

        let attempted = strategy.values.len();
        let mut failed = 0usize;

        let mut results = stream::iter(strategy.values.iter().cloned().map(|value| {
            let child = parent.refine(strategy.kind, value);
            self.crawl_partition(child, rest, snapshot)
        }))
        .buffer_unordered(self.subworkers.max(1));

        while let Some(result) = results.next().await {
            match result {
                Ok(_) => {}
                Err(e) if e.is_partition_local() => {
                    warn!("Refinement child failed, continuing with siblings: {}", e);
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if failed > 0 {
            self.stats
                .failed_children
                .fetch_add(failed as u64, Ordering::Relaxed);
            return Err(HarvestError::PartitionIncomplete {
                partition: parent.describe(),
                failed,
                attempted,
            });
        }

        // Every child was attempted or skipped and none failed: only now
        // may the parent key be marked.
        self.ledger.mark_crawled(parent).await?;
        self.stats.refined.fetch_add(1, Ordering::Relaxed);
        Ok(PartitionOutcome::Refined {
            children: attempted,
        })
    }
}

/// First strategy that actually has values to split by; an empty dimension
/// list must never "complete" a refinement with zero children.
fn next_strategy(
    strategies: &[RefinementStrategy],
) -> Option<(&RefinementStrategy, &[RefinementStrategy])> {
    strategies
        .iter()
        .position(|s| !s.values.is_empty())
        .map(|i| (&strategies[i], &strategies[i + 1..]))
}
