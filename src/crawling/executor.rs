//! Search execution: one site query, validated, wrapped in bounded retry.
//!
//! The gateway is treated as an opaque page-search capability. Everything
//! the planner relies on (maintenance detection, the record count, the
//! embedded-data marker) is validated here so a malformed response can
//! never masquerade as an empty or accepted partition.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::crawling::retry::RetryPolicy;
use crate::domain::partition::PartitionKey;
use crate::error::{HarvestError, Result};
use crate::infrastructure::page_parser;

/// Opaque page-search capability: submit a filter, get rendered HTML back.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn submit(&self, filter: &PartitionKey) -> Result<String>;
}

/// Pluggable extraction of the human-readable record-count banner. The
/// phrasing is locale-specific, so it is a strategy rather than a
/// hard-coded pattern.
pub trait RecordCountParser: Send + Sync {
    fn record_count(&self, body_text: &str) -> Option<u64>;
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub html: String,
    pub record_count: u64,
}

pub struct SearchExecutor {
    gateway: Arc<dyn SearchGateway>,
    policy: RetryPolicy,
    count_parser: Arc<dyn RecordCountParser>,
    maintenance_markers: Vec<String>,
    embedded_data_marker: String,
}

impl SearchExecutor {
    pub fn new(
        gateway: Arc<dyn SearchGateway>,
        policy: RetryPolicy,
        count_parser: Arc<dyn RecordCountParser>,
        maintenance_markers: Vec<String>,
        embedded_data_marker: String,
    ) -> Self {
        Self {
            gateway,
            policy,
            count_parser,
            maintenance_markers,
            embedded_data_marker,
        }
    }

    /// Runs one search with the configured retry policy. Transient failures
    /// back off and retry; a maintenance page propagates immediately so the
    /// orchestrator can apply its long cooldown instead of hammering the
    /// same window.
    pub async fn search(&self, filter: &PartitionKey) -> Result<SearchOutcome> {
        let mut attempt: u32 = 1;
        loop {
            match self.attempt_search(filter).await {
                Ok(outcome) => {
                    if attempt > 1 {
                        info!("Search succeeded on attempt {} | {}", attempt, filter.describe());
                    }
                    return Ok(outcome);
                }
                Err(e) if e.is_maintenance() => {
                    warn!("Maintenance page detected | {}", filter.describe());
                    return Err(e);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let retries_left = self.policy.max_attempts - attempt;
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "Attempt {} failed for {} | {} retries left, backing off {:?}: {}",
                        attempt,
                        filter.describe(),
                        retries_left,
                        delay,
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_search(&self, filter: &PartitionKey) -> Result<SearchOutcome> {
        let html = self.gateway.submit(filter).await?;
        let body_text = page_parser::normalized_body_text(&html);

        if page_parser::is_maintenance_page(&body_text, &self.maintenance_markers) {
            return Err(HarvestError::MaintenanceDetected);
        }

        // Never default a missing banner to zero: that would mark non-empty
        // partitions as terminally crawled.
        let record_count = self
            .count_parser
            .record_count(&body_text)
            .ok_or_else(|| HarvestError::RecordCountNotFound {
                partition: filter.describe(),
            })?;

        if !html.contains(&self.embedded_data_marker) {
            return Err(HarvestError::UnexpectedPageShape {
                partition: filter.describe(),
                marker: self.embedded_data_marker.clone(),
            });
        }

        info!("Found {} records | {}", record_count, filter.describe());
        Ok(SearchOutcome { html, record_count })
    }
}
